/// Canonicalize a line for comparison
///
/// Lower-cases, drops everything that is not a letter, digit, underscore or
/// whitespace, collapses whitespace runs to a single space and trims.
/// Total and idempotent.
pub fn normalize(text: &str) -> String {
    // Lowercase before filtering: some lowercase mappings emit combining marks
    let kept: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove all whitespace, used for substring and coverage checks
pub fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("  Hello,   World!! "), "hello world");
        assert_eq!(normalize("Don't stop (me) now"), "dont stop me now");
        assert_eq!(normalize("snake_case\tand\nnewlines"), "snake_case and newlines");
        assert_eq!(normalize("?!..."), "");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_normalize_keeps_non_latin_letters() {
        assert_eq!(normalize("夜に駆ける。"), "夜に駆ける");
        assert_eq!(normalize("Ёлка, ЁЛКА"), "ёлка ёлка");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "Hello, World!",
            "İstanbul'da",
            "  mixed 123 -- dashes and “quotes” ",
            "「君の名は」",
            "ＦＵＬＬ　ＷＩＤＴＨ",
            "tab\tseparated\u{3000}ideographic space",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact("a b  c\td"), "abcd");
    }
}
