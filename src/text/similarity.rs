use super::normalize::compact;

/// Minimum compacted length for a line to count as a continuation
const MIN_CONTINUATION_CHARS: usize = 3;

/// Levenshtein distance over chars
///
/// Classic DP, kept to two rows since only the previous row is read.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            let deletion = previous[j + 1] + 1;
            let insertion = current[j] + 1;
            current[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Similarity in [0, 1]: `1 - distance / longer length`
///
/// Two empty strings are an exact match.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    1.0 - levenshtein(a, b) as f64 / max_len as f64
}

/// Whether `current` is a timing split of `previous` rather than new content
///
/// Both inputs are expected to be normalized already. Whitespace is ignored.
pub fn is_continuation(previous: &str, current: &str) -> bool {
    let current = compact(current);
    if current.chars().count() <= MIN_CONTINUATION_CHARS {
        return false;
    }

    compact(previous).contains(&current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "abcd"), 4);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        assert_eq!(levenshtein("夜に駆ける", "夜を駆ける"), 1);
    }

    #[test]
    fn test_levenshtein_symmetric() {
        let pairs = [("kitten", "sitting"), ("sunday", "saturday"), ("a", "")];
        for (a, b) in pairs {
            assert_eq!(levenshtein(a, b), levenshtein(b, a));
        }
    }

    #[test]
    fn test_similarity_bounds() {
        let samples = ["", "a", "hello world", "yoru ni kakeru", "zzzzzzzzzz"];
        for a in samples {
            assert_eq!(similarity(a, a), 1.0);
            for b in samples {
                let score = similarity(a, b);
                assert!((0.0..=1.0).contains(&score), "{} vs {} = {}", a, b, score);
                assert_eq!(score, similarity(b, a));
            }
        }
    }

    #[test]
    fn test_similarity_values() {
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", ""), 0.0);
        assert_eq!(similarity("abcd", "abcx"), 0.75);
        // More edits, lower score
        assert!(similarity("abcd", "abxx") < similarity("abcd", "abcx"));
    }

    #[test]
    fn test_is_continuation() {
        assert!(is_continuation("shizumu you ni tokete yuku you ni", "tokete yuku"));
        // Whitespace differences do not matter
        assert!(is_continuation("tokete yuku", "toke teyuku"));
        // Too short to be meaningful
        assert!(!is_continuation("ni ni ni", "ni"));
        assert!(!is_continuation("abcdef", "abc"));
        // New content
        assert!(!is_continuation("shizumu you ni", "futari dake no sora"));
    }
}
