use crate::error::AlignError;

use super::Romanizer;

/// Romanizer for inputs that already share a script (e.g. romanized captions
/// against romanized lyrics). Returns text unchanged once initialized.
#[derive(Debug, Default, Clone)]
pub struct PassthroughRomanizer {
    ready: bool,
}

impl PassthroughRomanizer {
    /// Uninitialized; call `initialize` before use
    pub fn new() -> Self {
        Self { ready: false }
    }

    /// Already initialized
    pub fn ready() -> Self {
        Self { ready: true }
    }
}

impl Romanizer for PassthroughRomanizer {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn initialize(&mut self) -> Result<(), AlignError> {
        self.ready = true;
        Ok(())
    }

    fn romanize(&self, text: &str) -> Result<String, AlignError> {
        if !self.ready {
            return Err(AlignError::RomanizerUnavailable);
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut romanizer = PassthroughRomanizer::new();
        assert!(!romanizer.is_ready());
        assert!(romanizer.romanize("yoru").is_err());

        romanizer.initialize().unwrap();

        assert!(romanizer.is_ready());
        assert_eq!(romanizer.romanize("Yoru ni").unwrap(), "Yoru ni");
    }
}
