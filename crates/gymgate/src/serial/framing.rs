//! Keypad code framing
//!
//! `*` starts a code, digits accumulate, `#` ends it. Anything else on the
//! line (CR/LF, noise) is ignored.

/// Marks the start of a code and discards any partial one
pub const START_MARKER: char = '*';

/// Marks the end of a code
pub const END_MARKER: char = '#';

/// Incremental decoder for framed keypad codes
#[derive(Debug, Default, Clone)]
pub struct CodeDecoder {
    buffer: String,
}

impl CodeDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one character, returning a code when `#` closes a non-empty one
    pub fn push(&mut self, c: char) -> Option<String> {
        match c {
            START_MARKER => {
                self.buffer.clear();
                None
            }
            END_MARKER if self.buffer.is_empty() => None,
            END_MARKER => Some(std::mem::take(&mut self.buffer)),
            c if c.is_ascii_digit() => {
                self.buffer.push(c);
                None
            }
            _ => None,
        }
    }

    /// Feed a string, returning every completed code in order
    pub fn feed(&mut self, input: &str) -> Vec<String> {
        input.chars().filter_map(|c| self.push(c)).collect()
    }

    /// True when no partial code is buffered
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_code() {
        let mut decoder = CodeDecoder::new();
        assert_eq!(decoder.feed("*123#"), vec!["123"]);
        assert!(decoder.is_idle());
    }

    #[test]
    fn test_empty_body_emits_nothing() {
        let mut decoder = CodeDecoder::new();
        assert!(decoder.feed("*#").is_empty());
        assert!(decoder.feed("##").is_empty());
    }

    #[test]
    fn test_restart_discards_partial_code() {
        let mut decoder = CodeDecoder::new();
        assert_eq!(decoder.feed("*1*2#"), vec!["2"]);
    }

    #[test]
    fn test_noise_is_ignored() {
        let mut decoder = CodeDecoder::new();
        assert_eq!(decoder.feed("*4a5\r\n6#\r\n"), vec!["456"]);
        assert_eq!(decoder.feed("x\u{00e9}*7\u{0663}#"), vec!["7"]);
    }

    #[test]
    fn test_digits_without_start_marker() {
        // The start marker only resynchronizes; it is not required
        let mut decoder = CodeDecoder::new();
        assert_eq!(decoder.feed("42#"), vec!["42"]);
    }

    #[test]
    fn test_multiple_codes_in_order() {
        let mut decoder = CodeDecoder::new();
        assert_eq!(decoder.feed("*10#*20#*30#"), vec!["10", "20", "30"]);
    }

    #[test]
    fn test_code_split_across_feeds() {
        let mut decoder = CodeDecoder::new();
        assert!(decoder.feed("*98").is_empty());
        assert!(!decoder.is_idle());
        assert_eq!(decoder.feed("76#"), vec!["9876"]);
    }
}
