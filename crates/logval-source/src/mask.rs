use regex::Regex;

use crate::error::{Result, SourceError};

/// Compiled file name mask
///
/// Supports `*` (any run of characters) and `?` (exactly one character);
/// everything else matches literally. Masks apply to file names only, so a
/// path separator is rejected.
#[derive(Clone)]
pub struct FileMask {
    /// Anchored regex equivalent of the mask
    regex: Regex,

    /// Original mask string
    pattern: String,
}

impl FileMask {
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.is_empty() {
            return Err(invalid(pattern, "mask is empty"));
        }
        if pattern.contains(['/', '\\']) {
            return Err(invalid(pattern, "mask must not contain a path separator"));
        }

        let mut expr = String::with_capacity(pattern.len() * 2 + 2);
        expr.push('^');
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| invalid(pattern, e.to_string()))?;
        Ok(Self {
            regex,
            pattern: pattern.to_string(),
        })
    }

    /// Check if a file name matches this mask
    pub fn matches(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

fn invalid(mask: &str, reason: impl Into<String>) -> SourceError {
    SourceError::InvalidMask {
        mask: mask.to_string(),
        reason: reason.into(),
    }
}

impl std::fmt::Debug for FileMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FileMask").field(&self.pattern).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_mask() {
        let mask = FileMask::new("*.log").unwrap();
        assert!(mask.matches("test0.log"));
        assert!(mask.matches(".log"));
        assert!(!mask.matches("test0.log.1"));
        assert!(!mask.matches("test0.txt"));
    }

    #[test]
    fn test_literal_mask_escapes_regex() {
        let mask = FileMask::new("endly_test_indexed.log").unwrap();
        assert!(mask.matches("endly_test_indexed.log"));
        assert!(!mask.matches("endly_test_indexedXlog"));
    }

    #[test]
    fn test_question_mark() {
        let mask = FileMask::new("app-?.json").unwrap();
        assert!(mask.matches("app-1.json"));
        assert!(!mask.matches("app-10.json"));
    }

    #[test]
    fn test_invalid_masks() {
        assert!(matches!(
            FileMask::new(""),
            Err(SourceError::InvalidMask { .. })
        ));
        assert!(FileMask::new("logs/*.log").is_err());
    }
}
