//! Integer codec: literal fields to arbitrary precision integers and back.
//!
//! Fields are trimmed with Unicode whitespace rules (so `\u{2001}`,
//! `\u{0085}` and vertical tabs are stripped too) and must then match
//! `[+-]?[0-9]+`. Values are [`BigInt`]s, so 20-digit literals and their
//! sums never overflow.

use num_bigint::BigInt;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ConversionError, ConversionResult};

static INTEGER_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?[0-9]+$").expect("integer literal pattern is valid"));

/// Parse one field into an integer.
pub fn parse_one(field: &str) -> ConversionResult<BigInt> {
    let literal = field.trim();

    if !INTEGER_LITERAL.is_match(literal) {
        return Err(ConversionError::new(literal));
    }

    BigInt::parse_bytes(literal.as_bytes(), 10).ok_or_else(|| ConversionError::new(literal))
}

/// Parse every field of a row, stopping at the first invalid one.
///
/// # Example
/// ```
/// use csvmatrix::codec::{parse_all, join_all};
///
/// let row = vec![" 1".to_string(), "+02".to_string(), "-0".to_string()];
/// let ints = parse_all(&row).unwrap();
/// assert_eq!(join_all(&ints), "1,2,0");
/// ```
pub fn parse_all<S: AsRef<str>>(fields: &[S]) -> ConversionResult<Vec<BigInt>> {
    fields.iter().map(|f| parse_one(f.as_ref())).collect()
}

/// Render integers in canonical decimal form, joined by commas.
pub fn join_all(values: &[BigInt]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_and_canonicalize() {
        let ints = parse_all(&fields(&["007", "+5", "-0", "-12"])).unwrap();
        assert_eq!(join_all(&ints), "7,5,0,-12");
    }

    #[test]
    fn test_unicode_whitespace_trimmed() {
        let ints = parse_all(&fields(&["\t\u{2001}1", " 2", "\u{000B} \t\u{0085}\t-3"])).unwrap();
        assert_eq!(join_all(&ints), "1,2,-3");
    }

    #[test]
    fn test_large_literals() {
        let ints = parse_all(&fields(&["-12345678901234567890", "123456789012345678901234567890"]))
            .unwrap();
        assert_eq!(join_all(&ints), "-12345678901234567890,123456789012345678901234567890");
    }

    #[test]
    fn test_first_failure_wins() {
        let err = parse_all(&fields(&["1", " -3.234 ", "x"])).unwrap_err();
        assert_eq!(err.field, "-3.234");
    }

    #[test]
    fn test_rejected_literals() {
        for bad in ["", "   ", "1.0", "1e3", "0x10", "1_000", "--1", "+", "-", "1 2", "١"] {
            assert!(parse_one(bad).is_err(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_join_empty() {
        assert_eq!(join_all(&[]), "");
    }
}
