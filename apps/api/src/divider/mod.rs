//! Resume divider: splits a stack of resumes across a review panel.
//!
//! `divide` is the whole calculation. Everything else here turns raw user
//! input into counts and turns a `DivisionResult` back into the sentence
//! shown to the reviewers.

pub mod handlers;

use thiserror::Error;

pub const ZERO_REVIEWERS_MESSAGE: &str = "Number of people reviewing cannot be zero!";
pub const NOT_AN_INTEGER_MESSAGE: &str = "Please enter valid integer values!";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DivideError {
    #[error("{0}")]
    InvalidArgument(&'static str),
}

/// Outcome of splitting `total` items across `parts` reviewers.
///
/// `base_count * parts + remainder == total` and `remainder < parts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivisionResult {
    pub base_count: u64,
    pub remainder: u64,
    pub parts: u64,
}

impl DivisionResult {
    /// Number of resumes the reviewer at `index` (0-based, input order) takes.
    /// The first `remainder` reviewers carry the extra one.
    pub fn share_for(&self, index: u64) -> u64 {
        if index < self.remainder {
            self.base_count + 1
        } else {
            self.base_count
        }
    }

    /// Per-reviewer shares grouped into runs of equal size, one line per run
    /// (at most two), so the output stays short for any reviewer count.
    pub fn breakdown(&self) -> Vec<String> {
        let runs = [(1, self.remainder), (self.remainder + 1, self.parts)];
        runs.iter()
            .filter(|(first, last)| first <= last)
            .map(|&(first, last)| {
                let share = self.share_for(first - 1);
                if first == last {
                    format!("reviewer {first}: {share}")
                } else {
                    format!("reviewers {first}-{last}: {share}")
                }
            })
            .collect()
    }

    pub fn message(&self) -> String {
        if self.remainder == 0 {
            format!("Each person should review {} resumes.", self.base_count)
        } else {
            format!(
                "Each person should review at least {} resumes. {} person(s) should review one more resume.",
                self.base_count, self.remainder
            )
        }
    }
}

pub fn divide(total: u64, parts: u64) -> Result<DivisionResult, DivideError> {
    if parts == 0 {
        return Err(DivideError::InvalidArgument(ZERO_REVIEWERS_MESSAGE));
    }
    Ok(DivisionResult {
        base_count: total / parts,
        remainder: total % parts,
        parts,
    })
}

/// Parses a count typed by a user. Only plain decimal digits are accepted
/// (surrounding whitespace is ignored); signs, fractions and overflow fail.
pub fn parse_count(text: &str) -> Result<u64, DivideError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DivideError::InvalidArgument(NOT_AN_INTEGER_MESSAGE));
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| DivideError::InvalidArgument(NOT_AN_INTEGER_MESSAGE))
}

/// Both inputs are checked for well-formedness before the zero-divisor check,
/// so "abc" / "0" reports the integer error rather than the zero error.
pub fn divide_text(total: &str, parts: &str) -> Result<DivisionResult, DivideError> {
    let total = parse_count(total)?;
    let parts = parse_count(parts)?;
    divide(total, parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide_with_remainder() {
        let r = divide(10, 3).unwrap();
        assert_eq!((r.base_count, r.remainder), (3, 1));
    }

    #[test]
    fn test_divide_exact() {
        let r = divide(9, 3).unwrap();
        assert_eq!((r.base_count, r.remainder), (3, 0));
    }

    #[test]
    fn test_divide_zero_total() {
        let r = divide(0, 5).unwrap();
        assert_eq!((r.base_count, r.remainder), (0, 0));
    }

    #[test]
    fn test_divide_by_zero_always_fails() {
        for total in [0, 1, 7, 1_000, u64::MAX] {
            assert_eq!(
                divide(total, 0),
                Err(DivideError::InvalidArgument(ZERO_REVIEWERS_MESSAGE))
            );
        }
    }

    #[test]
    fn test_divide_reconstructs_total() {
        for total in 0..60u64 {
            for parts in 1..12u64 {
                let r = divide(total, parts).unwrap();
                assert_eq!(r.base_count * parts + r.remainder, total);
                assert!(r.remainder < parts);
            }
        }
    }

    #[test]
    fn test_divide_large_values() {
        let r = divide(u64::MAX, 2).unwrap();
        assert_eq!(r.base_count, u64::MAX / 2);
        assert_eq!(r.remainder, 1);
    }

    #[test]
    fn test_message_exact() {
        assert_eq!(
            divide(9, 3).unwrap().message(),
            "Each person should review 3 resumes."
        );
    }

    #[test]
    fn test_message_with_remainder() {
        assert_eq!(
            divide(10, 3).unwrap().message(),
            "Each person should review at least 3 resumes. 1 person(s) should review one more resume."
        );
    }

    #[test]
    fn test_share_for_first_reviewers_take_extra() {
        let r = divide(11, 4).unwrap();
        let shares: Vec<u64> = (0..r.parts).map(|i| r.share_for(i)).collect();
        assert_eq!(shares, vec![3, 3, 3, 2]);
        assert_eq!(shares.iter().sum::<u64>(), 11);
    }

    #[test]
    fn test_parse_count_accepts_padded_digits() {
        assert_eq!(parse_count(" 42 ").unwrap(), 42);
    }

    #[test]
    fn test_parse_count_rejects_non_integers() {
        for bad in ["", "   ", "abc", "3.5", "-2", "+2", "1e3", "99999999999999999999999"] {
            assert_eq!(
                parse_count(bad),
                Err(DivideError::InvalidArgument(NOT_AN_INTEGER_MESSAGE)),
                "input {bad:?}"
            );
        }
    }

    #[test]
    fn test_divide_text_reports_integer_error_before_zero() {
        assert_eq!(
            divide_text("abc", "0"),
            Err(DivideError::InvalidArgument(NOT_AN_INTEGER_MESSAGE))
        );
        assert_eq!(
            divide_text("10", "0"),
            Err(DivideError::InvalidArgument(ZERO_REVIEWERS_MESSAGE))
        );
    }

    #[test]
    fn test_divide_text_happy_path() {
        let r = divide_text("10", "3").unwrap();
        assert_eq!((r.base_count, r.remainder, r.parts), (3, 1, 3));
    }

    #[test]
    fn test_breakdown_groups_reviewers() {
        assert_eq!(
            divide(10, 3).unwrap().breakdown(),
            vec!["reviewer 1: 4", "reviewers 2-3: 3"]
        );
        assert_eq!(divide(9, 3).unwrap().breakdown(), vec!["reviewers 1-3: 3"]);
        assert_eq!(divide(5, 1).unwrap().breakdown(), vec!["reviewer 1: 5"]);
        assert_eq!(
            divide(u64::MAX, 1).unwrap().breakdown(),
            vec![format!("reviewer 1: {}", u64::MAX)]
        );
        assert_eq!(
            divide(3, u64::MAX).unwrap().breakdown(),
            vec![
                "reviewers 1-3: 1".to_string(),
                format!("reviewers 4-{}: 0", u64::MAX)
            ]
        );
    }
}
