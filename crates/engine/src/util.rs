//! Internal helpers for input validation.
//!
//! `parse_date` is re-exported for callers that receive raw request strings;
//! the rest is crate-private.

use chrono::NaiveDate;

use crate::{EngineError, ResultEngine};

/// Parse an ISO 8601 calendar date (`YYYY-MM-DD`).
///
/// Month and day must be zero-padded; chrono alone would accept `2024-1-5`.
pub fn parse_date(value: &str) -> ResultEngine<NaiveDate> {
    let invalid = || EngineError::InvalidDate(format!("expected YYYY-MM-DD, got '{value}'"));
    let trimmed = value.trim();
    if !is_iso_date_shape(trimmed) {
        return Err(invalid());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| invalid())
}

fn is_iso_date_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Reject zero and negative ledger amounts.
pub(crate) fn ensure_positive_amount(amount_minor: i64, label: &str) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(format!("{label} must be > 0")));
    }
    Ok(())
}

pub(crate) fn normalize_description(value: &str) -> String {
    value.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_date_accepts_iso_calendar_dates() {
        assert_eq!(
            parse_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            parse_date(" 2024-01-05 ").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()
        );
    }

    #[test]
    fn parse_date_rejects_other_formats() {
        for raw in [
            "2023-02-29",
            "05/01/2024",
            "2024-1-5",
            "2024-01-5",
            "2024-1-05",
            "+2024-01-05",
            "2024-1-5x",
            "",
            "2024-13-01",
        ] {
            assert!(
                matches!(parse_date(raw), Err(EngineError::InvalidDate(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn amounts_must_be_positive() {
        assert!(ensure_positive_amount(1, "amount").is_ok());
        assert_eq!(
            ensure_positive_amount(0, "amount").unwrap_err(),
            EngineError::InvalidAmount("amount must be > 0".to_string())
        );
        assert!(ensure_positive_amount(-5, "amount").is_err());
    }
}
