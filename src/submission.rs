//! Boundary validation for incoming session records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::{NewSessionRecord, ValidationError};

/// Computes `final - initial * (add_ons + 1)`.
///
/// Returns `None` on overflow.
pub fn point_balance(initial_points: i64, final_points: i64, add_ons: i64) -> Option<i64> {
    let buy_ins = add_ons.checked_add(1)?;
    let cost = initial_points.checked_mul(buy_ins)?;
    final_points.checked_sub(cost)
}

/// Parses a `YYYY-MM-DD` calendar date.
///
/// # Errors
///
/// Returns [`ValidationError`] naming `field` if the value is not a valid date.
pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::new(field, format!("'{}' is not a YYYY-MM-DD date", raw)))
}

/// Session record as submitted by a client. Every field is optional so that
/// a missing one produces a field-specific error rather than a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSubmission {
    /// Owning player's name.
    pub player_name: Option<String>,
    /// Session date, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Stake at the start of the session.
    pub initial_points: Option<i64>,
    /// Stake at the end of the session.
    pub final_points: Option<i64>,
    /// Number of re-buys of the initial stake.
    pub add_ons: Option<i64>,
    /// Client-computed balance; checked against the server's own computation.
    pub point_balance: Option<i64>,
}

impl RecordSubmission {
    /// Validates the submission and computes its balance.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for the first missing or invalid field, or
    /// when a supplied `pointBalance` disagrees with the computed one.
    #[instrument(skip(self), fields(player_name = ?self.player_name, date = ?self.date))]
    pub fn validate(self) -> Result<NewSessionRecord, ValidationError> {
        let player_name = self
            .player_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ValidationError::new("playerName", "player name is required"))?
            .to_string();

        let date = match self.date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_date("date", raw)?,
            _ => return Err(ValidationError::new("date", "date is required")),
        };

        let initial_points = self
            .initial_points
            .ok_or_else(|| ValidationError::new("initialPoints", "initial points are required"))?;
        if initial_points < 0 {
            return Err(ValidationError::new(
                "initialPoints",
                "initial points must not be negative",
            ));
        }

        let final_points = self
            .final_points
            .ok_or_else(|| ValidationError::new("finalPoints", "final points are required"))?;

        let add_ons = self
            .add_ons
            .ok_or_else(|| ValidationError::new("addOns", "add-on count is required"))?;
        let add_ons = i32::try_from(add_ons)
            .ok()
            .filter(|n| *n >= 0)
            .ok_or_else(|| {
                ValidationError::new("addOns", "add-on count must be a non-negative integer")
            })?;

        let computed = point_balance(initial_points, final_points, i64::from(add_ons))
            .ok_or_else(|| ValidationError::new("pointBalance", "point balance overflows"))?;

        match self.point_balance {
            Some(claimed) if claimed != computed => {
                warn!(claimed, computed, "Client point balance disagrees");
                return Err(ValidationError::new(
                    "pointBalance",
                    format!(
                        "{} does not match final - initial x (addOns + 1) = {}",
                        claimed, computed
                    ),
                ));
            }
            _ => {}
        }

        debug!(computed, "Submission validated");
        Ok(NewSessionRecord::new(
            player_name,
            date,
            initial_points,
            final_points,
            add_ons,
            computed,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice(final_points: i64, add_ons: i64) -> RecordSubmission {
        RecordSubmission {
            player_name: Some("Alice".to_string()),
            date: Some("2024-01-01".to_string()),
            initial_points: Some(20_000),
            final_points: Some(final_points),
            add_ons: Some(add_ons),
            point_balance: None,
        }
    }

    #[test]
    fn test_balance_counts_add_ons_as_extra_buy_ins() {
        assert_eq!(point_balance(20_000, 15_000, 1), Some(-25_000));
        assert_eq!(point_balance(20_000, 50_000, 0), Some(30_000));
    }

    #[test]
    fn test_zero_stake_balance_is_final_points() {
        assert_eq!(point_balance(0, 12_345, 0), Some(12_345));
    }

    #[test]
    fn test_balance_overflow_is_none() {
        assert_eq!(point_balance(i64::MAX, 0, 1), None);
    }

    #[test]
    fn test_validate_computes_balance() {
        let record = alice(15_000, 1).validate().expect("valid");
        assert_eq!(*record.point_balance(), -25_000);
        assert_eq!(record.player_name(), "Alice");
        assert_eq!(*record.add_ons(), 1);
    }

    #[test]
    fn test_validate_trims_player_name() {
        let mut submission = alice(20_000, 0);
        submission.player_name = Some("  Alice ".to_string());
        let record = submission.validate().expect("valid");
        assert_eq!(record.player_name(), "Alice");
    }

    #[test]
    fn test_validate_accepts_matching_client_balance() {
        let mut submission = alice(50_000, 0);
        submission.point_balance = Some(30_000);
        assert!(submission.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_mismatched_client_balance() {
        let mut submission = alice(50_000, 0);
        submission.point_balance = Some(99);
        let err = submission.validate().expect_err("mismatch");
        assert_eq!(err.field, "pointBalance");
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let cases: [(fn(&mut RecordSubmission), &str); 5] = [
            (|s| s.player_name = None, "playerName"),
            (|s| s.date = None, "date"),
            (|s| s.initial_points = None, "initialPoints"),
            (|s| s.final_points = None, "finalPoints"),
            (|s| s.add_ons = None, "addOns"),
        ];
        for (clear, field) in cases {
            let mut submission = alice(1, 0);
            clear(&mut submission);
            let err = submission.validate().expect_err("missing field");
            assert_eq!(err.field, field);
        }
    }

    #[test]
    fn test_validate_rejects_blank_name_and_bad_date() {
        let mut submission = alice(1, 0);
        submission.player_name = Some("   ".to_string());
        assert_eq!(submission.validate().expect_err("blank").field, "playerName");

        let mut submission = alice(1, 0);
        submission.date = Some("01/02/2024".to_string());
        assert_eq!(submission.validate().expect_err("bad date").field, "date");
    }

    #[test]
    fn test_validate_rejects_negative_add_ons_and_stake() {
        let submission = alice(1, -1);
        assert_eq!(submission.validate().expect_err("negative").field, "addOns");

        let mut submission = alice(1, 0);
        submission.initial_points = Some(-5);
        assert_eq!(
            submission.validate().expect_err("negative").field,
            "initialPoints"
        );
    }
}
