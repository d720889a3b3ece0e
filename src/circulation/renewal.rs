//! Renewal window

use chrono::{Duration, NaiveDate};

use crate::error::{AppError, AppResult};

pub const DEFAULT_EXTENSION_DAYS: i64 = 14;

/// Proposed new due date when the librarian does not pick one
pub fn default_renewal_due_date(current_due: NaiveDate, max_extension_days: i64) -> NaiveDate {
    current_due + Duration::days(DEFAULT_EXTENSION_DAYS.min(max_extension_days))
}

/// `current_due < requested <= current_due + max_extension_days`
pub fn validate_renewal(
    current_due: NaiveDate,
    requested: NaiveDate,
    max_extension_days: i64,
) -> AppResult<()> {
    if requested <= current_due {
        return Err(AppError::Validation(format!(
            "New due date {} must be after the current due date {}",
            requested, current_due
        )));
    }
    let limit = current_due + Duration::days(max_extension_days);
    if requested > limit {
        return Err(AppError::Validation(format!(
            "New due date {} is more than {} days after the current due date (latest {})",
            requested, max_extension_days, limit
        )));
    }
    Ok(())
}

/// New due date for a renewal, validated against the window
pub fn resolve_renewal(
    current_due: NaiveDate,
    requested: Option<NaiveDate>,
    max_extension_days: i64,
) -> AppResult<NaiveDate> {
    let candidate = requested.unwrap_or_else(|| default_renewal_due_date(current_due, max_extension_days));
    validate_renewal(current_due, candidate, max_extension_days)?;
    Ok(candidate)
}
