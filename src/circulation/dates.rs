//! Due-date, overdue and expiry computations
//!
//! Loans and reservations deliberately use different cut-offs: a loan is
//! overdue as soon as the raw clock passes the start of its due date, while a
//! reservation only expires once its expiry day has fully elapsed.

use chrono::{Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{
    error::{AppError, AppResult},
    models::{enums::BorrowStatus, reader::ReaderType},
};

const DAY_MS: i64 = 86_400_000;

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// 23:59:59.999 of the given date
fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date) + Duration::days(1) - Duration::milliseconds(1)
}

/// Due date = borrow date + the reader type's loan length, in calendar days
pub fn calculate_due_date(borrow_date: NaiveDate, reader_type: &ReaderType) -> AppResult<NaiveDate> {
    let days = u64::try_from(reader_type.borrow_duration_days).map_err(|_| {
        AppError::Validation(format!(
            "Reader type '{}' has a negative borrow duration",
            reader_type.name
        ))
    })?;

    borrow_date
        .checked_add_days(Days::new(days))
        .ok_or_else(|| AppError::Validation("Due date out of range".to_string()))
}

/// True when a loan that is still out has passed the start of its due date
pub fn is_overdue(status: BorrowStatus, due_date: NaiveDate, now: NaiveDateTime) -> bool {
    status.is_on_loan() && start_of_day(due_date) < now
}

/// Whole days past the due date, never negative
pub fn days_overdue(due_date: NaiveDate, today: NaiveDate) -> i64 {
    today.signed_duration_since(due_date).num_days().max(0)
}

/// Whole days left before the due date, never negative
pub fn days_until_due(due_date: NaiveDate, today: NaiveDate) -> i64 {
    due_date.signed_duration_since(today).num_days().max(0)
}

pub fn is_due_within(due_date: NaiveDate, today: NaiveDate, threshold_days: i64) -> bool {
    let left = days_until_due(due_date, today);
    left > 0 && left <= threshold_days
}

pub fn is_due_within_3_days(due_date: NaiveDate, today: NaiveDate) -> bool {
    is_due_within(due_date, today, 3)
}

/// True once the whole expiry day has elapsed
pub fn is_expired_by_end_of_day(expiry_date: NaiveDate, now: NaiveDateTime) -> bool {
    start_of_day(now.date()) > end_of_day(expiry_date)
}

/// Days remaining until the end of the expiry day, rounded up.
/// A reservation that expired yesterday still counts 0 days remaining.
fn days_remaining(expiry_date: NaiveDate, today: NaiveDate) -> i64 {
    let diff = (end_of_day(expiry_date) - start_of_day(today)).num_milliseconds();
    // integer division truncates toward zero, which is already ceil for negatives
    if diff > 0 && diff % DAY_MS != 0 {
        diff / DAY_MS + 1
    } else {
        diff / DAY_MS
    }
}

pub fn is_expiring_soon(expiry_date: NaiveDate, today: NaiveDate, threshold_days: i64) -> bool {
    let remaining = days_remaining(expiry_date, today);
    remaining >= 0 && remaining <= threshold_days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::ReaderCategory;
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn reader_type(days: i32) -> ReaderType {
        ReaderType {
            id: Uuid::new_v4(),
            name: "Học sinh".to_string(),
            category: ReaderCategory::Student,
            max_borrow_limit: 3,
            borrow_duration_days: days,
            description: None,
        }
    }

    #[test]
    fn test_calculate_due_date() {
        let due = calculate_due_date(date("2024-01-01"), &reader_type(14)).unwrap();
        assert_eq!(due, date("2024-01-15"));
        // recomputation gives the same answer
        assert_eq!(calculate_due_date(date("2024-01-01"), &reader_type(14)).unwrap(), due);
        // crosses month and leap day
        assert_eq!(
            calculate_due_date(date("2024-02-20"), &reader_type(10)).unwrap(),
            date("2024-03-01")
        );
        assert_eq!(
            calculate_due_date(date("2024-01-01"), &reader_type(0)).unwrap(),
            date("2024-01-01")
        );
    }

    #[test]
    fn test_calculate_due_date_rejects_negative_duration() {
        assert!(calculate_due_date(date("2024-01-01"), &reader_type(-1)).is_err());
    }

    #[test]
    fn test_is_overdue_only_for_loans_out() {
        let due = date("2024-01-15");
        let later = at("2024-01-20 09:00:00");
        assert!(is_overdue(BorrowStatus::Borrowed, due, later));
        assert!(is_overdue(BorrowStatus::Renewed, due, later));
        assert!(!is_overdue(BorrowStatus::Returned, due, later));
        assert!(!is_overdue(BorrowStatus::Cancelled, due, later));
        assert!(!is_overdue(BorrowStatus::PendingApproval, due, later));
        assert!(!is_overdue(BorrowStatus::Borrowed, due, at("2024-01-14 23:59:59")));
    }

    #[test]
    fn test_is_overdue_uses_raw_clock_on_due_day() {
        let due = date("2024-01-15");
        assert!(!is_overdue(BorrowStatus::Borrowed, due, at("2024-01-15 00:00:00")));
        assert!(is_overdue(BorrowStatus::Borrowed, due, at("2024-01-15 08:30:00")));
    }

    #[test]
    fn test_day_counts_never_negative() {
        let due = date("2024-01-15");
        assert_eq!(days_overdue(due, date("2024-01-20")), 5);
        assert_eq!(days_until_due(due, date("2024-01-20")), 0);
        assert_eq!(days_overdue(due, date("2024-01-10")), 0);
        assert_eq!(days_until_due(due, date("2024-01-10")), 5);
        assert_eq!(days_overdue(due, due), 0);
        assert_eq!(days_until_due(due, due), 0);
    }

    #[test]
    fn test_exactly_one_count_positive_off_due_day() {
        let due = date("2024-01-15");
        for offset in [-30i64, -3, -1, 1, 2, 45] {
            let today = due + Duration::days(offset);
            let over = days_overdue(due, today) > 0;
            let until = days_until_due(due, today) > 0;
            assert!(over ^ until, "offset {}", offset);
        }
    }

    #[test]
    fn test_due_within_3_days() {
        let today = date("2024-01-10");
        assert!(!is_due_within_3_days(date("2024-01-10"), today));
        assert!(is_due_within_3_days(date("2024-01-11"), today));
        assert!(is_due_within_3_days(date("2024-01-13"), today));
        assert!(!is_due_within_3_days(date("2024-01-14"), today));
        assert!(!is_due_within_3_days(date("2024-01-05"), today));
        assert!(is_due_within(date("2024-01-14"), today, 4));
    }

    #[test]
    fn test_reservation_expires_after_end_of_day() {
        let expiry = date("2024-03-01");
        assert!(!is_expired_by_end_of_day(expiry, at("2024-03-01 00:00:00")));
        assert!(!is_expired_by_end_of_day(expiry, at("2024-03-01 23:59:59")));
        assert!(is_expired_by_end_of_day(expiry, at("2024-03-02 00:00:01")));
        assert!(!is_expired_by_end_of_day(expiry, at("2024-02-28 12:00:00")));
    }

    #[test]
    fn test_loan_and_reservation_cutoffs_differ() {
        let day = date("2024-03-01");
        let noon = at("2024-03-01 12:00:00");
        assert!(is_overdue(BorrowStatus::Borrowed, day, noon));
        assert!(!is_expired_by_end_of_day(day, noon));
    }

    #[test]
    fn test_expiring_soon() {
        let today = date("2024-03-01");
        // expires today: one day remaining
        assert!(is_expiring_soon(today, today, 3));
        assert!(is_expiring_soon(date("2024-03-03"), today, 3));
        assert!(!is_expiring_soon(date("2024-03-04"), today, 3));
        // expired yesterday rounds to zero remaining
        assert!(is_expiring_soon(date("2024-02-29"), today, 3));
        assert!(!is_expiring_soon(date("2024-02-28"), today, 3));
    }
}
