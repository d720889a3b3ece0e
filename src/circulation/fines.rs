//! Fine amounts, overdue fine drafts and payment rules

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use super::dates::days_overdue;
use crate::{
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        borrow_record::BorrowRecord,
        enums::{FineReason, FineStatus},
        fine::{CreateFine, Fine},
        reader::ReaderShort,
    },
};

/// Default fine description: reader identity followed by the reason
pub fn default_description(reader: &ReaderShort) -> String {
    format!("{} - {} nộp phạt", reader.card_number, reader.full_name)
}

pub fn overdue_description(days: i64) -> String {
    format!("Phạt trả sách muộn {} ngày", days)
}

/// Fine policy built from configuration
#[derive(Debug, Clone)]
pub struct FinePolicy {
    pub daily_rate: Decimal,
}

impl FinePolicy {
    pub fn new(daily_rate: Decimal) -> Self {
        Self { daily_rate }
    }

    pub fn from_config(config: &CirculationConfig) -> Self {
        Self::new(config.daily_fine_rate)
    }

    pub fn amount_for(&self, days_overdue: i64) -> Decimal {
        Decimal::from(days_overdue.max(0)) * self.daily_rate
    }

    /// Daily rate recorded alongside a librarian-chosen amount
    pub fn implied_daily_rate(&self, amount: Decimal, days_overdue: i64) -> Decimal {
        if days_overdue <= 0 {
            return self.daily_rate;
        }
        let rate = (amount / Decimal::from(days_overdue)).floor();
        if rate.is_zero() {
            self.daily_rate
        } else {
            rate
        }
    }

    /// Overdue fine payload for a borrow record, as of `today`
    pub fn overdue_fine(
        &self,
        record: &BorrowRecord,
        reader: &ReaderShort,
        book_title: Option<&str>,
        today: NaiveDate,
        now: DateTime<Utc>,
        amount_override: Option<Decimal>,
        reason: Option<String>,
    ) -> AppResult<CreateFine> {
        let days = days_overdue(record.due_date, today);

        let (fine_amount, daily_rate) = match amount_override {
            Some(amount) if amount <= Decimal::ZERO => {
                return Err(AppError::Validation("Fine amount must be positive".to_string()));
            }
            Some(amount) => (amount, self.implied_daily_rate(amount, days)),
            None if days == 0 => {
                return Err(AppError::BusinessRule(
                    "Borrow record is not overdue; an explicit amount is required".to_string(),
                ));
            }
            None => (self.amount_for(days), self.daily_rate),
        };

        let description = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| default_description(reader));

        Ok(CreateFine {
            borrow_id: record.id,
            fine_amount,
            fine_date: Some(now),
            reason: FineReason::Overdue,
            description: Some(description),
            overdue_days: Some(days as i32),
            daily_rate: Some(daily_rate),
            librarian_notes: Some(match book_title {
                Some(title) => format!("Tạo phiếu phạt cho sách \"{}\" ({})", title, overdue_description(days)),
                None => overdue_description(days),
            }),
        })
    }
}

/// Result of applying a payment to a fine
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentOutcome {
    pub paid_amount: Decimal,
    pub status: FineStatus,
    pub settled: bool,
}

pub fn apply_payment(fine: &Fine, amount: Decimal) -> AppResult<PaymentOutcome> {
    if fine.status != FineStatus::Unpaid {
        return Err(AppError::BusinessRule(format!("Fine is already {}", fine.status)));
    }
    if amount <= Decimal::ZERO {
        return Err(AppError::Validation("Payment amount must be positive".to_string()));
    }
    let outstanding = fine.outstanding();
    if amount > outstanding {
        return Err(AppError::Validation(format!(
            "Payment {} exceeds outstanding amount {}",
            amount, outstanding
        )));
    }

    let paid_amount = fine.paid_amount + amount;
    let settled = paid_amount >= fine.fine_amount;
    Ok(PaymentOutcome {
        paid_amount,
        status: if settled { FineStatus::Paid } else { FineStatus::Unpaid },
        settled,
    })
}

pub fn ensure_waivable(fine: &Fine) -> AppResult<()> {
    if fine.status != FineStatus::Unpaid {
        return Err(AppError::BusinessRule(format!("Fine is already {}", fine.status)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::BorrowStatus;
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(due: &str) -> BorrowRecord {
        let now = Utc::now();
        BorrowRecord {
            id: Uuid::new_v4(),
            reader_id: Uuid::new_v4(),
            copy_id: Uuid::new_v4(),
            librarian_id: None,
            borrow_date: date("2024-01-01"),
            due_date: date(due),
            return_date: None,
            status: BorrowStatus::Borrowed,
            renewal_count: 0,
            borrow_notes: None,
            return_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn reader() -> ReaderShort {
        ReaderShort {
            id: Uuid::new_v4(),
            full_name: "Nguyễn Văn An".to_string(),
            card_number: "HS0012".to_string(),
        }
    }

    fn fine(amount: i64, paid: i64, status: FineStatus) -> Fine {
        Fine {
            id: Uuid::new_v4(),
            borrow_id: Uuid::new_v4(),
            fine_amount: Decimal::from(amount),
            paid_amount: Decimal::from(paid),
            status,
            reason: FineReason::Overdue,
            description: None,
            overdue_days: None,
            daily_rate: None,
            fine_date: Utc::now(),
            payment_date: None,
            payment_method: None,
            librarian_notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_amount_is_days_times_rate() {
        let policy = FinePolicy::new(Decimal::from(5000));
        assert_eq!(policy.amount_for(5), Decimal::from(25_000));
        assert_eq!(policy.amount_for(0), Decimal::ZERO);
        assert_eq!(policy.amount_for(-2), Decimal::ZERO);
    }

    #[test]
    fn test_overdue_fine_draft() {
        let policy = FinePolicy::new(Decimal::from(5000));
        let rec = record("2024-01-15");
        let now = Utc::now();
        let draft = policy
            .overdue_fine(&rec, &reader(), Some("Dế Mèn phiêu lưu ký"), date("2024-01-20"), now, None, None)
            .unwrap();

        assert_eq!(draft.borrow_id, rec.id);
        assert_eq!(draft.fine_amount, Decimal::from(25_000));
        assert_eq!(draft.overdue_days, Some(5));
        assert_eq!(draft.daily_rate, Some(Decimal::from(5000)));
        assert_eq!(draft.reason, FineReason::Overdue);
        assert_eq!(draft.fine_date, Some(now));
        assert_eq!(draft.description.as_deref(), Some("HS0012 - Nguyễn Văn An nộp phạt"));
        assert!(draft.librarian_notes.unwrap().contains("Dế Mèn phiêu lưu ký"));
    }

    #[test]
    fn test_overdue_fine_with_override() {
        let policy = FinePolicy::new(Decimal::from(5000));
        let rec = record("2024-01-15");
        let draft = policy
            .overdue_fine(
                &rec,
                &reader(),
                None,
                date("2024-01-19"),
                Utc::now(),
                Some(Decimal::from(30_000)),
                Some("Làm rách bìa".to_string()),
            )
            .unwrap();
        assert_eq!(draft.fine_amount, Decimal::from(30_000));
        assert_eq!(draft.daily_rate, Some(Decimal::from(7500)));
        assert_eq!(draft.description.as_deref(), Some("Làm rách bìa"));
    }

    #[test]
    fn test_overdue_fine_requires_amount_when_not_overdue() {
        let policy = FinePolicy::new(Decimal::from(5000));
        let rec = record("2024-01-15");
        let err = policy
            .overdue_fine(&rec, &reader(), None, date("2024-01-15"), Utc::now(), None, None)
            .unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));

        let err = policy
            .overdue_fine(&rec, &reader(), None, date("2024-01-20"), Utc::now(), Some(Decimal::ZERO), None)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_implied_daily_rate_floors() {
        let policy = FinePolicy::new(Decimal::from(5000));
        assert_eq!(policy.implied_daily_rate(Decimal::from(7_001), 2), Decimal::from(3500));
        assert_eq!(policy.implied_daily_rate(Decimal::from(9000), 4), Decimal::from(2250));
    }

    #[test]
    fn test_implied_daily_rate_falls_back() {
        let policy = FinePolicy::new(Decimal::from(5000));
        // floor(1 / 3) == 0
        assert_eq!(policy.implied_daily_rate(Decimal::from(1), 3), Decimal::from(5000));
        assert_eq!(policy.implied_daily_rate(Decimal::from(9000), 0), Decimal::from(5000));
    }

    #[test]
    fn test_partial_then_full_payment() {
        let f = fine(25_000, 0, FineStatus::Unpaid);
        let outcome = apply_payment(&f, Decimal::from(10_000)).unwrap();
        assert_eq!(outcome.paid_amount, Decimal::from(10_000));
        assert_eq!(outcome.status, FineStatus::Unpaid);
        assert!(!outcome.settled);

        let f = fine(25_000, 10_000, FineStatus::Unpaid);
        let outcome = apply_payment(&f, Decimal::from(15_000)).unwrap();
        assert_eq!(outcome.status, FineStatus::Paid);
        assert!(outcome.settled);
    }

    #[test]
    fn test_payment_rejections() {
        let f = fine(25_000, 20_000, FineStatus::Unpaid);
        assert!(apply_payment(&f, Decimal::from(5_001)).is_err());
        assert!(apply_payment(&f, Decimal::ZERO).is_err());
        assert!(apply_payment(&fine(25_000, 25_000, FineStatus::Paid), Decimal::ONE).is_err());
        assert!(apply_payment(&fine(25_000, 0, FineStatus::Waived), Decimal::ONE).is_err());
    }

    #[test]
    fn test_waiver_only_when_unpaid() {
        assert!(ensure_waivable(&fine(1, 0, FineStatus::Unpaid)).is_ok());
        assert!(ensure_waivable(&fine(1, 1, FineStatus::Paid)).is_err());
    }
}
