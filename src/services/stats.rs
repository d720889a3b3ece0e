//! Statistics service

use chrono::NaiveDate;

use crate::{
    api::stats::{BorrowStats, FineStats, OverdueStats, ReservationStats, StatEntry},
    circulation,
    config::CirculationConfig,
    error::AppResult,
    models::enums::BorrowStatus,
    repository::Repository,
};

use super::local_now;

/// Overdue age buckets, inclusive bounds in days
const OVERDUE_BUCKETS: [(&str, i64, i64); 4] = [
    ("1-7", 1, 7),
    ("8-14", 8, 14),
    ("15-30", 15, 30),
    ("31+", 31, i64::MAX),
];

/// Group overdue loans by how many days late they are at `today`
pub fn overdue_stats(due_dates: &[NaiveDate], today: NaiveDate) -> OverdueStats {
    let days: Vec<i64> = due_dates
        .iter()
        .map(|due| circulation::days_overdue(*due, today))
        .collect();

    let by_days = OVERDUE_BUCKETS
        .iter()
        .map(|(label, min, max)| StatEntry {
            label: label.to_string(),
            value: days.iter().filter(|d| *d >= min && *d <= max).count() as i64,
        })
        .collect();

    OverdueStats {
        total: days.len() as i64,
        max_days_overdue: days.iter().copied().max().unwrap_or(0),
        by_days,
    }
}

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
    config: CirculationConfig,
}

impl StatsService {
    pub fn new(repository: Repository, config: CirculationConfig) -> Self {
        Self { repository, config }
    }

    pub async fn borrow_stats(&self) -> AppResult<BorrowStats> {
        let counts = self.repository.borrow_records.count_by_status().await?;
        let count_of = |wanted: &[BorrowStatus]| -> i64 {
            counts
                .iter()
                .filter(|(s, _)| wanted.contains(s))
                .map(|(_, n)| n)
                .sum()
        };

        Ok(BorrowStats {
            total: counts.iter().map(|(_, n)| n).sum(),
            active: count_of(&BorrowStatus::ACTIVE),
            on_loan: count_of(&BorrowStatus::ON_LOAN),
            overdue: count_of(&[BorrowStatus::Overdue]),
            pending_approval: count_of(&[BorrowStatus::PendingApproval]),
            by_status: counts
                .iter()
                .map(|(status, n)| StatEntry {
                    label: status.to_string(),
                    value: *n,
                })
                .collect(),
        })
    }

    pub async fn overdue_stats(&self) -> AppResult<OverdueStats> {
        let due_dates = self.repository.borrow_records.overdue_due_dates().await?;
        Ok(overdue_stats(&due_dates, local_now().date()))
    }

    pub async fn fine_stats(&self) -> AppResult<FineStats> {
        let totals = self.repository.fines.totals().await?;
        Ok(FineStats {
            total: totals.total_count,
            unpaid: totals.unpaid_count,
            paid: totals.paid_count,
            partially_paid: totals.partially_paid_count,
            waived: totals.waived_count,
            total_amount: totals.total_amount,
            paid_amount: totals.paid_amount,
            outstanding_amount: totals.outstanding_amount,
            waived_amount: totals.waived_amount,
        })
    }

    pub async fn reservation_stats(&self) -> AppResult<ReservationStats> {
        let counts = self.repository.reservations.count_by_status().await?;
        let today = local_now().date();
        let expiring_soon = self
            .repository
            .reservations
            .list_pending()
            .await?
            .iter()
            .filter(|r| circulation::is_expiring_soon(r.expiry_date, today, self.config.due_soon_threshold_days))
            .count() as i64;

        Ok(ReservationStats {
            total: counts.iter().map(|(_, n)| n).sum(),
            expiring_soon,
            by_status: counts
                .iter()
                .map(|(status, n)| StatEntry {
                    label: status.to_string(),
                    value: *n,
                })
                .collect(),
        })
    }
}
