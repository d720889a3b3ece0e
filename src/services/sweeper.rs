//! Background sweep of overdue loans and expired reservations
//!
//! Runs on a fixed interval regardless of client activity. Each record is
//! handled in its own transaction; a record that changed meanwhile is skipped.

use std::{sync::Arc, time::Duration};

use chrono::NaiveDateTime;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::{
    circulation,
    error::{AppError, AppResult},
    models::{borrow_record::BorrowRecord, reservation::Reservation, ReservationStatus},
};

use super::{local_now, Services};

/// Counts from one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub marked_overdue: usize,
    pub expired_reservations: usize,
}

/// Loans whose overdue predicate holds at `now`
pub fn select_overdue(records: Vec<BorrowRecord>, now: NaiveDateTime) -> Vec<BorrowRecord> {
    records
        .into_iter()
        .filter(|r| circulation::is_overdue(r.status, r.due_date, now))
        .collect()
}

/// Pending reservations whose expiry day has fully elapsed at `now`
pub fn select_expired(reservations: Vec<Reservation>, now: NaiveDateTime) -> Vec<Reservation> {
    reservations
        .into_iter()
        .filter(|r| r.status == ReservationStatus::Pending)
        .filter(|r| circulation::is_expired_by_end_of_day(r.expiry_date, now))
        .collect()
}

fn lost_race(e: &AppError) -> bool {
    matches!(e, AppError::Conflict(_) | AppError::BusinessRule(_) | AppError::NotFound(_))
}

pub struct Sweeper {
    services: Arc<Services>,
    poll_interval: Duration,
}

impl Sweeper {
    /// Spawn the sweeper on the runtime
    pub fn spawn(services: Arc<Services>) -> tokio::task::JoinHandle<()> {
        let poll_interval = Duration::from_secs(services.circulation.sweep_interval_secs.max(1));
        let sweeper = Self {
            services,
            poll_interval,
        };
        tokio::spawn(async move {
            sweeper.start().await;
        })
    }

    async fn start(&self) {
        info!("Starting circulation sweeper with interval {:?}", self.poll_interval);

        let mut interval = interval(self.poll_interval);
        loop {
            interval.tick().await;
            match self.run_once(local_now()).await {
                Ok(report) if report == SweepReport::default() => debug!("Sweep: nothing to do"),
                Ok(report) => info!(
                    marked_overdue = report.marked_overdue,
                    expired_reservations = report.expired_reservations,
                    "Sweep completed"
                ),
                Err(e) => error!("Error during circulation sweep: {}", e),
            }
        }
    }

    pub async fn run_once(&self, now: NaiveDateTime) -> AppResult<SweepReport> {
        let mut report = SweepReport::default();

        let candidates = self
            .services
            .repository
            .borrow_records
            .overdue_candidates(now.date())
            .await?;
        for record in select_overdue(candidates, now) {
            match self.services.borrows.mark_overdue(record.id).await {
                Ok(_) => report.marked_overdue += 1,
                Err(e) if lost_race(&e) => debug!(borrow_id = %record.id, error = %e, "Skipped overdue candidate"),
                Err(e) => warn!(borrow_id = %record.id, error = %e, "Failed to mark borrow record overdue"),
            }
        }

        let pending = self.services.repository.reservations.list_pending().await?;
        for reservation in select_expired(pending, now) {
            let reason = Some("Hết hạn giữ chỗ".to_string());
            match self.services.reservations.expire(reservation.id, reason).await {
                Ok(_) => report.expired_reservations += 1,
                Err(e) if lost_race(&e) => {
                    debug!(reservation_id = %reservation.id, error = %e, "Skipped expired reservation")
                }
                Err(e) => warn!(reservation_id = %reservation.id, error = %e, "Failed to expire reservation"),
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BorrowStatus;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn record(status: BorrowStatus, due: &str) -> BorrowRecord {
        let now = Utc::now();
        BorrowRecord {
            id: Uuid::new_v4(),
            reader_id: Uuid::new_v4(),
            copy_id: Uuid::new_v4(),
            librarian_id: None,
            borrow_date: date("2024-01-01"),
            due_date: date(due),
            return_date: None,
            status,
            renewal_count: 0,
            borrow_notes: None,
            return_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn reservation(status: ReservationStatus, expiry: &str) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            reader_id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            physical_copy_id: None,
            reservation_date: date("2024-02-25"),
            expiry_date: date(expiry),
            status,
            notes: None,
            fulfilled_date: None,
            fulfilled_by: None,
            cancelled_date: None,
            cancellation_reason: None,
            created_at: Utc::now(),
            book_title: None,
            reader_name: None,
        }
    }

    #[test]
    fn test_select_overdue() {
        let now = at("2024-01-15 09:00:00");
        let records = vec![
            record(BorrowStatus::Borrowed, "2024-01-10"),
            record(BorrowStatus::Renewed, "2024-01-15"),
            record(BorrowStatus::Borrowed, "2024-01-16"),
            record(BorrowStatus::Returned, "2024-01-01"),
        ];
        let selected = select_overdue(records, now);
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|r| r.due_date <= date("2024-01-15")));
    }

    #[test]
    fn test_select_expired_waits_for_end_of_day() {
        let pending = vec![
            reservation(ReservationStatus::Pending, "2024-03-01"),
            reservation(ReservationStatus::Pending, "2024-02-29"),
            reservation(ReservationStatus::Cancelled, "2024-02-01"),
        ];
        let selected = select_expired(pending.clone(), at("2024-03-01 18:00:00"));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].expiry_date, date("2024-02-29"));

        let selected = select_expired(pending, at("2024-03-02 00:00:01"));
        assert_eq!(selected.len(), 2);
    }
}
