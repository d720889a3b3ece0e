//! Reservation service

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use crate::{
    circulation,
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        borrow_record::BorrowRecord,
        enums::{BorrowStatus, CopyStatus, ReservationStatus},
        reservation::{CreateReservation, FulfillReservation, Reservation, ReservationQuery},
    },
    repository::{
        borrow_records::{NewBorrowRecord, Transition},
        reservations::NewReservation,
        Repository,
    },
};

use super::{
    local_now,
    notifications::{notify_best_effort, Notice, ReaderNotifier},
};

/// Result of fulfilling a reservation
#[derive(Debug, Clone)]
pub struct Fulfillment {
    pub reservation: Reservation,
    pub borrow_record: BorrowRecord,
    pub notified: bool,
}

/// Copy held by the reservation that is not the one being lent, if any
fn superseded_hold(held: Option<Uuid>, lent: Uuid) -> Option<Uuid> {
    held.filter(|id| *id != lent)
}

#[derive(Clone)]
pub struct ReservationService {
    repository: Repository,
    config: CirculationConfig,
    notifier: Arc<dyn ReaderNotifier>,
}

impl ReservationService {
    pub fn new(repository: Repository, config: CirculationConfig, notifier: Arc<dyn ReaderNotifier>) -> Self {
        Self {
            repository,
            config,
            notifier,
        }
    }

    pub async fn list(&self, query: &ReservationQuery) -> AppResult<(Vec<Reservation>, i64)> {
        self.repository.reservations.list(query).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Reservation> {
        self.repository.reservations.get_by_id(id).await
    }

    pub async fn list_by_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>> {
        if !self.repository.copies.book_exists(book_id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }
        self.repository.reservations.list_by_book(book_id).await
    }

    /// Pending reservations whose hold ends within `days` (configured threshold by default)
    pub async fn expiring_soon(&self, days: Option<i64>) -> AppResult<Vec<Reservation>> {
        let threshold = days.unwrap_or(self.config.due_soon_threshold_days);
        if threshold < 0 {
            return Err(AppError::Validation("days must not be negative".to_string()));
        }
        let today = local_now().date();
        let pending = self.repository.reservations.list_pending().await?;
        Ok(pending
            .into_iter()
            .filter(|r| circulation::is_expiring_soon(r.expiry_date, today, threshold))
            .collect())
    }

    /// Place a hold on a book, optionally on a specific copy
    pub async fn create(&self, data: CreateReservation) -> AppResult<Reservation> {
        let now = local_now();
        let reservation_date = data.reservation_date.unwrap_or(now.date());
        let expiry_date = data
            .expiry_date
            .unwrap_or(reservation_date + Duration::days(self.config.reservation_hold_days));
        if expiry_date < reservation_date {
            return Err(AppError::Validation(format!(
                "Expiry date {} is before reservation date {}",
                expiry_date, reservation_date
            )));
        }
        if !self.repository.copies.book_exists(data.book_id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", data.book_id)));
        }

        let mut tx = self.repository.pool.begin().await?;

        let reader = self.repository.readers.lock(&mut tx, data.reader_id).await?;
        if !reader.is_active {
            return Err(AppError::BusinessRule(format!(
                "Reader {} is not active",
                reader.card_number
            )));
        }

        let held = self
            .repository
            .reservations
            .pending_for_reader(&mut tx, reader.id)
            .await?;
        if let Some(stale) = held
            .iter()
            .find(|r| circulation::is_expired_by_end_of_day(r.expiry_date, now))
        {
            return Err(AppError::BusinessRule(format!(
                "Reader {} has an expired reservation ({}) that must be processed first",
                reader.card_number, stale.id
            )));
        }

        if let Some(copy_id) = data.physical_copy_id {
            let copy = self.repository.copies.lock(&mut tx, copy_id).await?;
            if copy.book_id != data.book_id {
                return Err(AppError::Validation(format!(
                    "Copy {} does not belong to book {}",
                    copy.barcode, data.book_id
                )));
            }
            if copy.status == CopyStatus::Available {
                self.repository
                    .copies
                    .set_status(&mut tx, copy.id, CopyStatus::Reserved, None)
                    .await?;
            }
        }

        let id = self
            .repository
            .reservations
            .insert(
                &mut tx,
                &NewReservation {
                    reader_id: reader.id,
                    book_id: data.book_id,
                    physical_copy_id: data.physical_copy_id,
                    reservation_date,
                    expiry_date,
                    notes: data.notes,
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(reservation_id = %id, reader = %reader.card_number, expiry = %expiry_date, "Reservation created");
        self.get(id).await
    }

    /// Turn a pending reservation into a loan.
    /// The reader must have a reader type: without one there is no due date.
    pub async fn fulfill(&self, id: Uuid, data: FulfillReservation, librarian_id: Uuid) -> AppResult<Fulfillment> {
        let today = local_now().date();

        let mut tx = self.repository.pool.begin().await?;

        let reservation = self.repository.reservations.lock(&mut tx, id).await?;
        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::BusinessRule(format!(
                "Cannot fulfill a reservation in status '{}'",
                reservation.status
            )));
        }

        let reader = self.repository.readers.lock(&mut tx, reservation.reader_id).await?;
        let type_id = reader.reader_type_id.ok_or_else(|| {
            AppError::BusinessRule(format!(
                "Reader {} has no reader type; the due date cannot be computed",
                reader.card_number
            ))
        })?;
        let reader_type = self.repository.readers.get_type(&mut tx, type_id).await?;

        let active = self
            .repository
            .borrow_records
            .count_active_for_reader(&mut tx, reader.id)
            .await?;
        if active >= i64::from(reader_type.max_borrow_limit) {
            return Err(AppError::BusinessRule(format!(
                "Borrow limit reached ({}/{})",
                active, reader_type.max_borrow_limit
            )));
        }

        let copy_id = data
            .copy_id
            .or(reservation.physical_copy_id)
            .ok_or_else(|| AppError::Validation("A copy is required to fulfill this reservation".to_string()))?;
        let copy = self.repository.copies.lock(&mut tx, copy_id).await?;
        if copy.book_id != reservation.book_id {
            return Err(AppError::Validation(format!(
                "Copy {} does not belong to the reserved book",
                copy.barcode
            )));
        }
        let held_for_us = copy.status == CopyStatus::Reserved && reservation.physical_copy_id == Some(copy.id);
        if copy.status != CopyStatus::Available && !held_for_us {
            return Err(AppError::BusinessRule(format!(
                "Copy {} is not available ({})",
                copy.barcode, copy.status
            )));
        }

        if let Some(previous) = superseded_hold(reservation.physical_copy_id, copy.id) {
            self.repository
                .copies
                .set_status_if(&mut tx, previous, CopyStatus::Available, &[CopyStatus::Reserved])
                .await?;
        }

        let due_date = circulation::calculate_due_date(today, &reader_type)?;
        let borrow_record = self
            .repository
            .borrow_records
            .insert(
                &mut tx,
                &NewBorrowRecord {
                    reader_id: reader.id,
                    copy_id: copy.id,
                    librarian_id: Some(librarian_id),
                    borrow_date: today,
                    due_date,
                    status: BorrowStatus::Borrowed,
                    borrow_notes: data.notes.clone(),
                },
            )
            .await?;
        self.repository
            .reservations
            .mark_fulfilled(&mut tx, id, copy.id, librarian_id, data.notes.as_deref())
            .await?;
        self.repository
            .copies
            .set_status(&mut tx, copy.id, CopyStatus::Borrowed, None)
            .await?;

        tx.commit().await?;

        tracing::info!(
            reservation_id = %id,
            borrow_id = %borrow_record.id,
            reader = %reader.card_number,
            "Reservation fulfilled"
        );

        let reservation = self.get(id).await?;
        let title = reservation.book_title.clone().unwrap_or_default();
        let notified = notify_best_effort(
            self.notifier.as_ref(),
            &Notice::reservation_fulfilled(&reader, &title, due_date),
        )
        .await;

        Ok(Fulfillment {
            reservation,
            borrow_record,
            notified,
        })
    }

    /// Cancel a pending reservation, its pending borrow record and the copy hold
    pub async fn cancel(&self, id: Uuid, reason: Option<String>) -> AppResult<Reservation> {
        let mut tx = self.repository.pool.begin().await?;

        let reservation = self.repository.reservations.lock(&mut tx, id).await?;
        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::BusinessRule(format!(
                "Cannot cancel a reservation in status '{}'",
                reservation.status
            )));
        }

        if let Some(copy_id) = reservation.physical_copy_id {
            let pending = self
                .repository
                .borrow_records
                .find_pending_for_copy(&mut tx, reservation.reader_id, copy_id)
                .await?;
            if let Some(record) = pending {
                let change = Transition {
                    borrow_notes: reason.clone(),
                    ..Default::default()
                };
                self.repository
                    .borrow_records
                    .transition(
                        &mut tx,
                        record.id,
                        &[BorrowStatus::PendingApproval],
                        BorrowStatus::Cancelled,
                        &change,
                    )
                    .await?;
            }
            self.repository
                .copies
                .set_status_if(&mut tx, copy_id, CopyStatus::Available, &[CopyStatus::Reserved])
                .await?;
        }

        self.repository
            .reservations
            .close(&mut tx, id, ReservationStatus::Cancelled, reason.as_deref())
            .await?;

        tx.commit().await?;

        tracing::info!(reservation_id = %id, "Reservation cancelled");
        self.get(id).await
    }

    /// Expire a pending reservation and release its copy. The reader is
    /// notified on a best-effort basis.
    pub async fn expire(&self, id: Uuid, reason: Option<String>) -> AppResult<(Reservation, bool)> {
        let mut tx = self.repository.pool.begin().await?;

        let reservation = self.repository.reservations.lock(&mut tx, id).await?;
        if reservation.status != ReservationStatus::Pending {
            return Err(AppError::BusinessRule(format!(
                "Cannot expire a reservation in status '{}'",
                reservation.status
            )));
        }

        if let Some(copy_id) = reservation.physical_copy_id {
            self.repository
                .copies
                .set_status_if(&mut tx, copy_id, CopyStatus::Available, &[CopyStatus::Reserved])
                .await?;
        }
        self.repository
            .reservations
            .close(&mut tx, id, ReservationStatus::Expired, reason.as_deref())
            .await?;

        tx.commit().await?;

        tracing::info!(reservation_id = %id, "Reservation expired");

        let reader = self.repository.readers.get_by_id(reservation.reader_id).await?;
        let title = reservation.book_title.clone().unwrap_or_default();
        let notified = notify_best_effort(
            self.notifier.as_ref(),
            &Notice::reservation_expired(&reader, &title),
        )
        .await;

        Ok((self.get(id).await?, notified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_superseded_hold() {
        let held = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert_eq!(superseded_hold(Some(held), other), Some(held));
        assert_eq!(superseded_hold(Some(held), held), None);
        assert_eq!(superseded_hold(None, other), None);
    }
}
