//! Borrow record service

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    circulation::{
        self,
        fines::FinePolicy,
        lifecycle::{ensure_deletable, BorrowAction},
    },
    config::CirculationConfig,
    error::{AppError, AppResult},
    models::{
        borrow_record::{
            BorrowRecord, BorrowRecordDetails, BorrowRecordQuery, CreateBorrowRecord, FineAndSettle,
            RenewBorrowRecord,
        },
        enums::{BorrowStatus, CopyStatus},
        fine::Fine,
    },
    repository::{
        borrow_records::{NewBorrowRecord, Transition},
        Repository,
    },
};

use super::{
    local_now,
    notifications::{Notice, ReaderNotifier},
};

#[derive(Clone)]
pub struct BorrowService {
    repository: Repository,
    config: CirculationConfig,
    notifier: Arc<dyn ReaderNotifier>,
}

impl BorrowService {
    pub fn new(repository: Repository, config: CirculationConfig, notifier: Arc<dyn ReaderNotifier>) -> Self {
        Self {
            repository,
            config,
            notifier,
        }
    }

    /// List borrow records with due-date flags computed as of now
    pub async fn list(&self, query: &BorrowRecordQuery) -> AppResult<(Vec<BorrowRecordDetails>, i64)> {
        let (rows, total) = self.repository.borrow_records.list(query).await?;
        let now = local_now();
        let details = rows
            .into_iter()
            .map(|row| row.into_details(now, self.config.due_soon_threshold_days))
            .collect();
        Ok((details, total))
    }

    /// Get a borrow record with due-date flags
    pub async fn get(&self, id: Uuid) -> AppResult<BorrowRecordDetails> {
        let row = self.repository.borrow_records.get_details(id).await?;
        Ok(row.into_details(local_now(), self.config.due_soon_threshold_days))
    }

    /// Create a borrow record, either awaiting approval or directly borrowed
    pub async fn create(&self, data: CreateBorrowRecord, librarian_id: Uuid) -> AppResult<BorrowRecordDetails> {
        let status = data.status.unwrap_or(BorrowStatus::PendingApproval);
        if !matches!(status, BorrowStatus::PendingApproval | BorrowStatus::Borrowed) {
            return Err(AppError::Validation(format!(
                "A new borrow record must be pending_approval or borrowed, not {}",
                status
            )));
        }

        let today = local_now().date();
        let borrow_date = data.borrow_date.unwrap_or(today);

        let mut tx = self.repository.pool.begin().await?;

        let reader = self.repository.readers.lock(&mut tx, data.reader_id).await?;
        if !reader.is_active {
            return Err(AppError::BusinessRule(format!(
                "Reader {} is not active",
                reader.card_number
            )));
        }
        let type_id = reader.reader_type_id.ok_or_else(|| {
            AppError::BusinessRule(format!("Reader {} has no reader type", reader.card_number))
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

        let copy = self.repository.copies.lock(&mut tx, data.copy_id).await?;
        if copy.status != CopyStatus::Available {
            return Err(AppError::BusinessRule(format!(
                "Copy {} is not available ({})",
                copy.barcode, copy.status
            )));
        }

        let due_date = match data.due_date {
            Some(due) if due < borrow_date => {
                return Err(AppError::Validation(format!(
                    "Due date {} is before borrow date {}",
                    due, borrow_date
                )));
            }
            Some(due) => due,
            None => circulation::calculate_due_date(borrow_date, &reader_type)?,
        };

        let record = self
            .repository
            .borrow_records
            .insert(
                &mut tx,
                &NewBorrowRecord {
                    reader_id: reader.id,
                    copy_id: copy.id,
                    librarian_id: Some(librarian_id),
                    borrow_date,
                    due_date,
                    status,
                    borrow_notes: data.borrow_notes,
                },
            )
            .await?;

        if status == BorrowStatus::Borrowed {
            self.repository
                .copies
                .set_status(&mut tx, copy.id, CopyStatus::Borrowed, None)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            borrow_id = %record.id,
            reader = %reader.card_number,
            copy = %copy.barcode,
            status = %status,
            "Borrow record created"
        );

        self.get(record.id).await
    }

    /// Run a lifecycle action: check the transition, update conditionally and
    /// write the copy side effect, all in one transaction.
    async fn run_action(&self, id: Uuid, action: BorrowAction, change: Transition) -> AppResult<BorrowRecord> {
        let mut tx = self.repository.pool.begin().await?;

        let current = self.repository.borrow_records.lock(&mut tx, id).await?;
        let target = action.apply(current.status)?;

        let updated = self
            .repository
            .borrow_records
            .transition(&mut tx, id, action.allowed_from(), target, &change)
            .await?;

        self.apply_copy_side_effect(&mut tx, action, current.copy_id).await?;

        tx.commit().await?;

        tracing::info!(borrow_id = %id, from = %current.status, to = %target, "Borrow record {}", action.as_str());
        Ok(updated)
    }

    async fn apply_copy_side_effect(
        &self,
        conn: &mut sqlx::PgConnection,
        action: BorrowAction,
        copy_id: Uuid,
    ) -> AppResult<()> {
        let copies = &self.repository.copies;
        match (action, action.copy_status()) {
            (BorrowAction::Approve, Some(status)) => {
                let taken = copies
                    .set_status_if(conn, copy_id, status, &[CopyStatus::Available, CopyStatus::Reserved])
                    .await?;
                if !taken {
                    return Err(AppError::BusinessRule(
                        "Copy is no longer available for this borrow record".to_string(),
                    ));
                }
            }
            // only release a copy this record was holding
            (BorrowAction::Cancel, Some(status)) => {
                copies
                    .set_status_if(conn, copy_id, status, &[CopyStatus::Borrowed, CopyStatus::Reserved])
                    .await?;
            }
            (_, Some(status)) => copies.set_status(conn, copy_id, status, None).await?,
            (_, None) => {}
        }
        Ok(())
    }

    pub async fn approve(&self, id: Uuid, notes: Option<String>) -> AppResult<BorrowRecordDetails> {
        let change = Transition {
            borrow_notes: notes,
            ..Default::default()
        };
        self.run_action(id, BorrowAction::Approve, change).await?;
        self.get(id).await
    }

    pub async fn reject(&self, id: Uuid, notes: Option<String>) -> AppResult<BorrowRecordDetails> {
        let change = Transition {
            borrow_notes: notes,
            ..Default::default()
        };
        self.run_action(id, BorrowAction::Reject, change).await?;
        self.get(id).await
    }

    /// Return the copy: record returned today, copy available
    pub async fn return_record(&self, id: Uuid, return_notes: Option<String>) -> AppResult<BorrowRecordDetails> {
        let change = Transition {
            return_date: Some(local_now().date()),
            return_notes,
            ..Default::default()
        };
        self.run_action(id, BorrowAction::Return, change).await?;
        self.get(id).await
    }

    /// Extend the due date within the renewal window
    pub async fn renew(&self, id: Uuid, data: RenewBorrowRecord) -> AppResult<BorrowRecordDetails> {
        let mut tx = self.repository.pool.begin().await?;

        let current = self.repository.borrow_records.lock(&mut tx, id).await?;
        let target = BorrowAction::Renew.apply(current.status)?;
        let new_due = circulation::resolve_renewal(
            current.due_date,
            data.new_due_date,
            self.config.renewal_max_extension_days,
        )?;

        let change = Transition {
            due_date: Some(new_due),
            renewed: true,
            borrow_notes: data.notes,
            ..Default::default()
        };
        self.repository
            .borrow_records
            .transition(&mut tx, id, BorrowAction::Renew.allowed_from(), target, &change)
            .await?;
        self.apply_copy_side_effect(&mut tx, BorrowAction::Renew, current.copy_id)
            .await?;

        tx.commit().await?;

        tracing::info!(borrow_id = %id, old_due = %current.due_date, new_due = %new_due, "Borrow record renewed");
        self.get(id).await
    }

    pub async fn mark_overdue(&self, id: Uuid) -> AppResult<BorrowRecord> {
        self.run_action(id, BorrowAction::MarkOverdue, Transition::default()).await
    }

    pub async fn cancel(&self, id: Uuid, notes: Option<String>) -> AppResult<BorrowRecordDetails> {
        let change = Transition {
            borrow_notes: notes,
            ..Default::default()
        };
        self.run_action(id, BorrowAction::Cancel, change).await?;
        self.get(id).await
    }

    /// Delete a finished record
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.repository.pool.begin().await?;
        let current = self.repository.borrow_records.lock(&mut tx, id).await?;
        ensure_deletable(current.status)?;
        self.repository
            .borrow_records
            .delete(&mut tx, id, &[current.status])
            .await?;
        tx.commit().await?;
        tracing::info!(borrow_id = %id, "Borrow record deleted");
        Ok(())
    }

    /// Create an overdue fine for a record and settle the loan in the same
    /// transaction: an open loan is returned and its copy released; an already
    /// returned loan only gets the copy status the librarian picked.
    pub async fn fine_and_settle(&self, id: Uuid, data: FineAndSettle) -> AppResult<(Fine, BorrowRecordDetails)> {
        if matches!(data.copy_status, Some(CopyStatus::Borrowed | CopyStatus::Reserved)) {
            return Err(AppError::Validation(
                "Copy status after settlement must not be borrowed or reserved".to_string(),
            ));
        }
        let now = local_now();
        let policy = FinePolicy::from_config(&self.config);

        let mut tx = self.repository.pool.begin().await?;

        let current = self.repository.borrow_records.lock(&mut tx, id).await?;
        let closes_loan = BorrowAction::Return.is_allowed(current.status);
        if !closes_loan && current.status != BorrowStatus::Returned {
            return Err(AppError::BusinessRule(format!(
                "Cannot fine a borrow record in status '{}'",
                current.status
            )));
        }

        let row = self.repository.borrow_records.get_details_in(&mut tx, id).await?;
        let draft = policy.overdue_fine(
            &current,
            &row.reader(),
            row.book_title.as_deref(),
            now.date(),
            Utc::now(),
            data.amount,
            data.reason,
        )?;
        let fine_date = draft.fine_date.unwrap_or_else(Utc::now);
        let fine = self.repository.fines.insert(&mut tx, &draft, fine_date).await?;

        if closes_loan {
            let change = Transition {
                return_date: Some(now.date()),
                ..Default::default()
            };
            self.repository
                .borrow_records
                .transition(&mut tx, id, BorrowAction::Return.allowed_from(), BorrowStatus::Returned, &change)
                .await?;
            let copy_status = data.copy_status.unwrap_or(CopyStatus::Available);
            self.repository
                .copies
                .set_status(&mut tx, current.copy_id, copy_status, None)
                .await?;
        } else if let Some(copy_status) = data.copy_status {
            self.repository
                .copies
                .set_status(&mut tx, current.copy_id, copy_status, None)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            borrow_id = %id,
            fine_id = %fine.id,
            amount = %fine.fine_amount,
            closed_loan = closes_loan,
            "Fine created from borrow record"
        );

        let details = self.get(id).await?;
        Ok((fine, details))
    }

    /// Send a due / overdue reminder. Delivery failure is reported to the caller.
    pub async fn remind(&self, id: Uuid, custom_message: Option<String>) -> AppResult<BorrowRecordDetails> {
        let details = self.get(id).await?;
        let status = details.record.status;
        if !(status.is_on_loan() || status == BorrowStatus::Overdue) {
            return Err(AppError::BusinessRule(format!(
                "No reminder for a borrow record in status '{}'",
                status
            )));
        }

        let reader = self.repository.readers.get_by_id(details.record.reader_id).await?;
        let title = details.physical_copy.book_title.clone().unwrap_or_default();
        let notice = Notice::loan_reminder(
            &reader,
            &title,
            details.record.due_date,
            details.days_overdue,
            details.days_until_due,
            custom_message.as_deref(),
        );
        self.notifier.send(&notice).await?;

        tracing::info!(borrow_id = %id, reader = %reader.card_number, "Reminder sent");
        Ok(details)
    }
}
