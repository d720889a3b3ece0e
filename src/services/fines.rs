//! Fine service

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    circulation::fines::{apply_payment, ensure_waivable},
    error::{AppError, AppResult},
    models::fine::{CreateFine, Fine, FineQuery, PayFine},
    repository::Repository,
};

#[derive(Clone)]
pub struct FineService {
    repository: Repository,
}

impl FineService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &FineQuery) -> AppResult<(Vec<Fine>, i64)> {
        self.repository.fines.list(query).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Fine> {
        self.repository.fines.get_by_id(id).await
    }

    /// Manually create a fine against a borrow record
    pub async fn create(&self, data: CreateFine) -> AppResult<Fine> {
        if data.fine_amount <= Decimal::ZERO {
            return Err(AppError::Validation("Fine amount must be positive".to_string()));
        }

        let mut tx = self.repository.pool.begin().await?;
        // the record must exist; locking it orders us with concurrent settlements
        self.repository.borrow_records.lock(&mut tx, data.borrow_id).await?;
        let fine_date = data.fine_date.unwrap_or_else(Utc::now);
        let fine = self.repository.fines.insert(&mut tx, &data, fine_date).await?;
        tx.commit().await?;

        tracing::info!(fine_id = %fine.id, borrow_id = %fine.borrow_id, amount = %fine.fine_amount, "Fine created");
        Ok(fine)
    }

    /// Record a (partial) payment
    pub async fn pay(&self, id: Uuid, data: PayFine) -> AppResult<Fine> {
        let mut tx = self.repository.pool.begin().await?;

        let fine = self.repository.fines.lock(&mut tx, id).await?;
        let outcome = apply_payment(&fine, data.amount)?;
        let updated = self
            .repository
            .fines
            .record_payment(
                &mut tx,
                id,
                fine.paid_amount,
                &outcome,
                data.payment_method.trim(),
                data.librarian_notes.as_deref(),
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            fine_id = %id,
            amount = %data.amount,
            paid = %updated.paid_amount,
            settled = outcome.settled,
            "Fine payment recorded"
        );
        Ok(updated)
    }

    pub async fn waive(&self, id: Uuid, reason: Option<String>) -> AppResult<Fine> {
        let mut tx = self.repository.pool.begin().await?;
        let fine = self.repository.fines.lock(&mut tx, id).await?;
        ensure_waivable(&fine)?;
        let updated = self.repository.fines.waive(&mut tx, id, reason.as_deref()).await?;
        tx.commit().await?;

        tracing::info!(fine_id = %id, amount = %fine.fine_amount, "Fine waived");
        Ok(updated)
    }
}
