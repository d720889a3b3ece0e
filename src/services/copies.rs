//! Physical copy service

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::CopyStatus,
        physical_copy::{PhysicalCopy, UpdateCopyStatus},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CopyService {
    repository: Repository,
}

impl CopyService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PhysicalCopy> {
        self.repository.copies.get_by_id(id).await
    }

    /// Manual status change (damaged, lost, maintenance...).
    /// `borrowed` is only ever set by the borrow flow.
    pub async fn update_status(&self, id: Uuid, data: UpdateCopyStatus) -> AppResult<PhysicalCopy> {
        if data.status == CopyStatus::Borrowed {
            return Err(AppError::Validation(
                "A copy becomes borrowed through a borrow record, not a status update".to_string(),
            ));
        }

        let mut tx = self.repository.pool.begin().await?;
        let copy = self.repository.copies.lock(&mut tx, id).await?;
        self.repository
            .copies
            .set_status(&mut tx, id, data.status, data.notes.as_deref())
            .await?;
        tx.commit().await?;

        tracing::info!(copy = %copy.barcode, from = %copy.status, to = %data.status, "Copy status updated");
        self.get(id).await
    }
}
