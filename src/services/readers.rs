//! Reader service

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ErrorContext},
    models::reader::{CreateReader, Reader, ReaderType, ReaderWithType},
    repository::Repository,
};

#[derive(Clone)]
pub struct ReaderService {
    repository: Repository,
}

impl ReaderService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<ReaderWithType> {
        self.repository.readers.get_with_type(id).await
    }

    pub async fn list_types(&self) -> AppResult<Vec<ReaderType>> {
        self.repository.readers.list_types().await
    }

    /// Create a reader. Failures carry the reader-creation context so the
    /// librarian sees which flow failed.
    pub async fn create(&self, data: CreateReader) -> AppResult<Reader> {
        self.create_inner(&data)
            .await
            .map_err(|e| e.with_context(ErrorContext::Reader))
    }

    async fn create_inner(&self, data: &CreateReader) -> AppResult<Reader> {
        if let Some(type_id) = data.reader_type_id {
            if !self.repository.readers.reader_type_exists(type_id).await? {
                return Err(AppError::NotFound(format!("Reader type with id {} not found", type_id)));
            }
        }
        let reader = self.repository.readers.create(data).await?;
        tracing::info!(reader_id = %reader.id, card = %reader.card_number, "Reader created");
        Ok(reader)
    }
}
