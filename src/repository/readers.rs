//! Readers and reader types repository

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::reader::{CreateReader, Reader, ReaderType, ReaderWithType},
};

#[derive(Clone)]
pub struct ReadersRepository {
    pool: Pool<Postgres>,
}

impl ReadersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get reader by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Reader> {
        sqlx::query_as::<_, Reader>("SELECT * FROM readers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reader with id {} not found", id)))
    }

    /// Get reader with its reader type
    pub async fn get_with_type(&self, id: Uuid) -> AppResult<ReaderWithType> {
        let reader = self.get_by_id(id).await?;
        let reader_type = match reader.reader_type_id {
            Some(type_id) => sqlx::query_as::<_, ReaderType>("SELECT * FROM reader_types WHERE id = $1")
                .bind(type_id)
                .fetch_optional(&self.pool)
                .await?,
            None => None,
        };
        Ok(ReaderWithType { reader, reader_type })
    }

    /// Lock a reader row for the rest of the transaction.
    /// Serializes concurrent borrows by the same reader against the borrow limit.
    pub async fn lock(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<Reader> {
        sqlx::query_as::<_, Reader>("SELECT * FROM readers WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reader with id {} not found", id)))
    }

    pub async fn get_type(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<ReaderType> {
        sqlx::query_as::<_, ReaderType>("SELECT * FROM reader_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reader type with id {} not found", id)))
    }

    /// List reader types
    pub async fn list_types(&self) -> AppResult<Vec<ReaderType>> {
        let types = sqlx::query_as::<_, ReaderType>("SELECT * FROM reader_types ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(types)
    }

    /// Create a new reader. A duplicate card number surfaces as a unique violation.
    pub async fn create(&self, data: &CreateReader) -> AppResult<Reader> {
        let reader = sqlx::query_as::<_, Reader>(
            r#"
            INSERT INTO readers (id, full_name, card_number, email, phone, reader_type_id, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, TRUE)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.full_name.trim())
        .bind(data.card_number.trim())
        .bind(&data.email)
        .bind(&data.phone)
        .bind(data.reader_type_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(reader)
    }

    pub async fn reader_type_exists(&self, id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reader_types WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
