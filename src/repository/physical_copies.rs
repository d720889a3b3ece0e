//! Physical copies repository

use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{enums::CopyStatus, physical_copy::PhysicalCopy},
};

const SELECT_COPY: &str = r#"
    SELECT c.*, b.title AS book_title
    FROM physical_copies c
    JOIN books b ON b.id = c.book_id
"#;

#[derive(Clone)]
pub struct PhysicalCopiesRepository {
    pool: Pool<Postgres>,
}

impl PhysicalCopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get copy by ID (with its book title)
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<PhysicalCopy> {
        sqlx::query_as::<_, PhysicalCopy>(&format!("{} WHERE c.id = $1", SELECT_COPY))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Physical copy with id {} not found", id)))
    }

    /// Lock a copy row for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<PhysicalCopy> {
        sqlx::query_as::<_, PhysicalCopy>(&format!("{} WHERE c.id = $1 FOR UPDATE OF c", SELECT_COPY))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Physical copy with id {} not found", id)))
    }

    /// Unconditionally set the status (and optionally append notes)
    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        status: CopyStatus,
        notes: Option<&str>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE physical_copies
            SET status = $2, notes = COALESCE($3, notes), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(notes)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Physical copy with id {} not found", id)));
        }
        Ok(())
    }

    /// Set the status only when the copy is still in one of `expected`.
    /// Returns false when another transaction moved it first.
    pub async fn set_status_if(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        status: CopyStatus,
        expected: &[CopyStatus],
    ) -> AppResult<bool> {
        let expected: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();
        let result = sqlx::query(
            r#"
            UPDATE physical_copies
            SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = ANY($3)
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(&expected)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn book_exists(&self, book_id: Uuid) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    pub async fn book_title(&self, conn: &mut PgConnection, book_id: Uuid) -> AppResult<Option<String>> {
        let title: Option<String> = sqlx::query_scalar("SELECT title FROM books WHERE id = $1")
            .bind(book_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(title)
    }
}
