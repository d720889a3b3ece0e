//! Borrow records repository

use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow_record::{BorrowRecord, BorrowRecordQuery, BorrowRecordRow},
        enums::BorrowStatus,
    },
};

const SELECT_DETAILS: &str = r#"
    SELECT br.*,
           r.full_name AS reader_full_name,
           r.card_number AS reader_card_number,
           c.barcode AS copy_barcode,
           c.status AS copy_status,
           c.book_id AS book_id,
           b.title AS book_title
    FROM borrow_records br
    JOIN readers r ON r.id = br.reader_id
    JOIN physical_copies c ON c.id = br.copy_id
    JOIN books b ON b.id = c.book_id
"#;

fn status_strings(statuses: &[BorrowStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

/// New row written by `insert`
#[derive(Debug, Clone)]
pub struct NewBorrowRecord {
    pub reader_id: Uuid,
    pub copy_id: Uuid,
    pub librarian_id: Option<Uuid>,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: BorrowStatus,
    pub borrow_notes: Option<String>,
}

/// Field changes applied together with a status change
#[derive(Debug, Clone, Default)]
pub struct Transition {
    pub due_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub renewed: bool,
    pub borrow_notes: Option<String>,
    pub return_notes: Option<String>,
}

#[derive(Clone)]
pub struct BorrowRecordsRepository {
    pool: Pool<Postgres>,
}

impl BorrowRecordsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List borrow records with optional status filter, search and pagination
    pub async fn list(&self, query: &BorrowRecordQuery) -> AppResult<(Vec<BorrowRecordRow>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.limit.unwrap_or(20).clamp(1, 200);
        let offset = (page - 1) * per_page;

        let mut conditions = Vec::new();
        let mut idx = 1;

        let statuses = query.status.map(|status| match status {
            // the "borrowed" tab also shows renewed loans
            BorrowStatus::Borrowed => status_strings(&BorrowStatus::ON_LOAN),
            other => vec![other.as_str().to_string()],
        });
        if statuses.is_some() {
            conditions.push(format!("br.status = ANY(${})", idx));
            idx += 1;
        }

        let search = query
            .q
            .as_ref()
            .map(|q| q.trim())
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{}%", q));
        if search.is_some() {
            conditions.push(format!(
                "(r.full_name ILIKE ${i} OR r.card_number ILIKE ${i} OR c.barcode ILIKE ${i} OR b.title ILIKE ${i})",
                i = idx
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_q = format!(
            r#"
            SELECT COUNT(*)
            FROM borrow_records br
            JOIN readers r ON r.id = br.reader_id
            JOIN physical_copies c ON c.id = br.copy_id
            JOIN books b ON b.id = c.book_id
            {}
            "#,
            where_clause
        );
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(ref s) = statuses { count_builder = count_builder.bind(s); }
        if let Some(ref q) = search { count_builder = count_builder.bind(q); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "{} {} ORDER BY br.created_at DESC LIMIT {} OFFSET {}",
            SELECT_DETAILS, where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, BorrowRecordRow>(&select_q);
        if let Some(ref s) = statuses { builder = builder.bind(s); }
        if let Some(ref q) = search { builder = builder.bind(q); }
        let rows = builder.fetch_all(&self.pool).await?;

        Ok((rows, total))
    }

    /// Get borrow record with reader, copy and book
    pub async fn get_details(&self, id: Uuid) -> AppResult<BorrowRecordRow> {
        sqlx::query_as::<_, BorrowRecordRow>(&format!("{} WHERE br.id = $1", SELECT_DETAILS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
    }

    /// Same as `get_details`, inside a transaction
    pub async fn get_details_in(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<BorrowRecordRow> {
        sqlx::query_as::<_, BorrowRecordRow>(&format!("{} WHERE br.id = $1", SELECT_DETAILS))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
    }

    /// Lock a borrow record for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<BorrowRecord> {
        sqlx::query_as::<_, BorrowRecord>("SELECT * FROM borrow_records WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrow record with id {} not found", id)))
    }

    /// Count records still holding a copy for a reader
    pub async fn count_active_for_reader(&self, conn: &mut PgConnection, reader_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records WHERE reader_id = $1 AND status = ANY($2)",
        )
        .bind(reader_id)
        .bind(status_strings(&BorrowStatus::ACTIVE))
        .fetch_one(&mut *conn)
        .await?;
        Ok(count)
    }

    /// Pending borrow record attached to a copy, if any
    pub async fn find_pending_for_copy(
        &self,
        conn: &mut PgConnection,
        reader_id: Uuid,
        copy_id: Uuid,
    ) -> AppResult<Option<BorrowRecord>> {
        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            SELECT * FROM borrow_records
            WHERE reader_id = $1 AND copy_id = $2 AND status = 'pending_approval'
            FOR UPDATE
            "#,
        )
        .bind(reader_id)
        .bind(copy_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(record)
    }

    /// Insert a borrow record. A second active record for the same copy
    /// violates the partial unique index and surfaces as a conflict.
    pub async fn insert(&self, conn: &mut PgConnection, data: &NewBorrowRecord) -> AppResult<BorrowRecord> {
        let record = sqlx::query_as::<_, BorrowRecord>(
            r#"
            INSERT INTO borrow_records (
                id, reader_id, copy_id, librarian_id, borrow_date, due_date,
                status, renewal_count, borrow_notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.reader_id)
        .bind(data.copy_id)
        .bind(data.librarian_id)
        .bind(data.borrow_date)
        .bind(data.due_date)
        .bind(data.status)
        .bind(&data.borrow_notes)
        .fetch_one(&mut *conn)
        .await?;
        Ok(record)
    }

    /// Conditional status update: only applies while the record is still in
    /// one of `expected`. Zero rows means a concurrent change won.
    pub async fn transition(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        expected: &[BorrowStatus],
        target: BorrowStatus,
        change: &Transition,
    ) -> AppResult<BorrowRecord> {
        sqlx::query_as::<_, BorrowRecord>(
            r#"
            UPDATE borrow_records
            SET status = $2,
                due_date = COALESCE($4, due_date),
                return_date = COALESCE($5, return_date),
                renewal_count = renewal_count + $6,
                borrow_notes = COALESCE($7, borrow_notes),
                return_notes = COALESCE($8, return_notes),
                updated_at = NOW()
            WHERE id = $1 AND status = ANY($3)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(target)
        .bind(status_strings(expected))
        .bind(change.due_date)
        .bind(change.return_date)
        .bind(if change.renewed { 1i32 } else { 0i32 })
        .bind(&change.borrow_notes)
        .bind(&change.return_notes)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!(
                "Borrow record {} was changed by another request",
                id
            ))
        })
    }

    /// Delete a record still in one of `expected`
    pub async fn delete(&self, conn: &mut PgConnection, id: Uuid, expected: &[BorrowStatus]) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM borrow_records WHERE id = $1 AND status = ANY($2)")
            .bind(id)
            .bind(status_strings(expected))
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Borrow record {} was changed by another request",
                id
            )));
        }
        Ok(())
    }

    /// Loans still out whose due date is today or earlier
    pub async fn overdue_candidates(&self, today: NaiveDate) -> AppResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(
            r#"
            SELECT * FROM borrow_records
            WHERE status = ANY($1) AND due_date <= $2
            ORDER BY due_date
            "#,
        )
        .bind(status_strings(&BorrowStatus::ON_LOAN))
        .bind(today)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    /// Count records per status
    pub async fn count_by_status(&self) -> AppResult<Vec<(BorrowStatus, i64)>> {
        let rows: Vec<(BorrowStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM borrow_records GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Due dates of every record currently marked overdue
    pub async fn overdue_due_dates(&self) -> AppResult<Vec<NaiveDate>> {
        let dates: Vec<NaiveDate> = sqlx::query_scalar(
            "SELECT due_date FROM borrow_records WHERE status = 'overdue'",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(dates)
    }
}
