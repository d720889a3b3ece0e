//! Reservations repository

use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::ReservationStatus,
        reservation::{Reservation, ReservationQuery},
    },
};

const SELECT_RESERVATION: &str = r#"
    SELECT res.*, b.title AS book_title, r.full_name AS reader_name
    FROM reservations res
    JOIN books b ON b.id = res.book_id
    JOIN readers r ON r.id = res.reader_id
"#;

/// New row written by `insert`
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub reader_id: Uuid,
    pub book_id: Uuid,
    pub physical_copy_id: Option<Uuid>,
    pub reservation_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List reservations with optional status filter and pagination
    pub async fn list(&self, query: &ReservationQuery) -> AppResult<(Vec<Reservation>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.limit.unwrap_or(20).clamp(1, 200);
        let offset = (page - 1) * per_page;

        let where_clause = if query.status.is_some() {
            "WHERE res.status = $1"
        } else {
            ""
        };

        let count_q = format!("SELECT COUNT(*) FROM reservations res {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(status) = query.status { count_builder = count_builder.bind(status); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "{} {} ORDER BY res.reservation_date DESC, res.created_at DESC LIMIT {} OFFSET {}",
            SELECT_RESERVATION, where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, Reservation>(&select_q);
        if let Some(status) = query.status { builder = builder.bind(status); }
        let rows = builder.fetch_all(&self.pool).await?;

        Ok((rows, total))
    }

    /// Get reservation by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(&format!("{} WHERE res.id = $1", SELECT_RESERVATION))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    /// Reservations placed on a book, newest first
    pub async fn list_by_book(&self, book_id: Uuid) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(&format!(
            "{} WHERE res.book_id = $1 ORDER BY res.reservation_date DESC",
            SELECT_RESERVATION
        ))
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// All pending reservations, soonest expiry first
    pub async fn list_pending(&self) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(&format!(
            "{} WHERE res.status = 'pending' ORDER BY res.expiry_date",
            SELECT_RESERVATION
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Pending reservations held by a reader
    pub async fn pending_for_reader(&self, conn: &mut PgConnection, reader_id: Uuid) -> AppResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, Reservation>(&format!(
            "{} WHERE res.reader_id = $1 AND res.status = 'pending'",
            SELECT_RESERVATION
        ))
        .bind(reader_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Lock a reservation for the rest of the transaction
    pub async fn lock(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(&format!(
            "{} WHERE res.id = $1 FOR UPDATE OF res",
            SELECT_RESERVATION
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reservation with id {} not found", id)))
    }

    pub async fn insert(&self, conn: &mut PgConnection, data: &NewReservation) -> AppResult<Uuid> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO reservations (
                id, reader_id, book_id, physical_copy_id,
                reservation_date, expiry_date, status, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.reader_id)
        .bind(data.book_id)
        .bind(data.physical_copy_id)
        .bind(data.reservation_date)
        .bind(data.expiry_date)
        .bind(&data.notes)
        .fetch_one(&mut *conn)
        .await?;
        Ok(id)
    }

    /// pending -> fulfilled
    pub async fn mark_fulfilled(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        copy_id: Uuid,
        librarian_id: Uuid,
        notes: Option<&str>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'fulfilled', physical_copy_id = $2, fulfilled_date = NOW(),
                fulfilled_by = $3, notes = COALESCE($4, notes)
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(copy_id)
        .bind(librarian_id)
        .bind(notes)
        .execute(&mut *conn)
        .await?;
        ensure_changed(result.rows_affected(), id)
    }

    /// pending -> cancelled / expired
    pub async fn close(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        status: ReservationStatus,
        reason: Option<&str>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $2, cancelled_date = NOW(), cancellation_reason = $3
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(reason)
        .execute(&mut *conn)
        .await?;
        ensure_changed(result.rows_affected(), id)
    }

    /// Count reservations per status
    pub async fn count_by_status(&self) -> AppResult<Vec<(ReservationStatus, i64)>> {
        let rows: Vec<(ReservationStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM reservations GROUP BY status ORDER BY status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn ensure_changed(rows: u64, id: Uuid) -> AppResult<()> {
    if rows == 0 {
        return Err(AppError::Conflict(format!(
            "Reservation {} is no longer pending",
            id
        )));
    }
    Ok(())
}
