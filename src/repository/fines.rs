//! Fines repository

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

use crate::{
    circulation::PaymentOutcome,
    error::{AppError, AppResult},
    models::{
        enums::FineStatus,
        fine::{CreateFine, Fine, FineQuery},
    },
};

/// Aggregates over the fines table
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct FineTotals {
    pub total_count: i64,
    pub unpaid_count: i64,
    pub paid_count: i64,
    pub partially_paid_count: i64,
    pub waived_count: i64,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub outstanding_amount: Decimal,
    pub waived_amount: Decimal,
}

#[derive(Clone)]
pub struct FinesRepository {
    pool: Pool<Postgres>,
}

impl FinesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List fines with optional status filter and pagination
    pub async fn list(&self, query: &FineQuery) -> AppResult<(Vec<Fine>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.limit.unwrap_or(20).clamp(1, 200);
        let offset = (page - 1) * per_page;

        let where_clause = if query.status.is_some() { "WHERE status = $1" } else { "" };

        let count_q = format!("SELECT COUNT(*) FROM fines {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q);
        if let Some(status) = query.status { count_builder = count_builder.bind(status); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT * FROM fines {} ORDER BY fine_date DESC LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, Fine>(&select_q);
        if let Some(status) = query.status { builder = builder.bind(status); }
        let rows = builder.fetch_all(&self.pool).await?;

        Ok((rows, total))
    }

    /// Get fine by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>("SELECT * FROM fines WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", id)))
    }

    pub async fn lock(&self, conn: &mut PgConnection, id: Uuid) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>("SELECT * FROM fines WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Fine with id {} not found", id)))
    }

    pub async fn insert(&self, conn: &mut PgConnection, data: &CreateFine, fine_date: DateTime<Utc>) -> AppResult<Fine> {
        let fine = sqlx::query_as::<_, Fine>(
            r#"
            INSERT INTO fines (
                id, borrow_id, fine_amount, paid_amount, status, reason, description,
                overdue_days, daily_rate, fine_date, librarian_notes
            ) VALUES ($1, $2, $3, 0, 'unpaid', $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(data.borrow_id)
        .bind(data.fine_amount)
        .bind(data.reason)
        .bind(&data.description)
        .bind(data.overdue_days)
        .bind(data.daily_rate)
        .bind(fine_date)
        .bind(&data.librarian_notes)
        .fetch_one(&mut *conn)
        .await?;
        Ok(fine)
    }

    /// Record a payment computed against `previous_paid`; fails if the fine moved meanwhile
    pub async fn record_payment(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        previous_paid: Decimal,
        outcome: &PaymentOutcome,
        payment_method: &str,
        notes: Option<&str>,
    ) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>(
            r#"
            UPDATE fines
            SET paid_amount = $3, status = $4, payment_date = NOW(),
                payment_method = $5, librarian_notes = COALESCE($6, librarian_notes)
            WHERE id = $1 AND status = 'unpaid' AND paid_amount = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(previous_paid)
        .bind(outcome.paid_amount)
        .bind(outcome.status)
        .bind(payment_method)
        .bind(notes)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("Fine {} was changed by another request", id)))
    }

    /// unpaid -> waived
    pub async fn waive(&self, conn: &mut PgConnection, id: Uuid, reason: Option<&str>) -> AppResult<Fine> {
        sqlx::query_as::<_, Fine>(
            r#"
            UPDATE fines
            SET status = $2, librarian_notes = COALESCE($3, librarian_notes)
            WHERE id = $1 AND status = 'unpaid'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(FineStatus::Waived)
        .bind(reason)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("Fine {} was changed by another request", id)))
    }

    /// Counts and amounts by status. Partially paid means unpaid with something paid.
    pub async fn totals(&self) -> AppResult<FineTotals> {
        let totals = sqlx::query_as::<_, FineTotals>(
            r#"
            SELECT
                COUNT(*) AS total_count,
                COUNT(*) FILTER (WHERE status = 'unpaid') AS unpaid_count,
                COUNT(*) FILTER (WHERE status = 'paid') AS paid_count,
                COUNT(*) FILTER (WHERE status = 'unpaid' AND paid_amount > 0) AS partially_paid_count,
                COUNT(*) FILTER (WHERE status = 'waived') AS waived_count,
                COALESCE(SUM(fine_amount), 0) AS total_amount,
                COALESCE(SUM(paid_amount), 0) AS paid_amount,
                COALESCE(SUM(fine_amount - paid_amount) FILTER (WHERE status = 'unpaid'), 0) AS outstanding_amount,
                COALESCE(SUM(fine_amount - paid_amount) FILTER (WHERE status = 'waived'), 0) AS waived_amount
            FROM fines
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }
}
