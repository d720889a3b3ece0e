//! Fine model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::{FineReason, FineStatus};

/// Fine from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fine {
    pub id: Uuid,
    pub borrow_id: Uuid,
    pub fine_amount: Decimal,
    pub paid_amount: Decimal,
    pub status: FineStatus,
    pub reason: FineReason,
    pub description: Option<String>,
    pub overdue_days: Option<i32>,
    pub daily_rate: Option<Decimal>,
    pub fine_date: DateTime<Utc>,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub librarian_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Fine {
    pub fn outstanding(&self) -> Decimal {
        self.fine_amount - self.paid_amount
    }
}

/// Fine creation payload
#[derive(Debug, Clone, PartialEq, Deserialize, Validate, ToSchema)]
pub struct CreateFine {
    pub borrow_id: Uuid,
    pub fine_amount: Decimal,
    /// Defaults to now
    pub fine_date: Option<DateTime<Utc>>,
    pub reason: FineReason,
    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
    pub overdue_days: Option<i32>,
    pub daily_rate: Option<Decimal>,
    pub librarian_notes: Option<String>,
}

/// Query parameters for listing fines
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct FineQuery {
    pub status: Option<FineStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Payment request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PayFine {
    pub amount: Decimal,
    /// cash, transfer...
    #[validate(length(min = 1, max = 32, message = "Payment method must be 1-32 characters"))]
    pub payment_method: String,
    pub librarian_notes: Option<String>,
}

/// Waiver request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct WaiveFine {
    pub reason: Option<String>,
}
