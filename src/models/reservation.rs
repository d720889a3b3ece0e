//! Reservation (hold) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::ReservationStatus;

/// Reservation from database (joined with book title and reader name)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: Uuid,
    pub reader_id: Uuid,
    pub book_id: Uuid,
    pub physical_copy_id: Option<Uuid>,
    pub reservation_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub fulfilled_date: Option<DateTime<Utc>>,
    pub fulfilled_by: Option<Uuid>,
    pub cancelled_date: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(default)]
    #[serde(default)]
    pub book_title: Option<String>,
    #[sqlx(default)]
    #[serde(default)]
    pub reader_name: Option<String>,
}

/// Query parameters for listing reservations
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ReservationQuery {
    pub status: Option<ReservationStatus>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Query parameters for the expiring-soon list
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ExpiringSoonQuery {
    /// Threshold in days (defaults to the configured reminder threshold)
    pub days: Option<i64>,
}

/// Create reservation request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReservation {
    pub reader_id: Uuid,
    pub book_id: Uuid,
    pub physical_copy_id: Option<Uuid>,
    /// Defaults to today
    pub reservation_date: Option<NaiveDate>,
    /// Defaults to reservation_date + configured hold days
    pub expiry_date: Option<NaiveDate>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub notes: Option<String>,
}

/// Fulfill reservation request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct FulfillReservation {
    /// Copy to lend when the reservation was placed on the title only
    pub copy_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Cancel / expire reservation request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReservationActionRequest {
    pub reason: Option<String>,
}
