//! Statistics endpoints

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;

use super::AuthenticatedUser;

#[derive(Serialize, ToSchema)]
pub struct StatEntry {
    /// Entry label (status, bucket...)
    pub label: String,
    /// Count
    pub value: i64,
}

#[derive(Serialize, ToSchema)]
pub struct BorrowStats {
    /// All borrow records
    pub total: i64,
    /// Records still holding a copy (pending, borrowed, renewed, overdue)
    pub active: i64,
    /// Borrowed or renewed
    pub on_loan: i64,
    /// Marked overdue
    pub overdue: i64,
    pub pending_approval: i64,
    pub by_status: Vec<StatEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct OverdueStats {
    /// Records marked overdue
    pub total: i64,
    pub max_days_overdue: i64,
    /// Counts per days-overdue bucket
    pub by_days: Vec<StatEntry>,
}

#[derive(Serialize, ToSchema)]
pub struct FineStats {
    pub total: i64,
    pub unpaid: i64,
    pub paid: i64,
    /// Unpaid with a partial payment recorded
    pub partially_paid: i64,
    pub waived: i64,
    pub total_amount: Decimal,
    pub paid_amount: Decimal,
    pub outstanding_amount: Decimal,
    pub waived_amount: Decimal,
}

#[derive(Serialize, ToSchema)]
pub struct ReservationStats {
    pub total: i64,
    /// Pending reservations ending within the reminder threshold
    pub expiring_soon: i64,
    pub by_status: Vec<StatEntry>,
}

/// Borrow record statistics
#[utoipa::path(
    get,
    path = "/stats/borrow-records",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Borrow statistics", body = BorrowStats)
    )
)]
pub async fn get_borrow_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<BorrowStats>> {
    claims.require_librarian()?;
    Ok(Json(state.services.stats.borrow_stats().await?))
}

/// Overdue loans grouped by days overdue
#[utoipa::path(
    get,
    path = "/stats/overdue",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overdue statistics", body = OverdueStats)
    )
)]
pub async fn get_overdue_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<OverdueStats>> {
    claims.require_librarian()?;
    Ok(Json(state.services.stats.overdue_stats().await?))
}

/// Fine statistics
#[utoipa::path(
    get,
    path = "/stats/fines",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Fine statistics", body = FineStats)
    )
)]
pub async fn get_fine_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<FineStats>> {
    claims.require_librarian()?;
    Ok(Json(state.services.stats.fine_stats().await?))
}

/// Reservation statistics
#[utoipa::path(
    get,
    path = "/stats/reservations",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reservation statistics", body = ReservationStats)
    )
)]
pub async fn get_reservation_stats(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<ReservationStats>> {
    claims.require_librarian()?;
    Ok(Json(state.services.stats.reservation_stats().await?))
}
