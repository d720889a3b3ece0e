//! Reservation endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrow_record::BorrowRecord,
        reservation::{
            CreateReservation, ExpiringSoonQuery, FulfillReservation, Reservation,
            ReservationActionRequest, ReservationQuery,
        },
    },
};

use super::{AuthenticatedUser, Librarian, OptionalJson, PaginatedResponse};

/// Fulfilled reservation and the loan it created
#[derive(Serialize, ToSchema)]
pub struct FulfillResponse {
    pub reservation: Reservation,
    pub borrow_record: BorrowRecord,
    /// Whether the reader notification went out
    pub notified: bool,
}

/// Expired reservation
#[derive(Serialize, ToSchema)]
pub struct ExpireResponse {
    pub reservation: Reservation,
    pub notified: bool,
}

/// List reservations
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ReservationQuery),
    responses(
        (status = 200, description = "Reservations", body = PaginatedResponse<Reservation>)
    )
)]
pub async fn list_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ReservationQuery>,
) -> AppResult<Json<PaginatedResponse<Reservation>>> {
    claims.require_librarian()?;

    let (items, total) = state.services.reservations.list(&query).await?;
    Ok(Json(PaginatedResponse::new(items, total, query.page, query.limit)))
}

/// Pending reservations expiring within a number of days
#[utoipa::path(
    get,
    path = "/reservations/expiring-soon",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(ExpiringSoonQuery),
    responses(
        (status = 200, description = "Reservations expiring soon", body = Vec<Reservation>)
    )
)]
pub async fn expiring_soon(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<ExpiringSoonQuery>,
) -> AppResult<Json<Vec<Reservation>>> {
    claims.require_librarian()?;
    Ok(Json(state.services.reservations.expiring_soon(query.days).await?))
}

/// Reservations placed on a book
#[utoipa::path(
    get,
    path = "/books/{id}/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Reservations for the book", body = Vec<Reservation>),
        (status = 404, description = "Book not found")
    )
)]
pub async fn list_book_reservations(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<Vec<Reservation>>> {
    claims.require_librarian()?;
    Ok(Json(state.services.reservations.list_by_book(book_id).await?))
}

/// Get a reservation
#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = Reservation),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Reservation>> {
    claims.require_librarian()?;
    Ok(Json(state.services.reservations.get(id).await?))
}

/// Create a reservation
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    security(("bearer_auth" = [])),
    request_body = CreateReservation,
    responses(
        (status = 201, description = "Reservation created", body = Reservation),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Reader, book or copy not found"),
        (status = 422, description = "Reader holds an expired reservation")
    )
)]
pub async fn create_reservation(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Json(request): Json<CreateReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    request.validate()?;
    let reservation = state.services.reservations.create(request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Fulfill a reservation: lend the copy to the reader
#[utoipa::path(
    post,
    path = "/reservations/{id}/fulfill",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body(content = FulfillReservation, description = "Copy to lend when none was reserved"),
    responses(
        (status = 200, description = "Reservation fulfilled", body = FulfillResponse),
        (status = 422, description = "Reader has no reader type or copy unavailable")
    )
)]
pub async fn fulfill_reservation(
    State(state): State<crate::AppState>,
    Librarian(claims): Librarian,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<FulfillReservation>,
) -> AppResult<Json<FulfillResponse>> {
    let result = state.services.reservations.fulfill(id, request, claims.sub).await?;
    Ok(Json(FulfillResponse {
        reservation: result.reservation,
        borrow_record: result.borrow_record,
        notified: result.notified,
    }))
}

/// Cancel a reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body(content = ReservationActionRequest, description = "Optional reason"),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 422, description = "Not pending")
    )
)]
pub async fn cancel_reservation(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<ReservationActionRequest>,
) -> AppResult<Json<Reservation>> {
    Ok(Json(state.services.reservations.cancel(id, request.reason).await?))
}

/// Expire a reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/expire",
    tag = "reservations",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body(content = ReservationActionRequest, description = "Optional reason"),
    responses(
        (status = 200, description = "Reservation expired", body = ExpireResponse),
        (status = 422, description = "Not pending")
    )
)]
pub async fn expire_reservation(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<ReservationActionRequest>,
) -> AppResult<Json<ExpireResponse>> {
    let (reservation, notified) = state.services.reservations.expire(id, request.reason).await?;
    Ok(Json(ExpireResponse { reservation, notified }))
}
