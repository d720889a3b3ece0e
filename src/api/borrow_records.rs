//! Borrow record endpoints

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
        borrow_record::{
            BorrowActionRequest, BorrowRecordDetails, BorrowRecordQuery, CreateBorrowRecord,
            FineAndSettle, ReminderRequest, RenewBorrowRecord, ReturnBorrowRecord,
        },
        fine::Fine,
    },
};

use super::{AuthenticatedUser, Librarian, OptionalJson, PaginatedResponse};

/// Fine created from a borrow record, with the record after settlement
#[derive(Serialize, ToSchema)]
pub struct FineSettlementResponse {
    pub fine: Fine,
    pub borrow_record: BorrowRecordDetails,
}

/// Reminder outcome
#[derive(Serialize, ToSchema)]
pub struct ReminderResponse {
    pub sent: bool,
    pub borrow_record: BorrowRecordDetails,
}

/// List borrow records
#[utoipa::path(
    get,
    path = "/borrow-records",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(BorrowRecordQuery),
    responses(
        (status = 200, description = "Borrow records", body = PaginatedResponse<BorrowRecordDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_borrow_records(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowRecordQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowRecordDetails>>> {
    claims.require_librarian()?;

    let (items, total) = state.services.borrows.list(&query).await?;
    Ok(Json(PaginatedResponse::new(items, total, query.page, query.limit)))
}

/// Get a borrow record with its due-date flags
#[utoipa::path(
    get,
    path = "/borrow-records/{id}",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrow record ID")),
    responses(
        (status = 200, description = "Borrow record", body = BorrowRecordDetails),
        (status = 404, description = "Borrow record not found")
    )
)]
pub async fn get_borrow_record(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BorrowRecordDetails>> {
    claims.require_librarian()?;
    Ok(Json(state.services.borrows.get(id).await?))
}

/// Create a borrow record
#[utoipa::path(
    post,
    path = "/borrow-records",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRecord,
    responses(
        (status = 201, description = "Borrow record created", body = BorrowRecordDetails),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Reader or copy not found"),
        (status = 409, description = "Copy already held or request replayed"),
        (status = 422, description = "Reader inactive, limit reached or copy unavailable")
    )
)]
pub async fn create_borrow_record(
    State(state): State<crate::AppState>,
    Librarian(claims): Librarian,
    Json(request): Json<CreateBorrowRecord>,
) -> AppResult<(StatusCode, Json<BorrowRecordDetails>)> {
    request.validate()?;

    let record = state.services.borrows.create(request, claims.sub).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Approve a pending borrow record
#[utoipa::path(
    post,
    path = "/borrow-records/{id}/approve",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrow record ID")),
    request_body(content = BorrowActionRequest, description = "Optional notes"),
    responses(
        (status = 200, description = "Borrow record approved", body = BorrowRecordDetails),
        (status = 409, description = "Changed concurrently"),
        (status = 422, description = "Not pending approval")
    )
)]
pub async fn approve_borrow_record(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<BorrowActionRequest>,
) -> AppResult<Json<BorrowRecordDetails>> {
    Ok(Json(state.services.borrows.approve(id, request.notes).await?))
}

/// Reject a pending borrow record
#[utoipa::path(
    post,
    path = "/borrow-records/{id}/reject",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrow record ID")),
    request_body(content = BorrowActionRequest, description = "Optional notes"),
    responses(
        (status = 200, description = "Borrow record rejected", body = BorrowRecordDetails),
        (status = 422, description = "Not pending approval")
    )
)]
pub async fn reject_borrow_record(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<BorrowActionRequest>,
) -> AppResult<Json<BorrowRecordDetails>> {
    Ok(Json(state.services.borrows.reject(id, request.notes).await?))
}

/// Return a borrowed copy
#[utoipa::path(
    post,
    path = "/borrow-records/{id}/return",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrow record ID")),
    request_body(content = ReturnBorrowRecord, description = "Optional return notes"),
    responses(
        (status = 200, description = "Copy returned", body = BorrowRecordDetails),
        (status = 422, description = "Not on loan")
    )
)]
pub async fn return_borrow_record(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<ReturnBorrowRecord>,
) -> AppResult<Json<BorrowRecordDetails>> {
    Ok(Json(state.services.borrows.return_record(id, request.return_notes).await?))
}

/// Renew a loan
#[utoipa::path(
    post,
    path = "/borrow-records/{id}/renew",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrow record ID")),
    request_body(content = RenewBorrowRecord, description = "New due date, defaults to due date + 14 days"),
    responses(
        (status = 200, description = "Loan renewed", body = BorrowRecordDetails),
        (status = 400, description = "New due date outside the renewal window"),
        (status = 422, description = "Not renewable")
    )
)]
pub async fn renew_borrow_record(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<RenewBorrowRecord>,
) -> AppResult<Json<BorrowRecordDetails>> {
    Ok(Json(state.services.borrows.renew(id, request).await?))
}

/// Mark a loan overdue
#[utoipa::path(
    post,
    path = "/borrow-records/{id}/mark-overdue",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrow record ID")),
    responses(
        (status = 200, description = "Marked overdue", body = BorrowRecordDetails),
        (status = 422, description = "Not on loan")
    )
)]
pub async fn mark_overdue(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BorrowRecordDetails>> {
    state.services.borrows.mark_overdue(id).await?;
    Ok(Json(state.services.borrows.get(id).await?))
}

/// Cancel a borrow record
#[utoipa::path(
    post,
    path = "/borrow-records/{id}/cancel",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrow record ID")),
    request_body(content = BorrowActionRequest, description = "Optional notes"),
    responses(
        (status = 200, description = "Borrow record cancelled", body = BorrowRecordDetails),
        (status = 422, description = "Already finished")
    )
)]
pub async fn cancel_borrow_record(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<BorrowActionRequest>,
) -> AppResult<Json<BorrowRecordDetails>> {
    Ok(Json(state.services.borrows.cancel(id, request.notes).await?))
}

/// Delete a finished borrow record
#[utoipa::path(
    delete,
    path = "/borrow-records/{id}",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrow record ID")),
    responses(
        (status = 204, description = "Borrow record deleted"),
        (status = 404, description = "Borrow record not found"),
        (status = 422, description = "Record is still active")
    )
)]
pub async fn delete_borrow_record(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.borrows.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create an overdue fine and settle the loan
#[utoipa::path(
    post,
    path = "/borrow-records/{id}/fine",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrow record ID")),
    request_body(content = FineAndSettle, description = "Optional amount override, reason and copy status"),
    responses(
        (status = 201, description = "Fine created", body = FineSettlementResponse),
        (status = 400, description = "Invalid amount"),
        (status = 422, description = "Record cannot be fined")
    )
)]
pub async fn fine_borrow_record(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<FineAndSettle>,
) -> AppResult<(StatusCode, Json<FineSettlementResponse>)> {
    request.validate()?;

    let (fine, borrow_record) = state.services.borrows.fine_and_settle(id, request).await?;
    Ok((StatusCode::CREATED, Json(FineSettlementResponse { fine, borrow_record })))
}

/// Send a due-date reminder to the reader
#[utoipa::path(
    post,
    path = "/borrow-records/{id}/remind",
    tag = "borrow-records",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrow record ID")),
    request_body(content = ReminderRequest, description = "Optional extra message"),
    responses(
        (status = 200, description = "Reminder sent", body = ReminderResponse),
        (status = 422, description = "Record is not on loan"),
        (status = 502, description = "Notification could not be delivered")
    )
)]
pub async fn remind_borrow_record(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<ReminderRequest>,
) -> AppResult<Json<ReminderResponse>> {
    let borrow_record = state.services.borrows.remind(id, request.custom_message).await?;
    Ok(Json(ReminderResponse {
        sent: true,
        borrow_record,
    }))
}
