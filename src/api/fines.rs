//! Fine endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::fine::{CreateFine, Fine, FineQuery, PayFine, WaiveFine},
};

use super::{AuthenticatedUser, Librarian, OptionalJson, PaginatedResponse};

/// List fines
#[utoipa::path(
    get,
    path = "/fines",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(FineQuery),
    responses(
        (status = 200, description = "Fines", body = PaginatedResponse<Fine>)
    )
)]
pub async fn list_fines(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<FineQuery>,
) -> AppResult<Json<PaginatedResponse<Fine>>> {
    claims.require_librarian()?;

    let (items, total) = state.services.fines.list(&query).await?;
    Ok(Json(PaginatedResponse::new(items, total, query.page, query.limit)))
}

/// Get a fine
#[utoipa::path(
    get,
    path = "/fines/{id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Fine ID")),
    responses(
        (status = 200, description = "Fine", body = Fine),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn get_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Fine>> {
    claims.require_librarian()?;
    Ok(Json(state.services.fines.get(id).await?))
}

/// Create a fine manually
#[utoipa::path(
    post,
    path = "/fines",
    tag = "fines",
    security(("bearer_auth" = [])),
    request_body = CreateFine,
    responses(
        (status = 201, description = "Fine created", body = Fine),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Borrow record not found")
    )
)]
pub async fn create_fine(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Json(request): Json<CreateFine>,
) -> AppResult<(StatusCode, Json<Fine>)> {
    request.validate()?;
    let fine = state.services.fines.create(request).await?;
    Ok((StatusCode::CREATED, Json(fine)))
}

/// Record a payment
#[utoipa::path(
    post,
    path = "/fines/{id}/pay",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Fine ID")),
    request_body = PayFine,
    responses(
        (status = 200, description = "Payment recorded", body = Fine),
        (status = 400, description = "Amount not positive or above outstanding"),
        (status = 422, description = "Fine is not unpaid")
    )
)]
pub async fn pay_fine(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
    Json(request): Json<PayFine>,
) -> AppResult<Json<Fine>> {
    request.validate()?;
    Ok(Json(state.services.fines.pay(id, request).await?))
}

/// Waive a fine
#[utoipa::path(
    post,
    path = "/fines/{id}/waive",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Fine ID")),
    request_body(content = WaiveFine, description = "Optional reason"),
    responses(
        (status = 200, description = "Fine waived", body = Fine),
        (status = 422, description = "Fine is not unpaid")
    )
)]
pub async fn waive_fine(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
    OptionalJson(request): OptionalJson<WaiveFine>,
) -> AppResult<Json<Fine>> {
    Ok(Json(state.services.fines.waive(id, request.reason).await?))
}
