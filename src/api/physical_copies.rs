//! Physical copy endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::physical_copy::{PhysicalCopy, UpdateCopyStatus},
};

use super::{AuthenticatedUser, Librarian};

/// Get a physical copy
#[utoipa::path(
    get,
    path = "/physical-copies/{id}",
    tag = "physical-copies",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    responses(
        (status = 200, description = "Physical copy", body = PhysicalCopy),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn get_copy(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PhysicalCopy>> {
    claims.require_librarian()?;
    Ok(Json(state.services.copies.get(id).await?))
}

/// Update the status of a copy (damaged, lost, maintenance...)
#[utoipa::path(
    patch,
    path = "/physical-copies/{id}/status",
    tag = "physical-copies",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Copy ID")),
    request_body = UpdateCopyStatus,
    responses(
        (status = 200, description = "Status updated", body = PhysicalCopy),
        (status = 400, description = "Status cannot be set manually"),
        (status = 404, description = "Copy not found")
    )
)]
pub async fn update_copy_status(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateCopyStatus>,
) -> AppResult<Json<PhysicalCopy>> {
    Ok(Json(state.services.copies.update_status(id, request).await?))
}
