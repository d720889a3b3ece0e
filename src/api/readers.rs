//! Reader endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult, ErrorContext},
    models::reader::{CreateReader, Reader, ReaderType, ReaderWithType},
};

use super::{AuthenticatedUser, Librarian};

/// Get a reader with its reader type
#[utoipa::path(
    get,
    path = "/readers/{id}",
    tag = "readers",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Reader ID")),
    responses(
        (status = 200, description = "Reader", body = ReaderWithType),
        (status = 404, description = "Reader not found")
    )
)]
pub async fn get_reader(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReaderWithType>> {
    claims.require_librarian()?;
    Ok(Json(state.services.readers.get(id).await?))
}

/// Create a reader
#[utoipa::path(
    post,
    path = "/readers",
    tag = "readers",
    security(("bearer_auth" = [])),
    request_body = CreateReader,
    responses(
        (status = 201, description = "Reader created", body = Reader),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Card number already in use")
    )
)]
pub async fn create_reader(
    State(state): State<crate::AppState>,
    Librarian(_claims): Librarian,
    Json(request): Json<CreateReader>,
) -> AppResult<(StatusCode, Json<Reader>)> {
    request
        .validate()
        .map_err(|e| AppError::from(e).with_context(ErrorContext::Reader))?;
    let reader = state.services.readers.create(request).await?;
    Ok((StatusCode::CREATED, Json(reader)))
}

/// List reader types
#[utoipa::path(
    get,
    path = "/reader-types",
    tag = "readers",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Reader types", body = Vec<ReaderType>)
    )
)]
pub async fn list_reader_types(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<ReaderType>>> {
    claims.require_librarian()?;
    Ok(Json(state.services.readers.list_types().await?))
}
