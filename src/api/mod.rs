//! API handlers for the circulation REST endpoints

pub mod borrow_records;
pub mod fines;
pub mod health;
pub mod openapi;
pub mod physical_copies;
pub mod readers;
pub mod reservations;
pub mod stats;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::{de::DeserializeOwned, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::user::UserClaims,
    services::redis::idempotency_key,
    AppState,
};

pub const IDEMPOTENCY_HEADER: &str = "idempotency-key";

/// Verify the bearer token in `headers`
fn bearer_claims(headers: &HeaderMap, secret: &str) -> AppResult<UserClaims> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

    UserClaims::from_token(token, secret).map_err(|e| AppError::Authentication(e.to_string()))
}

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(&parts.headers, &state.config.auth.jwt_secret)?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Librarian (or admin) making a circulation change
pub struct Librarian(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for Librarian {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        claims.require_librarian()?;
        Ok(Librarian(claims))
    }
}

/// JSON body that may be omitted. An empty body yields `T::default()`;
/// a body that does not parse is a 400.
pub struct OptionalJson<T>(pub T);

/// Parse an optional JSON body
pub fn parse_optional_json<T>(bytes: &[u8]) -> AppResult<T>
where
    T: DeserializeOwned + Default,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(bytes).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))
}

#[async_trait]
impl<S, T> FromRequest<S> for OptionalJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(OptionalJson(parse_optional_json(&bytes)?))
    }
}

/// A claimed key is given back when the request failed, so a retry can run
pub fn releases_idempotency_key(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

/// Claims the optional `Idempotency-Key` of a mutating request in Redis.
/// A key already claimed is rejected with 409; a failed request releases it.
pub async fn idempotency_guard(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if matches!(*request.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
        return Ok(next.run(request).await);
    }

    let key = request
        .headers()
        .get(IDEMPOTENCY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|k| !k.is_empty());
    let Some(key) = key else {
        return Ok(next.run(request).await);
    };
    // unauthenticated requests are rejected by the handler's extractor
    let Ok(claims) = bearer_claims(request.headers(), &state.config.auth.jwt_secret) else {
        return Ok(next.run(request).await);
    };

    let redis_key = idempotency_key(&claims.sub, request.method().as_str(), request.uri().path(), key);
    let redis = &state.services.redis;
    if !redis
        .claim(&redis_key, state.config.circulation.idempotency_ttl_secs)
        .await?
    {
        return Err(AppError::Conflict(
            "A request with this Idempotency-Key was already processed".to_string(),
        ));
    }

    let response = next.run(request).await;

    if releases_idempotency_key(response.status()) {
        if let Err(e) = redis.release(&redis_key).await {
            tracing::warn!("Failed to release idempotency key {}: {}", redis_key, e);
        }
    }

    Ok(response)
}

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Page content
    pub items: Vec<T>,
    /// Total number of matching rows
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Items per page
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            items,
            total,
            page: page.unwrap_or(1).max(1),
            per_page: limit.unwrap_or(20).clamp(1, 200),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::borrow_record::{FineAndSettle, RenewBorrowRecord};
    use crate::models::enums::CopyStatus;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn test_empty_body_uses_defaults() {
        let renew: RenewBorrowRecord = parse_optional_json(b"").unwrap();
        assert!(renew.new_due_date.is_none());
        let renew: RenewBorrowRecord = parse_optional_json(b" \n").unwrap();
        assert!(renew.new_due_date.is_none());
        let renew: RenewBorrowRecord = parse_optional_json(b"{}").unwrap();
        assert!(renew.new_due_date.is_none());
    }

    #[test]
    fn test_body_fields_are_kept() {
        let renew: RenewBorrowRecord = parse_optional_json(br#"{"new_due_date":"2024-01-20"}"#).unwrap();
        assert_eq!(renew.new_due_date, NaiveDate::from_ymd_opt(2024, 1, 20));

        let settle: FineAndSettle =
            parse_optional_json(br#"{"amount":"20000","copy_status":"lost"}"#).unwrap();
        assert_eq!(settle.amount, Some(Decimal::from(20_000)));
        assert_eq!(settle.copy_status, Some(CopyStatus::Lost));
    }

    #[test]
    fn test_malformed_body_is_rejected() {
        let bad_date = parse_optional_json::<RenewBorrowRecord>(br#"{"new_due_date":"20-01-2024"}"#);
        assert!(matches!(bad_date, Err(AppError::BadRequest(_))));

        let bad_json = parse_optional_json::<RenewBorrowRecord>(b"{new_due_date");
        assert!(matches!(bad_json, Err(AppError::BadRequest(_))));

        let bad_status = parse_optional_json::<FineAndSettle>(br#"{"copy_status":"missing"}"#);
        assert!(matches!(bad_status, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_failed_requests_release_the_key() {
        assert!(!releases_idempotency_key(StatusCode::OK));
        assert!(!releases_idempotency_key(StatusCode::CREATED));
        assert!(!releases_idempotency_key(StatusCode::NO_CONTENT));
        assert!(releases_idempotency_key(StatusCode::BAD_REQUEST));
        assert!(releases_idempotency_key(StatusCode::UNPROCESSABLE_ENTITY));
        assert!(releases_idempotency_key(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(releases_idempotency_key(StatusCode::BAD_GATEWAY));
    }
}
