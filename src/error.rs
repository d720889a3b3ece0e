//! Error types for the circulation server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthenticated = 2,
    Forbidden = 3,
    DbFailure = 4,
    NotFound = 5,
    BadValue = 6,
    Duplicate = 7,
    ConcurrentUpdate = 8,
    BusinessRule = 9,
    NotificationFailure = 10,
}

/// Flow in which an error surfaced; prefixes the librarian-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorContext {
    User,
    Reader,
    General,
}

impl ErrorContext {
    fn prefix(&self) -> Option<&'static str> {
        match self {
            ErrorContext::User => Some("Tạo user thất bại:"),
            ErrorContext::Reader => Some("Tạo reader thất bại:"),
            ErrorContext::General => None,
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("{1}")]
    WithContext(ErrorContext, Box<AppError>),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl AppError {
    /// Attach a flow context to this error
    pub fn with_context(self, context: ErrorContext) -> Self {
        match self {
            AppError::WithContext(_, inner) => AppError::WithContext(context, inner),
            other => AppError::WithContext(context, Box::new(other)),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Database(e) if is_unique_violation(e) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Notification(_) => StatusCode::BAD_GATEWAY,
            AppError::BusinessRule(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::WithContext(_, inner) => inner.status_code(),
        }
    }

    fn code(&self) -> ErrorCode {
        match self {
            AppError::Authentication(_) => ErrorCode::NotAuthenticated,
            AppError::Authorization(_) => ErrorCode::Forbidden,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorCode::BadValue,
            AppError::Database(e) if is_unique_violation(e) => ErrorCode::Duplicate,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Conflict(_) => ErrorCode::ConcurrentUpdate,
            AppError::Internal(_) => ErrorCode::Failure,
            AppError::Notification(_) => ErrorCode::NotificationFailure,
            AppError::BusinessRule(_) => ErrorCode::BusinessRule,
            AppError::WithContext(_, inner) => inner.code(),
        }
    }

    /// Message safe to return to the client (database and internal details stay in the logs)
    fn public_message(&self) -> String {
        match self {
            AppError::Database(e) => match unique_violation_constraint(e) {
                Some(constraint) => format!("Duplicate value violates {}", constraint),
                None => "Database error".to_string(),
            },
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::Authentication(m)
            | AppError::Authorization(m)
            | AppError::NotFound(m)
            | AppError::Validation(m)
            | AppError::Conflict(m)
            | AppError::BadRequest(m)
            | AppError::Notification(m)
            | AppError::BusinessRule(m) => m.clone(),
            AppError::WithContext(_, inner) => inner.public_message(),
        }
    }

    /// Librarian-facing message, with the context prefix when one is attached
    pub fn user_message(&self) -> String {
        match self {
            AppError::WithContext(context, inner) => {
                let base = user_message(inner.status_code(), &inner.public_message());
                match context.prefix() {
                    Some(prefix) => format!("{} {}", prefix, base),
                    None => base,
                }
            }
            _ => user_message(self.status_code(), &self.public_message()),
        }
    }
}

fn unique_violation_constraint(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            Some(db.constraint().unwrap_or("unique constraint").to_string())
        }
        _ => None,
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    unique_violation_constraint(e).is_some()
}

/// Map an HTTP status and raw message to the Vietnamese message shown to librarians
pub fn user_message(status: StatusCode, message: &str) -> String {
    match status.as_u16() {
        409 => {
            if message.contains("email") {
                "Email này đã được sử dụng. Vui lòng chọn email khác.".to_string()
            } else if message.contains("username") {
                "Tên đăng nhập này đã được sử dụng. Vui lòng chọn tên đăng nhập khác.".to_string()
            } else if message.contains("userCode") || message.contains("user_code") {
                "Mã người dùng này đã được sử dụng. Vui lòng chọn mã khác.".to_string()
            } else if message.contains("cardNumber") || message.contains("card_number") {
                "Số thẻ này đã được sử dụng. Vui lòng chọn số thẻ khác.".to_string()
            } else {
                "Thông tin này đã tồn tại trong hệ thống. Vui lòng kiểm tra lại.".to_string()
            }
        }
        400 => format!("Dữ liệu không hợp lệ: {}", message),
        401 => "Bạn không có quyền thực hiện hành động này.".to_string(),
        403 => "Bạn không có quyền truy cập tài nguyên này.".to_string(),
        404 => "Không tìm thấy tài nguyên được yêu cầu.".to_string(),
        500 => "Lỗi hệ thống. Vui lòng thử lại sau.".to_string(),
        _ if !message.is_empty() => message.to_string(),
        _ => "Đã xảy ra lỗi không xác định.".to_string(),
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    pub user_message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(e) if !is_unique_violation(e) => {
                tracing::error!("Database error: {:?}", e);
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
            }
            other => {
                tracing::debug!("Request failed: {}", other);
            }
        }

        let status = self.status_code();
        let code = self.code();
        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message: self.public_message(),
            user_message: self.user_message(),
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_messages_by_field() {
        assert_eq!(
            user_message(StatusCode::CONFLICT, "email already exists"),
            "Email này đã được sử dụng. Vui lòng chọn email khác."
        );
        assert_eq!(
            user_message(StatusCode::CONFLICT, "username taken"),
            "Tên đăng nhập này đã được sử dụng. Vui lòng chọn tên đăng nhập khác."
        );
        assert_eq!(
            user_message(StatusCode::CONFLICT, "userCode exists"),
            "Mã người dùng này đã được sử dụng. Vui lòng chọn mã khác."
        );
        assert_eq!(
            user_message(StatusCode::CONFLICT, "Duplicate value violates readers_card_number_key"),
            "Số thẻ này đã được sử dụng. Vui lòng chọn số thẻ khác."
        );
        assert_eq!(
            user_message(StatusCode::CONFLICT, "something else"),
            "Thông tin này đã tồn tại trong hệ thống. Vui lòng kiểm tra lại."
        );
    }

    #[test]
    fn test_status_messages() {
        assert_eq!(
            user_message(StatusCode::BAD_REQUEST, "due_date missing"),
            "Dữ liệu không hợp lệ: due_date missing"
        );
        assert_eq!(
            user_message(StatusCode::UNAUTHORIZED, ""),
            "Bạn không có quyền thực hiện hành động này."
        );
        assert_eq!(
            user_message(StatusCode::FORBIDDEN, ""),
            "Bạn không có quyền truy cập tài nguyên này."
        );
        assert_eq!(
            user_message(StatusCode::NOT_FOUND, ""),
            "Không tìm thấy tài nguyên được yêu cầu."
        );
        assert_eq!(
            user_message(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            "Lỗi hệ thống. Vui lòng thử lại sau."
        );
        assert_eq!(user_message(StatusCode::BAD_GATEWAY, "smtp down"), "smtp down");
        assert_eq!(
            user_message(StatusCode::BAD_GATEWAY, ""),
            "Đã xảy ra lỗi không xác định."
        );
    }

    #[test]
    fn test_context_prefix() {
        let err = AppError::Conflict("cardNumber already used".to_string())
            .with_context(ErrorContext::Reader);
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            err.user_message(),
            "Tạo reader thất bại: Số thẻ này đã được sử dụng. Vui lòng chọn số thẻ khác."
        );

        let err = AppError::NotFound("x".to_string()).with_context(ErrorContext::User);
        assert_eq!(
            err.user_message(),
            "Tạo user thất bại: Không tìm thấy tài nguyên được yêu cầu."
        );

        let err = AppError::NotFound("x".to_string()).with_context(ErrorContext::General);
        assert_eq!(err.user_message(), "Không tìm thấy tài nguyên được yêu cầu.");
    }

    #[test]
    fn test_business_rule_keeps_message() {
        let err = AppError::BusinessRule("Copy is not available".to_string());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.user_message(), "Copy is not available");
    }
}
