//! Reader (patron) and reader type models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::enums::ReaderCategory;

/// Borrowing policy attached to a category of readers
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ReaderType {
    pub id: Uuid,
    pub name: String,
    pub category: ReaderCategory,
    /// Maximum number of simultaneously active borrow records
    pub max_borrow_limit: i32,
    /// Loan length in calendar days
    pub borrow_duration_days: i32,
    pub description: Option<String>,
}

/// Reader record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reader {
    pub id: Uuid,
    pub full_name: String,
    pub card_number: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub reader_type_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Reader joined with its policy
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReaderWithType {
    #[serde(flatten)]
    pub reader: Reader,
    pub reader_type: Option<ReaderType>,
}

/// Short reader representation embedded in other responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReaderShort {
    pub id: Uuid,
    pub full_name: String,
    pub card_number: String,
}

impl From<&Reader> for ReaderShort {
    fn from(r: &Reader) -> Self {
        Self {
            id: r.id,
            full_name: r.full_name.clone(),
            card_number: r.card_number.clone(),
        }
    }
}

/// Create reader request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateReader {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, max = 32, message = "Card number must be 1-32 characters"))]
    pub card_number: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub reader_type_id: Option<Uuid>,
}
