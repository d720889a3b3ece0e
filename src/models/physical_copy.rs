//! Physical copy model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::enums::CopyStatus;

/// Physical copy from database (joined with its book title)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PhysicalCopy {
    pub id: Uuid,
    pub book_id: Uuid,
    pub barcode: String,
    pub status: CopyStatus,
    pub location: Option<String>,
    pub condition: Option<String>,
    pub notes: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(default)]
    #[serde(default)]
    pub book_title: Option<String>,
}

/// Short copy representation embedded in other responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CopyShort {
    pub id: Uuid,
    pub barcode: String,
    pub status: CopyStatus,
    pub book_id: Uuid,
    pub book_title: Option<String>,
}

impl From<&PhysicalCopy> for CopyShort {
    fn from(c: &PhysicalCopy) -> Self {
        Self {
            id: c.id,
            barcode: c.barcode.clone(),
            status: c.status,
            book_id: c.book_id,
            book_title: c.book_title.clone(),
        }
    }
}

/// Update copy status request
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCopyStatus {
    pub status: CopyStatus,
    pub notes: Option<String>,
}
