//! Borrow record model and related types

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::circulation;

use super::{
    enums::{BorrowStatus, CopyStatus},
    physical_copy::CopyShort,
    reader::ReaderShort,
};

/// Borrow record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BorrowRecord {
    pub id: Uuid,
    pub reader_id: Uuid,
    pub copy_id: Uuid,
    pub librarian_id: Option<Uuid>,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: BorrowStatus,
    pub renewal_count: i32,
    pub borrow_notes: Option<String>,
    pub return_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Borrow record with reader, copy and computed due-date flags
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowRecordDetails {
    #[serde(flatten)]
    pub record: BorrowRecord,
    pub reader: ReaderShort,
    pub physical_copy: CopyShort,
    pub is_overdue: bool,
    pub days_overdue: i64,
    pub days_until_due: i64,
    /// Due within the reminder threshold
    pub due_soon: bool,
}

/// Borrow record joined with its reader, copy and book, as read from the database
#[derive(Debug, Clone, FromRow)]
pub struct BorrowRecordRow {
    #[sqlx(flatten)]
    pub record: BorrowRecord,
    pub reader_full_name: String,
    pub reader_card_number: String,
    pub copy_barcode: String,
    pub copy_status: CopyStatus,
    pub book_id: Uuid,
    pub book_title: Option<String>,
}

impl BorrowRecordRow {
    pub fn reader(&self) -> ReaderShort {
        ReaderShort {
            id: self.record.reader_id,
            full_name: self.reader_full_name.clone(),
            card_number: self.reader_card_number.clone(),
        }
    }

    /// Attach the due-date flags as of `now`
    pub fn into_details(self, now: NaiveDateTime, due_soon_threshold_days: i64) -> BorrowRecordDetails {
        let today = now.date();
        let due = self.record.due_date;
        let status = self.record.status;
        let reader = self.reader();
        let physical_copy = CopyShort {
            id: self.record.copy_id,
            barcode: self.copy_barcode,
            status: self.copy_status,
            book_id: self.book_id,
            book_title: self.book_title,
        };
        let is_out = status.is_on_loan() || status == BorrowStatus::Overdue;

        BorrowRecordDetails {
            record: self.record,
            reader,
            physical_copy,
            is_overdue: status == BorrowStatus::Overdue || circulation::is_overdue(status, due, now),
            days_overdue: if is_out { circulation::days_overdue(due, today) } else { 0 },
            days_until_due: if is_out { circulation::days_until_due(due, today) } else { 0 },
            due_soon: status.is_on_loan() && circulation::is_due_within(due, today, due_soon_threshold_days),
        }
    }
}

/// Query parameters for listing borrow records
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct BorrowRecordQuery {
    /// Filter by status; "borrowed" also lists renewed records
    pub status: Option<BorrowStatus>,
    /// Search in reader name, card number, barcode or title
    pub q: Option<String>,
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page
    pub limit: Option<i64>,
}

/// Create borrow record request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBorrowRecord {
    pub reader_id: Uuid,
    pub copy_id: Uuid,
    /// Defaults to today
    pub borrow_date: Option<NaiveDate>,
    /// Defaults to borrow_date + reader type borrow duration
    pub due_date: Option<NaiveDate>,
    /// pending_approval (default) or borrowed
    pub status: Option<BorrowStatus>,
    #[validate(length(max = 1000, message = "Notes must be at most 1000 characters"))]
    pub borrow_notes: Option<String>,
}

/// Approve / reject / cancel request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BorrowActionRequest {
    pub notes: Option<String>,
}

/// Return request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReturnBorrowRecord {
    pub return_notes: Option<String>,
}

/// Renew request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RenewBorrowRecord {
    /// Defaults to current due date + the maximum extension
    pub new_due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Fine created from a borrow record, optionally closing the loan
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct FineAndSettle {
    /// Overrides the amount computed from days overdue and the daily rate
    pub amount: Option<Decimal>,
    /// Free-text reason; defaults to the reader identity template
    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,
    /// Copy status to record when the loan was already returned (damaged, lost...)
    pub copy_status: Option<CopyStatus>,
}

/// Reminder request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReminderRequest {
    pub custom_message: Option<String>,
}
