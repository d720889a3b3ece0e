//! Status and category enums shared by the circulation models
//!
//! All of them are stored as snake_case TEXT columns.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Implements `Display`, `FromStr` and the sqlx TEXT mapping for an enum
/// that already provides `as_str()` and `ALL`.
macro_rules! text_enum {
    ($name:ident) => {
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == wanted)
                    .ok_or_else(|| format!("Invalid {}: {}", stringify!($name), s))
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s: &str = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// BorrowStatus
// ---------------------------------------------------------------------------

/// Status of a borrow record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BorrowStatus {
    PendingApproval,
    Borrowed,
    Returned,
    Overdue,
    Renewed,
    Cancelled,
    Rejected,
}

impl BorrowStatus {
    pub const ALL: [BorrowStatus; 7] = [
        BorrowStatus::PendingApproval,
        BorrowStatus::Borrowed,
        BorrowStatus::Returned,
        BorrowStatus::Overdue,
        BorrowStatus::Renewed,
        BorrowStatus::Cancelled,
        BorrowStatus::Rejected,
    ];

    /// Statuses that still hold the physical copy (or a claim on it)
    pub const ACTIVE: [BorrowStatus; 4] = [
        BorrowStatus::PendingApproval,
        BorrowStatus::Borrowed,
        BorrowStatus::Renewed,
        BorrowStatus::Overdue,
    ];

    /// Statuses of a loan that is out and can still become overdue
    pub const ON_LOAN: [BorrowStatus; 2] = [BorrowStatus::Borrowed, BorrowStatus::Renewed];

    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::PendingApproval => "pending_approval",
            BorrowStatus::Borrowed => "borrowed",
            BorrowStatus::Returned => "returned",
            BorrowStatus::Overdue => "overdue",
            BorrowStatus::Renewed => "renewed",
            BorrowStatus::Cancelled => "cancelled",
            BorrowStatus::Rejected => "rejected",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_on_loan(&self) -> bool {
        Self::ON_LOAN.contains(self)
    }
}

text_enum!(BorrowStatus);

// ---------------------------------------------------------------------------
// CopyStatus
// ---------------------------------------------------------------------------

/// Status of a physical copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CopyStatus {
    Available,
    Borrowed,
    Reserved,
    Damaged,
    Lost,
    Maintenance,
}

impl CopyStatus {
    pub const ALL: [CopyStatus; 6] = [
        CopyStatus::Available,
        CopyStatus::Borrowed,
        CopyStatus::Reserved,
        CopyStatus::Damaged,
        CopyStatus::Lost,
        CopyStatus::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CopyStatus::Available => "available",
            CopyStatus::Borrowed => "borrowed",
            CopyStatus::Reserved => "reserved",
            CopyStatus::Damaged => "damaged",
            CopyStatus::Lost => "lost",
            CopyStatus::Maintenance => "maintenance",
        }
    }
}

text_enum!(CopyStatus);

// ---------------------------------------------------------------------------
// ReservationStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Fulfilled,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 4] = [
        ReservationStatus::Pending,
        ReservationStatus::Fulfilled,
        ReservationStatus::Cancelled,
        ReservationStatus::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Fulfilled => "fulfilled",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Expired => "expired",
        }
    }
}

text_enum!(ReservationStatus);

// ---------------------------------------------------------------------------
// Fines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FineStatus {
    Unpaid,
    Paid,
    Waived,
}

impl FineStatus {
    pub const ALL: [FineStatus; 3] = [FineStatus::Unpaid, FineStatus::Paid, FineStatus::Waived];

    pub fn as_str(&self) -> &'static str {
        match self {
            FineStatus::Unpaid => "unpaid",
            FineStatus::Paid => "paid",
            FineStatus::Waived => "waived",
        }
    }
}

text_enum!(FineStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FineReason {
    Overdue,
    Damage,
    Lost,
    Administrative,
}

impl FineReason {
    pub const ALL: [FineReason; 4] = [
        FineReason::Overdue,
        FineReason::Damage,
        FineReason::Lost,
        FineReason::Administrative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FineReason::Overdue => "overdue",
            FineReason::Damage => "damage",
            FineReason::Lost => "lost",
            FineReason::Administrative => "administrative",
        }
    }
}

text_enum!(FineReason);

// ---------------------------------------------------------------------------
// ReaderCategory
// ---------------------------------------------------------------------------

/// Patron category a reader type belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReaderCategory {
    Student,
    Teacher,
    Staff,
    Guest,
}

impl ReaderCategory {
    pub const ALL: [ReaderCategory; 4] = [
        ReaderCategory::Student,
        ReaderCategory::Teacher,
        ReaderCategory::Staff,
        ReaderCategory::Guest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReaderCategory::Student => "student",
            ReaderCategory::Teacher => "teacher",
            ReaderCategory::Staff => "staff",
            ReaderCategory::Guest => "guest",
        }
    }
}

text_enum!(ReaderCategory);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_borrow_status() {
        assert_eq!(
            "pending_approval".parse::<BorrowStatus>().unwrap(),
            BorrowStatus::PendingApproval
        );
        assert_eq!(" Renewed ".parse::<BorrowStatus>().unwrap(), BorrowStatus::Renewed);
        assert!("lent".parse::<BorrowStatus>().is_err());
    }

    #[test]
    fn test_active_statuses() {
        assert!(BorrowStatus::Overdue.is_active());
        assert!(!BorrowStatus::Returned.is_active());
        assert!(BorrowStatus::Renewed.is_on_loan());
        assert!(!BorrowStatus::Overdue.is_on_loan());
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&BorrowStatus::PendingApproval).unwrap();
        assert_eq!(json, "\"pending_approval\"");
        let status: CopyStatus = serde_json::from_str("\"maintenance\"").unwrap();
        assert_eq!(status, CopyStatus::Maintenance);
    }
}
