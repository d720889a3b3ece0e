//! Borrow record state machine

use crate::{
    error::{AppError, AppResult},
    models::enums::{BorrowStatus, CopyStatus},
};

/// Librarian (or sweeper) action on a borrow record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowAction {
    Approve,
    Reject,
    Return,
    Renew,
    MarkOverdue,
    Cancel,
}

impl BorrowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowAction::Approve => "approve",
            BorrowAction::Reject => "reject",
            BorrowAction::Return => "return",
            BorrowAction::Renew => "renew",
            BorrowAction::MarkOverdue => "mark overdue",
            BorrowAction::Cancel => "cancel",
        }
    }

    /// Statuses the action may start from
    pub fn allowed_from(&self) -> &'static [BorrowStatus] {
        use BorrowStatus::*;
        match self {
            BorrowAction::Approve | BorrowAction::Reject => &[PendingApproval],
            BorrowAction::Return => &[Borrowed, Renewed, Overdue],
            BorrowAction::Renew | BorrowAction::MarkOverdue => &[Borrowed, Renewed],
            BorrowAction::Cancel => &[PendingApproval, Borrowed, Renewed, Overdue],
        }
    }

    pub fn target(&self) -> BorrowStatus {
        match self {
            BorrowAction::Approve => BorrowStatus::Borrowed,
            BorrowAction::Reject => BorrowStatus::Rejected,
            BorrowAction::Return => BorrowStatus::Returned,
            BorrowAction::Renew => BorrowStatus::Renewed,
            BorrowAction::MarkOverdue => BorrowStatus::Overdue,
            BorrowAction::Cancel => BorrowStatus::Cancelled,
        }
    }

    /// Copy status written alongside the transition, if any
    pub fn copy_status(&self) -> Option<CopyStatus> {
        match self {
            BorrowAction::Approve | BorrowAction::Renew => Some(CopyStatus::Borrowed),
            BorrowAction::Return | BorrowAction::Cancel => Some(CopyStatus::Available),
            BorrowAction::Reject | BorrowAction::MarkOverdue => None,
        }
    }

    pub fn is_allowed(&self, current: BorrowStatus) -> bool {
        self.allowed_from().contains(&current)
    }

    /// Target status, or a business-rule error for an illegal transition
    pub fn apply(&self, current: BorrowStatus) -> AppResult<BorrowStatus> {
        if self.is_allowed(current) {
            Ok(self.target())
        } else {
            Err(AppError::BusinessRule(format!(
                "Cannot {} a borrow record in status '{}'",
                self.as_str(),
                current
            )))
        }
    }
}

/// Only finished records may be deleted
pub fn ensure_deletable(current: BorrowStatus) -> AppResult<()> {
    match current {
        BorrowStatus::Returned | BorrowStatus::Cancelled | BorrowStatus::Rejected => Ok(()),
        other => Err(AppError::BusinessRule(format!(
            "Cannot delete a borrow record in status '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIONS: [BorrowAction; 6] = [
        BorrowAction::Approve,
        BorrowAction::Reject,
        BorrowAction::Return,
        BorrowAction::Renew,
        BorrowAction::MarkOverdue,
        BorrowAction::Cancel,
    ];

    #[test]
    fn test_table() {
        use BorrowStatus::*;
        assert_eq!(BorrowAction::Approve.apply(PendingApproval).unwrap(), Borrowed);
        assert_eq!(BorrowAction::Reject.apply(PendingApproval).unwrap(), Rejected);
        assert_eq!(BorrowAction::Return.apply(Overdue).unwrap(), Returned);
        assert_eq!(BorrowAction::Renew.apply(Renewed).unwrap(), Renewed);
        assert_eq!(BorrowAction::MarkOverdue.apply(Borrowed).unwrap(), Overdue);
        assert_eq!(BorrowAction::Cancel.apply(Overdue).unwrap(), Cancelled);
    }

    #[test]
    fn test_illegal_transitions() {
        use BorrowStatus::*;
        assert!(BorrowAction::Approve.apply(Borrowed).is_err());
        assert!(BorrowAction::Renew.apply(Overdue).is_err());
        assert!(BorrowAction::Return.apply(PendingApproval).is_err());
        assert!(BorrowAction::MarkOverdue.apply(Overdue).is_err());
    }

    #[test]
    fn test_terminal_statuses_accept_nothing() {
        for status in [BorrowStatus::Returned, BorrowStatus::Cancelled, BorrowStatus::Rejected] {
            for action in ACTIONS {
                let err = action.apply(status).unwrap_err();
                assert!(matches!(err, AppError::BusinessRule(_)), "{:?} from {}", action, status);
            }
        }
    }

    #[test]
    fn test_copy_side_effects() {
        assert_eq!(BorrowAction::Approve.copy_status(), Some(CopyStatus::Borrowed));
        assert_eq!(BorrowAction::Return.copy_status(), Some(CopyStatus::Available));
        assert_eq!(BorrowAction::Cancel.copy_status(), Some(CopyStatus::Available));
        assert_eq!(BorrowAction::Reject.copy_status(), None);
    }

    #[test]
    fn test_delete_only_finished() {
        assert!(ensure_deletable(BorrowStatus::Returned).is_ok());
        assert!(ensure_deletable(BorrowStatus::Rejected).is_ok());
        assert!(ensure_deletable(BorrowStatus::Borrowed).is_err());
        assert!(ensure_deletable(BorrowStatus::PendingApproval).is_err());
    }
}
