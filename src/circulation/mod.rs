//! Circulation rules
//!
//! Pure functions over borrow records, reservations and fines. Nothing in
//! here touches the database or the clock: callers pass `today` / `now`.

pub mod dates;
pub mod fines;
pub mod lifecycle;
pub mod renewal;

pub use dates::{
    calculate_due_date, days_overdue, days_until_due, is_due_within, is_due_within_3_days,
    is_expired_by_end_of_day, is_expiring_soon, is_overdue,
};
pub use fines::{FinePolicy, PaymentOutcome};
pub use lifecycle::BorrowAction;
pub use renewal::resolve_renewal;
