//! Data models for the circulation server

pub mod borrow_record;
pub mod enums;
pub mod fine;
pub mod physical_copy;
pub mod reader;
pub mod reservation;
pub mod user;

// Re-export commonly used types
pub use borrow_record::{BorrowRecord, BorrowRecordDetails};
pub use enums::{BorrowStatus, CopyStatus, FineReason, FineStatus, ReaderCategory, ReservationStatus};
pub use fine::Fine;
pub use physical_copy::PhysicalCopy;
pub use reader::{Reader, ReaderType, ReaderWithType};
pub use reservation::Reservation;
pub use user::UserClaims;
