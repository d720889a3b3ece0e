//! Repository layer for database operations
//!
//! Read methods use the pool; methods that take a `&mut PgConnection` are
//! meant to run inside a service-level transaction.

pub mod borrow_records;
pub mod fines;
pub mod physical_copies;
pub mod readers;
pub mod reservations;

use sqlx::{Pool, Postgres};

/// Main repository struct holding database connection pool
#[derive(Clone)]
pub struct Repository {
    pub pool: Pool<Postgres>,
    pub readers: readers::ReadersRepository,
    pub copies: physical_copies::PhysicalCopiesRepository,
    pub borrow_records: borrow_records::BorrowRecordsRepository,
    pub reservations: reservations::ReservationsRepository,
    pub fines: fines::FinesRepository,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            readers: readers::ReadersRepository::new(pool.clone()),
            copies: physical_copies::PhysicalCopiesRepository::new(pool.clone()),
            borrow_records: borrow_records::BorrowRecordsRepository::new(pool.clone()),
            reservations: reservations::ReservationsRepository::new(pool.clone()),
            fines: fines::FinesRepository::new(pool.clone()),
            pool,
        }
    }

    /// Round-trip to the database, used by the readiness probe
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
