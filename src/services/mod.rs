//! Business logic services
//!
//! Every mutating operation runs in a single database transaction and
//! commits before any reader notification is attempted.

pub mod borrows;
pub mod copies;
pub mod fines;
pub mod notifications;
pub mod readers;
pub mod redis;
pub mod reservations;
pub mod stats;
pub mod sweeper;

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::{
    config::{CirculationConfig, EmailConfig},
    repository::Repository,
};

use notifications::{EmailNotifier, LogNotifier, ReaderNotifier};

/// Library-local wall clock. Dates are calendar dates at the library.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub borrows: borrows::BorrowService,
    pub reservations: reservations::ReservationService,
    pub fines: fines::FineService,
    pub copies: copies::CopyService,
    pub readers: readers::ReaderService,
    pub stats: stats::StatsService,
    pub redis: redis::RedisService,
    pub circulation: CirculationConfig,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        circulation: CirculationConfig,
        email_config: EmailConfig,
        redis_service: redis::RedisService,
    ) -> Self {
        let notifier: Arc<dyn ReaderNotifier> = if email_config.enabled {
            Arc::new(EmailNotifier::new(email_config))
        } else {
            Arc::new(LogNotifier)
        };

        Self {
            borrows: borrows::BorrowService::new(repository.clone(), circulation.clone(), notifier.clone()),
            reservations: reservations::ReservationService::new(
                repository.clone(),
                circulation.clone(),
                notifier,
            ),
            fines: fines::FineService::new(repository.clone()),
            copies: copies::CopyService::new(repository.clone()),
            readers: readers::ReaderService::new(repository.clone()),
            stats: stats::StatsService::new(repository.clone(), circulation.clone()),
            redis: redis_service,
            circulation,
            repository,
        }
    }
}
