//! Error types for the world engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup.

/// Top-level error for the world engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: terrarium_core::ConfigError,
    },

    /// Database connection or migration failed.
    #[error("database error: {source}")]
    Db {
        /// The underlying data-layer error.
        #[from]
        source: terrarium_db::DbError,
    },

    /// Agent seeding or loading failed.
    #[error("persistence error: {source}")]
    Persistence {
        /// The underlying persistence failure.
        #[from]
        source: terrarium_core::PersistenceError,
    },

    /// The scheduler could not be assembled or loaded.
    #[error("scheduler error: {source}")]
    Scheduler {
        /// The underlying scheduler error.
        #[from]
        source: terrarium_core::SchedulerError,
    },
}
