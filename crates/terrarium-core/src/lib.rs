//! World scheduling for the Terrarium simulation.
//!
//! This crate owns the tick loop and everything the loop needs around
//! it: typed configuration, run control (speed, stop), and the two
//! collaborator seams the engine wires at startup -- [`Persistence`]
//! for storage and [`Fanout`] for observer delivery.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with env overrides
//! - [`control`] -- shared speed/stop/liveness flags
//! - [`persistence`] -- the storage trait and its in-memory stub
//! - [`fanout`] -- best-effort observer broadcast trait
//! - [`scheduler`] -- the per-tick driver
//! - [`handle`] -- the clonable control surface for frontends

pub mod config;
pub mod control;
pub mod fanout;
pub mod handle;
pub mod persistence;
pub mod scheduler;

pub use config::{ConfigError, WorldConfig};
pub use control::ControlState;
pub use fanout::{Fanout, NoopFanout, RecordingFanout};
pub use handle::{AgentOverview, WorldHandle};
pub use persistence::{HistoryReader, MemoryPersistence, Persistence, PersistenceError};
pub use scheduler::{Scheduler, SchedulerError};
