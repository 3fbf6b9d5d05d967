//! `PostgreSQL` data layer for the Terrarium simulation.
//!
//! Provides the connection pool ([`PostgresPool`]), the schema
//! migrations, and [`PgStore`] -- the production implementation of the
//! core persistence seam.

pub mod error;
pub mod postgres;
pub mod store;

pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use store::PgStore;
