//! Observer API server for the Terrarium simulation.
//!
//! Serves a REST surface for status, history reads (events,
//! relationships), control (stop, speed), and injections, plus a
//! `WebSocket` stream of live world updates. The server holds a
//! [`WorldHandle`](terrarium_core::WorldHandle) for control and a
//! [`HistoryReader`](terrarium_core::HistoryReader) for reads; it
//! never touches agent internals directly.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, ChannelFanout};
