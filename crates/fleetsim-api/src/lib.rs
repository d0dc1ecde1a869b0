//! Control-plane and query API server for Fleetsim.
//!
//! Exposes the scheduler lifecycle (`/api/start`, `/api/check`,
//! `/api/end`, `/api/dropall`), device registration and listing,
//! aggregate reading queries, and a `WebSocket` stream of per-tick
//! batches at `/ws/readings`.
//!
//! # Modules
//!
//! - [`router`] -- route table and middleware
//! - [`handlers`] -- REST endpoint handlers
//! - [`queries`] -- request bodies and timestamp/kind parsing
//! - [`ws`] -- `WebSocket` upgrade and event stream
//! - [`state`] -- shared [`state::AppState`]
//! - [`store`] -- handler-facing storage seam
//! - [`debug`] -- diagnostic random-number broadcast
//! - [`server`] -- bind-and-serve lifecycle
//! - [`error`] -- HTTP error mapping

pub mod debug;
pub mod error;
pub mod handlers;
pub mod queries;
pub mod router;
pub mod server;
pub mod state;
pub mod store;
pub mod ws;

pub use error::ApiError;
pub use router::build_router;
pub use server::{start_server, ServerError};
pub use state::AppState;
pub use store::{Aggregate, MemoryStorage, PostgresStorage, Storage, StorageError};
pub use ws::WsEvent;
