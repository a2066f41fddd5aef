//! HTTP API for the clinic.
//!
//! Routes are nested under `/api/`; everything except health, first-run
//! admin bootstrap and login requires a bearer token. The router is
//! composable: `api_router()` returns a `Router` that can be mounted on any
//! axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_server_on, ApiServer, ServerSession};
pub use types::ApiContext;
