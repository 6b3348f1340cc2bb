//! HTTP surface of the converter.
//!
//! `POST /api/convert` takes one multipart upload and answers with the
//! converted document as an attachment. `GET /api/health` reports whether
//! the office tool is reachable.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, start_server, ConversionServer, ServerSession};
pub use types::AppState;
