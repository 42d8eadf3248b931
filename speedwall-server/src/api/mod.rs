//! HTTP API for the Speedwall service

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::create_router;
