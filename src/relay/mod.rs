//! Server-side relay for the Yahoo Finance search and chart endpoints.

pub mod handlers;
pub mod server;

pub use handlers::RelayError;
pub use server::RelayServer;
