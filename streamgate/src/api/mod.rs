//! HTTP surface of the relay service.

pub mod error;
pub mod routes;
pub mod server;
