//! HLS relay service over the `daddylive` upstream crate.
//!
//! Resolves stable channel ids into rewritten HLS manifests, tunnels
//! the keys and segments those manifests reference, and keeps an
//! in-memory channel catalog fresh with a background scheduler.

pub mod api;
pub mod config;
pub mod scheduler;
pub mod state;
