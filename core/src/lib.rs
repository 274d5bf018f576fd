//! Remote-control client for a paired companion service.
//!
//! The client bootstraps a session from a one-time connect link, stores a
//! durable bearer token, and relays media, system, and audio commands to the
//! companion over HTTP.

pub mod audio;
pub mod config;
pub mod connect;
pub mod controls;
pub mod error;
pub mod relay;
pub mod session;

#[cfg(feature = "cli")]
pub mod cli;
