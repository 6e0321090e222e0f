//! finchcred - build-credential isolation
//!
//! Hands registry credentials to a build's credential helper over a
//! dedicated local socket, scoped to a single build and never written
//! to disk.

pub mod api;
pub mod audit;
pub mod build;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod helper;
pub mod peer;
pub mod protocol;

pub use error::{FinchError, FinchResult};
