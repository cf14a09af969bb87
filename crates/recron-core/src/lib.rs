//! # Recron Core
//!
//! Shared error and configuration types for the recron workspace.

pub mod config;
pub mod error;

pub use config::RecronConfig;
pub use error::{RecronError, Result};
