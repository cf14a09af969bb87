//! # Recron Gateway
//!
//! HTTP endpoints that mutate a task's schedule at runtime. Mutations
//! act only on the shared expression cell a task polls — trigger state
//! stays owned exclusively by the rescheduling loop, which observes the
//! change on its next tick.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, serve};
