//! Unified error types for recron.

use thiserror::Error;

/// Result type alias using RecronError.
pub type Result<T> = std::result::Result<T, RecronError>;

#[derive(Error, Debug)]
pub enum RecronError {
    // Schedule interpreter errors
    #[error("Invalid cron expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    // Timer errors
    #[error("Failed to arm timer: {0}")]
    TimerArm(String),

    // Task errors
    #[error("Task execution failed: {0}")]
    TaskExecution(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl RecronError {
    pub fn invalid_expression(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidExpression {
            expression: expression.into(),
            reason: reason.into(),
        }
    }

    pub fn timer_arm(msg: impl Into<String>) -> Self {
        Self::TimerArm(msg.into())
    }

    pub fn task(msg: impl Into<String>) -> Self {
        Self::TaskExecution(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
