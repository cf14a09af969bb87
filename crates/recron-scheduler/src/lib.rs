//! # Recron Scheduler
//!
//! Dynamic cron rescheduling core. Tasks report their *current* desired
//! cron expression on every polling cycle; the control loop diffs it
//! against the last-seen value and cancels/rearms timers at runtime.
//! The reserved expression `"-"` suspends a task without unregistering it.
//!
//! ## Architecture
//! ```text
//! Rescheduler (tokio interval tick)
//!   ├── for each registered PollableTask:
//!   │     read current_expression()
//!   │     ├── unchanged          → leave the timer chain running
//!   │     ├── changed to "-"     → cancel timer, mark Suspended
//!   │     ├── changed to cadence → cancel timer, arm fresh chain
//!   │     └── "-" → cadence      → arm fresh chain (resume)
//!   └── timer chain (spawned): sleep → execute() → self-rearm
//! ```
//!
//! Timer chains fire independently of the control loop; a slow or failing
//! `execute()` never blocks the tick or other tasks.

pub mod clock;
pub mod cron;
pub mod engine;
pub mod task;

pub use clock::SchedulerClock;
pub use engine::{Rescheduler, TaskId, TaskSnapshot, TimerHandle, TriggerStatus, spawn_rescheduler};
pub use task::{
    ConfiguredTask, ExpressionCell, FixedTask, PollableTask, SUSPEND_EXPRESSION, TogglingTask,
};
