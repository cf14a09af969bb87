//! Pollable task contract and the built-in reference variants.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use recron_core::Result;

/// Reserved expression meaning "suspended — do not run, keep watching".
/// A data-level convention, not a cadence: it must be special-cased
/// before anything reaches the cron interpreter.
pub const SUSPEND_EXPRESSION: &str = "-";

/// A unit of periodic work that reports its own desired schedule.
///
/// The rescheduling loop re-reads `current_expression()` on every tick
/// and string-compares it against the last observed value; returning
/// [`SUSPEND_EXPRESSION`] parks the task without unregistering it.
#[async_trait]
pub trait PollableTask: Send + Sync {
    /// Human-readable name for logs. Identity is the registration handle.
    fn name(&self) -> &str;

    /// Run one firing of the task.
    async fn execute(&self) -> Result<()>;

    /// The task's desired cron expression right now.
    fn current_expression(&self) -> String;
}

/// Shared, swappable expression holder.
///
/// Written by external mutators (the HTTP gateway), read by
/// [`ConfiguredTask`] on every poll. The rescheduling loop never writes
/// it — it only observes changes on the next tick.
#[derive(Debug)]
pub struct ExpressionCell {
    value: RwLock<String>,
}

impl ExpressionCell {
    pub fn new(initial: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            value: RwLock::new(initial.into()),
        })
    }

    pub fn get(&self) -> String {
        self.value.read().unwrap().clone()
    }

    pub fn set(&self, expression: impl Into<String>) {
        *self.value.write().unwrap() = expression.into();
    }

    /// Sugar for setting the suspension sentinel.
    pub fn suspend(&self) {
        self.set(SUSPEND_EXPRESSION);
    }
}

/// Fixed-cadence task: its expression never changes, so the loop must
/// never touch its timer.
pub struct FixedTask {
    name: String,
    expression: String,
    fires: AtomicU64,
}

impl FixedTask {
    pub fn new(name: &str, expression: &str) -> Self {
        Self {
            name: name.to_string(),
            expression: expression.to_string(),
            fires: AtomicU64::new(0),
        }
    }

    pub fn fire_count(&self) -> u64 {
        self.fires.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PollableTask for FixedTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<()> {
        self.fires.fetch_add(1, Ordering::Relaxed);
        tracing::info!("🔔 '{}' fired", self.name);
        Ok(())
    }

    fn current_expression(&self) -> String {
        self.expression.clone()
    }
}

/// Externally-configured task: polls a shared [`ExpressionCell`] that
/// the gateway may overwrite between ticks.
pub struct ConfiguredTask {
    name: String,
    cell: Arc<ExpressionCell>,
    fires: AtomicU64,
}

impl ConfiguredTask {
    pub fn new(name: &str, cell: Arc<ExpressionCell>) -> Self {
        Self {
            name: name.to_string(),
            cell,
            fires: AtomicU64::new(0),
        }
    }

    pub fn fire_count(&self) -> u64 {
        self.fires.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PollableTask for ConfiguredTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<()> {
        self.fires.fetch_add(1, Ordering::Relaxed);
        tracing::info!("🔔 '{}' fired", self.name);
        Ok(())
    }

    fn current_expression(&self) -> String {
        self.cell.get()
    }
}

/// Self-toggling task: flips between suspended and one fixed cadence on
/// every poll, independent of external input. Proves that a task's own
/// state can drive rescheduling and that re-polling happens every tick.
pub struct TogglingTask {
    name: String,
    active_expression: String,
    current: Mutex<String>,
    fires: AtomicU64,
}

impl TogglingTask {
    pub fn new(name: &str, active_expression: &str) -> Self {
        Self {
            name: name.to_string(),
            active_expression: active_expression.to_string(),
            // Starts on the sentinel; the first poll flips to active.
            current: Mutex::new(SUSPEND_EXPRESSION.to_string()),
            fires: AtomicU64::new(0),
        }
    }

    pub fn fire_count(&self) -> u64 {
        self.fires.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl PollableTask for TogglingTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<()> {
        self.fires.fetch_add(1, Ordering::Relaxed);
        tracing::info!("🔔 '{}' fired", self.name);
        Ok(())
    }

    fn current_expression(&self) -> String {
        let mut current = self.current.lock().unwrap();
        *current = if *current == SUSPEND_EXPRESSION {
            self.active_expression.clone()
        } else {
            SUSPEND_EXPRESSION.to_string()
        };
        current.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_swap() {
        let cell = ExpressionCell::new("0/1 * * * * ?");
        assert_eq!(cell.get(), "0/1 * * * * ?");
        cell.set("0/5 * * * * ?");
        assert_eq!(cell.get(), "0/5 * * * * ?");
        cell.suspend();
        assert_eq!(cell.get(), SUSPEND_EXPRESSION);
    }

    #[test]
    fn test_fixed_expression_is_constant() {
        let task = FixedTask::new("bar", "0/1 * * * * ?");
        assert_eq!(task.current_expression(), task.current_expression());
    }

    #[test]
    fn test_configured_tracks_cell() {
        let cell = ExpressionCell::new("0/1 * * * * ?");
        let task = ConfiguredTask::new("foo", Arc::clone(&cell));
        assert_eq!(task.current_expression(), "0/1 * * * * ?");
        cell.set("0/5 * * * * ?");
        assert_eq!(task.current_expression(), "0/5 * * * * ?");
    }

    #[test]
    fn test_toggling_alternates() {
        let task = TogglingTask::new("flip", "0/1 * * * * ?");
        assert_eq!(task.current_expression(), "0/1 * * * * ?");
        assert_eq!(task.current_expression(), SUSPEND_EXPRESSION);
        assert_eq!(task.current_expression(), "0/1 * * * * ?");
    }
}
