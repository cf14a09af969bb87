//! Rescheduling engine — the control loop that re-polls every task's
//! expression on a fixed tick and swaps timers when it changes.
//!
//! Decision on fired timers: a timer chain self-rearms immediately for
//! the next occurrence of the same expression, anchored to the previous
//! scheduled instant. The tick only intervenes on expression *changes*,
//! so an unchanged task keeps its timer chain untouched forever.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::clock::SchedulerClock;
use crate::cron::CronSchedule;
use crate::task::{PollableTask, SUSPEND_EXPRESSION};

/// Stable handle identifying a registered task. Identity never changes,
/// unlike the expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TaskId(u64);

/// Whether a task currently has a timer armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerStatus {
    Active,
    Suspended,
}

/// Cancellable handle to a pending timer chain.
///
/// Cancellation is idempotent, never blocks, and is best-effort: a chain
/// that already started firing may complete its in-flight `execute()`
/// (at most one extra fire), but no future fire is scheduled under the
/// old handle.
#[derive(Debug)]
pub struct TimerHandle {
    join: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.join.abort();
    }

    /// True once the chain has stopped on its own (ran out of occurrences).
    fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// Per-task trigger bookkeeping. Mutated only by the engine.
/// Invariant: `timer` is present iff `status == Active`.
struct TriggerState {
    /// Cache of the last value `current_expression()` returned, as
    /// observed by the loop. Staleness is bounded by the tick interval.
    last_expression: String,
    timer: Option<TimerHandle>,
    status: TriggerStatus,
}

struct Entry {
    task: Arc<dyn PollableTask>,
    state: TriggerState,
    /// Incremented by the timer chain on every fire.
    fires: Arc<AtomicU64>,
    /// Incremented by the timer chain when `execute()` errors.
    failures: Arc<AtomicU64>,
    /// Cancel+rearm operations performed by the loop.
    reschedules: u64,
}

/// Read-only view of a task's trigger state, for the gateway and tests.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub status: TriggerStatus,
    pub armed: bool,
    pub expression: String,
    pub fires: u64,
    pub failures: u64,
    pub reschedules: u64,
}

/// The rescheduling engine: task registry plus the per-tick evaluation
/// pass. Single owner of all trigger state — wrap in
/// `Arc<tokio::sync::Mutex<_>>` and drive via [`spawn_rescheduler`].
pub struct Rescheduler {
    tasks: HashMap<TaskId, Entry>,
    clock: SchedulerClock,
    next_id: u64,
}

impl Rescheduler {
    pub fn new() -> Self {
        Self::with_clock(SchedulerClock::new())
    }

    pub fn with_clock(clock: SchedulerClock) -> Self {
        Self {
            tasks: HashMap::new(),
            clock,
            next_id: 0,
        }
    }

    pub fn clock(&self) -> &SchedulerClock {
        &self.clock
    }

    /// Register a task. Its expression is read immediately: a cadence
    /// arms a timer chain from "now", the sentinel (or an invalid
    /// expression) parks the task suspended.
    pub fn register(&mut self, task: Arc<dyn PollableTask>) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;

        let expression = task.current_expression();
        let mut entry = Entry {
            task,
            state: TriggerState {
                last_expression: expression.clone(),
                timer: None,
                status: TriggerStatus::Suspended,
            },
            fires: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(AtomicU64::new(0)),
            reschedules: 0,
        };

        if expression == SUSPEND_EXPRESSION {
            tracing::info!("📅 Task registered suspended: '{}'", entry.task.name());
        } else {
            let now = self.clock.now();
            arm(&self.clock, &mut entry, &expression, now);
            tracing::info!(
                "📅 Task registered: '{}' expr '{}'",
                entry.task.name(),
                expression
            );
        }

        self.tasks.insert(id, entry);
        id
    }

    /// Unregister a task, cancelling any active timer.
    pub fn unregister(&mut self, id: TaskId) -> bool {
        match self.tasks.remove(&id) {
            Some(entry) => {
                if let Some(timer) = &entry.state.timer {
                    timer.cancel();
                }
                tracing::info!("🗑️ Task unregistered: '{}'", entry.task.name());
                true
            }
            None => false,
        }
    }

    /// One evaluation pass over the registry.
    ///
    /// For every task: re-read the live expression, diff against the
    /// last observed value, and cancel/rearm/suspend as needed. String
    /// equality is the sole change detector. A failure in one task never
    /// aborts the pass.
    pub fn tick(&mut self) {
        let clock = self.clock.clone();
        let now = clock.now();

        for entry in self.tasks.values_mut() {
            let expression = entry.task.current_expression();

            if expression == entry.state.last_expression {
                // Unchanged: leave the timer chain running. A chain that
                // stopped on its own (no further occurrence) is parked.
                if let Some(timer) = &entry.state.timer
                    && timer.is_finished()
                {
                    entry.state.timer = None;
                    entry.state.status = TriggerStatus::Suspended;
                    tracing::warn!(
                        "⏸️ '{}' exhausted its schedule — suspended",
                        entry.task.name()
                    );
                }
                continue;
            }

            tracing::info!(
                "🔁 '{}' expression changed: '{}' → '{}'",
                entry.task.name(),
                entry.state.last_expression,
                expression
            );

            if let Some(timer) = entry.state.timer.take() {
                timer.cancel();
            }
            entry.state.status = TriggerStatus::Suspended;
            entry.state.last_expression = expression.clone();

            if expression == SUSPEND_EXPRESSION {
                tracing::info!("⏸️ '{}' suspended", entry.task.name());
                continue;
            }

            entry.reschedules += 1;
            arm(&clock, entry, &expression, now);
        }
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn snapshot(&self, id: TaskId) -> Option<TaskSnapshot> {
        self.tasks.get(&id).map(|entry| make_snapshot(id, entry))
    }

    /// Snapshots of every registered task, ordered by handle.
    pub fn snapshots(&self) -> Vec<TaskSnapshot> {
        let mut all: Vec<TaskSnapshot> = self
            .tasks
            .iter()
            .map(|(id, entry)| make_snapshot(*id, entry))
            .collect();
        all.sort_by_key(|s| s.id);
        all
    }
}

impl Default for Rescheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn make_snapshot(id: TaskId, entry: &Entry) -> TaskSnapshot {
    TaskSnapshot {
        id,
        name: entry.task.name().to_string(),
        status: entry.state.status,
        armed: entry.state.timer.is_some(),
        expression: entry.state.last_expression.clone(),
        fires: entry.fires.load(Ordering::Relaxed),
        failures: entry.failures.load(Ordering::Relaxed),
        reschedules: entry.reschedules,
    }
}

/// Compute the first fire instant and spawn the timer chain.
/// Interpreter failures suspend the task instead of crashing the loop.
fn arm(clock: &SchedulerClock, entry: &mut Entry, expression: &str, now: DateTime<Utc>) {
    let schedule = match CronSchedule::parse(expression) {
        Ok(schedule) => schedule,
        Err(e) => {
            tracing::warn!("⚠️ '{}': {e} — task suspended", entry.task.name());
            return;
        }
    };
    let first = match schedule.next_after(now) {
        Ok(first) => first,
        Err(e) => {
            tracing::warn!("⚠️ '{}': {e} — task suspended", entry.task.name());
            return;
        }
    };

    entry.state.timer = Some(spawn_timer_chain(
        clock.clone(),
        schedule,
        first,
        Arc::clone(&entry.task),
        Arc::clone(&entry.fires),
        Arc::clone(&entry.failures),
    ));
    entry.state.status = TriggerStatus::Active;
    tracing::debug!("⏱️ '{}' armed, next fire {}", entry.task.name(), first);
}

/// Timer chain: sleep until the fire instant, run `execute()`, then
/// immediately rearm for the next occurrence of the same expression.
/// Ends only when cancelled (expression change, suspension, unregister)
/// or when the schedule has no further occurrence.
fn spawn_timer_chain(
    clock: SchedulerClock,
    schedule: CronSchedule,
    first: DateTime<Utc>,
    task: Arc<dyn PollableTask>,
    fires: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
) -> TimerHandle {
    let join = tokio::spawn(async move {
        let mut next = first;
        loop {
            // A deadline already in the past fires immediately.
            tokio::time::sleep_until(clock.instant_at(next)).await;

            fires.fetch_add(1, Ordering::Relaxed);
            if let Err(e) = task.execute().await {
                failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("⚠️ Task '{}' failed: {e}", task.name());
            }

            // Rearm anchored to the scheduled instant, not wall "now".
            next = match schedule.next_after(next) {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!("⚠️ Task '{}': {e}", task.name());
                    break;
                }
            };
        }
    });
    TimerHandle { join }
}

/// Spawn the rescheduling control loop as a background tokio task.
/// The tick interval is fixed and independent of any task's cadence.
pub async fn spawn_rescheduler(engine: Arc<Mutex<Rescheduler>>, tick_interval_secs: u64) {
    tracing::info!("⏰ Rescheduler started (tick every {tick_interval_secs}s)");

    let mut interval = tokio::time::interval(std::time::Duration::from_secs(tick_interval_secs));

    loop {
        interval.tick().await;
        engine.lock().await.tick();
    }
}
