//! Scenario tests driving the rescheduling loop on tokio's paused clock.
//! Ticks are issued manually so each test controls exactly when the loop
//! observes an expression change.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use recron_core::{RecronError, Result};
use recron_scheduler::{
    ConfiguredTask, ExpressionCell, FixedTask, PollableTask, Rescheduler, SchedulerClock,
    TriggerStatus, cron,
};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
}

fn engine_at_t0() -> Rescheduler {
    Rescheduler::with_clock(SchedulerClock::anchored_at(t0()))
}

/// Advance simulated time one second at a time, letting timer chains run.
async fn advance_secs(n: u64) {
    for _ in 0..n {
        tokio::time::advance(Duration::from_secs(1)).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }
}

/// Task whose `execute()` always fails.
struct FailingTask {
    name: String,
    expression: String,
}

#[async_trait]
impl PollableTask for FailingTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self) -> Result<()> {
        Err(RecronError::task("always broken"))
    }

    fn current_expression(&self) -> String {
        self.expression.clone()
    }
}

#[tokio::test(start_paused = true)]
async fn fixed_task_fires_on_cadence_with_zero_reschedules() {
    let mut engine = engine_at_t0();
    let task = Arc::new(FixedTask::new("a", "0/5 * * * * ?"));
    let id = engine.register(task.clone());

    // 12 simulated seconds at one tick per second.
    for _ in 0..12 {
        advance_secs(1).await;
        engine.tick();
    }

    // Fires at T0+5s and T0+10s only.
    assert_eq!(task.fire_count(), 2);
    let snap = engine.snapshot(id).unwrap();
    assert_eq!(snap.reschedules, 0);
    assert_eq!(snap.status, TriggerStatus::Active);
    assert!(snap.armed);
}

#[tokio::test(start_paused = true)]
async fn timer_chain_self_rearms_without_ticks() {
    // The open-question decision: fired timers rearm themselves for the
    // unchanged expression immediately — no tick is needed between fires.
    let mut engine = engine_at_t0();
    let task = Arc::new(FixedTask::new("a", "0/1 * * * * ?"));
    engine.register(task.clone());

    advance_secs(5).await;

    assert_eq!(task.fire_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn change_triggers_exactly_one_reschedule() {
    let mut engine = engine_at_t0();
    let cell = ExpressionCell::new("0/1 * * * * ?");
    let task = Arc::new(ConfiguredTask::new("b", Arc::clone(&cell)));
    let id = engine.register(task.clone());

    advance_secs(2).await;
    engine.tick();
    assert_eq!(task.fire_count(), 2);

    // Mutation between ticks; the next tick performs one cancel + one arm.
    cell.set("0/5 * * * * ?");
    engine.tick();
    assert_eq!(engine.snapshot(id).unwrap().reschedules, 1);

    // New chain's first fire is next_fire_time("0/5 * * * * ?", T0+2s) = T0+5s.
    let expected = cron::next_fire_time("0/5 * * * * ?", t0() + chrono::Duration::seconds(2))
        .unwrap();
    assert_eq!(expected, t0() + chrono::Duration::seconds(5));

    advance_secs(2).await; // T0+4s: not yet
    engine.tick();
    assert_eq!(task.fire_count(), 2);

    advance_secs(1).await; // T0+5s: fires
    engine.tick();
    assert_eq!(task.fire_count(), 3);

    // Further unchanged ticks never reschedule again.
    advance_secs(5).await; // T0+10s: second fire of the new cadence
    engine.tick();
    assert_eq!(task.fire_count(), 4);
    assert_eq!(engine.snapshot(id).unwrap().reschedules, 1);
}

#[tokio::test(start_paused = true)]
async fn sentinel_suspends_and_resume_anchors_to_now() {
    let mut engine = engine_at_t0();
    let cell = ExpressionCell::new("0/1 * * * * ?");
    let task = Arc::new(ConfiguredTask::new("b", Arc::clone(&cell)));
    let id = engine.register(task.clone());

    // Fires on ticks 1..3, suspended on 4..6, resumed from tick 7.
    for tick in 1..=12u64 {
        advance_secs(1).await;
        if tick == 3 {
            cell.suspend();
        }
        if tick == 7 {
            cell.set("0/1 * * * * ?");
        }
        engine.tick();

        match tick {
            3 => assert_eq!(task.fire_count(), 3),
            6 => {
                // No fires while suspended, timer fully cancelled.
                assert_eq!(task.fire_count(), 3);
                let snap = engine.snapshot(id).unwrap();
                assert_eq!(snap.status, TriggerStatus::Suspended);
                assert!(!snap.armed);
            }
            7 => {
                // Resumed: armed from "now" (T0+7s), first fire at T0+8s.
                let snap = engine.snapshot(id).unwrap();
                assert_eq!(snap.status, TriggerStatus::Active);
                assert!(snap.armed);
                assert_eq!(task.fire_count(), 3);
            }
            _ => {}
        }
    }

    // Resumed fires at T0+8..T0+12: five more.
    assert_eq!(task.fire_count(), 8);
}

#[tokio::test(start_paused = true)]
async fn resume_ignores_pre_suspension_state() {
    let mut engine = engine_at_t0();
    let cell = ExpressionCell::new("0/5 * * * * ?");
    let task = Arc::new(ConfiguredTask::new("b", Arc::clone(&cell)));
    engine.register(task.clone());

    // Suspend before the first fire would have happened at T0+5s.
    advance_secs(2).await;
    cell.suspend();
    engine.tick();

    advance_secs(4).await; // past T0+5s
    engine.tick();
    assert_eq!(task.fire_count(), 0);

    // Resume at T0+6s: next fire is next_fire_time(expr, now) = T0+10s.
    cell.set("0/5 * * * * ?");
    engine.tick();

    advance_secs(3).await; // T0+9s
    engine.tick();
    assert_eq!(task.fire_count(), 0);

    advance_secs(1).await; // T0+10s
    engine.tick();
    assert_eq!(task.fire_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failing_task_does_not_affect_others() {
    let mut engine = engine_at_t0();
    let failing_id = engine.register(Arc::new(FailingTask {
        name: "broken".into(),
        expression: "0/1 * * * * ?".into(),
    }));
    let healthy = Arc::new(FixedTask::new("healthy", "0/1 * * * * ?"));
    engine.register(healthy.clone());

    for _ in 0..3 {
        advance_secs(1).await;
        engine.tick();
    }

    // The healthy task fired on schedule despite its neighbour failing
    // every single time.
    assert_eq!(healthy.fire_count(), 3);
    let snap = engine.snapshot(failing_id).unwrap();
    assert_eq!(snap.fires, 3);
    assert_eq!(snap.failures, 3);
    // Execution failure does not cancel the future schedule.
    assert_eq!(snap.status, TriggerStatus::Active);
}

#[tokio::test(start_paused = true)]
async fn unregister_cancels_pending_fires() {
    let mut engine = engine_at_t0();
    let task = Arc::new(FixedTask::new("a", "0/1 * * * * ?"));
    let id = engine.register(task.clone());

    advance_secs(2).await;
    assert_eq!(task.fire_count(), 2);

    assert!(engine.unregister(id));
    advance_secs(3).await;
    assert_eq!(task.fire_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn equal_string_is_never_a_reschedule() {
    // Re-setting the cell to the identical string must not touch the timer.
    let mut engine = engine_at_t0();
    let cell = ExpressionCell::new("0/1 * * * * ?");
    let task = Arc::new(ConfiguredTask::new("b", Arc::clone(&cell)));
    let id = engine.register(task.clone());

    for _ in 0..4 {
        advance_secs(1).await;
        cell.set("0/1 * * * * ?");
        engine.tick();
    }

    assert_eq!(engine.snapshot(id).unwrap().reschedules, 0);
    assert_eq!(task.fire_count(), 4);
}
