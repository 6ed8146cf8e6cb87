//! Trigger scheduler and task executor.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::handle::TaskHandle;

/// A task that may be fired many times.
pub type Runnable = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// When a submitted task fires.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// Every match of a cron schedule.
    Cron(Schedule),
    /// First at `initial`, then `delay` after the end of the previous run.
    FixedDelay {
        initial: DateTime<Utc>,
        delay: Duration,
    },
    /// Once, at an absolute time.
    At(DateTime<Utc>),
    /// Once, immediately.
    Now,
}

impl Trigger {
    pub fn is_recurring(&self) -> bool {
        matches!(self, Trigger::Cron(_) | Trigger::FixedDelay { .. })
    }

    fn first_fire(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Cron(schedule) => schedule.after(&now).next(),
            Trigger::FixedDelay { initial, .. } => Some(*initial),
            Trigger::At(at) => Some(*at),
            Trigger::Now => Some(now),
        }
    }

    fn following_fire(&self, finished: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Trigger::Cron(schedule) => schedule.after(&finished).next(),
            Trigger::FixedDelay { delay, .. } => chrono::TimeDelta::from_std(*delay)
                .ok()
                .and_then(|d| finished.checked_add_signed(d)),
            Trigger::At(_) | Trigger::Now => None,
        }
    }
}

/// Accepts tasks with a trigger and hands back a cancel handle.
///
/// Submitting never runs the task on the caller's thread.
pub trait TaskScheduler: Send + Sync {
    /// Fire `task` according to `trigger`.
    fn schedule(&self, trigger: Trigger, task: Runnable) -> TaskHandle;

    /// Fire `task` once, as soon as possible.
    fn execute(&self, task: Runnable) -> TaskHandle {
        self.schedule(Trigger::Now, task)
    }
}

/// [`TaskScheduler`] driving each submission as a tokio task.
#[derive(Debug, Clone)]
pub struct TokioTaskScheduler {
    runtime: Handle,
}

impl TokioTaskScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Use the runtime of the calling context.
    pub fn current() -> Result<Self, EngineError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| EngineError::NoRuntime(e.to_string()))
    }
}

impl TaskScheduler for TokioTaskScheduler {
    fn schedule(&self, trigger: Trigger, task: Runnable) -> TaskHandle {
        let handle = TaskHandle::new(trigger.is_recurring());
        self.runtime.spawn(drive(trigger, task, handle.clone()));
        handle
    }
}

async fn drive(trigger: Trigger, task: Runnable, handle: TaskHandle) {
    let withdrawn = handle.trigger_token();
    let mut next = trigger.first_fire(Utc::now());

    while let Some(at) = next {
        let wait = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        tokio::select! {
            _ = withdrawn.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        if handle.begin_run().is_none() {
            break;
        }
        if AssertUnwindSafe(task()).catch_unwind().await.is_err() {
            warn!(task = %handle.id(), "Scheduled task panicked");
        }
        handle.end_run();

        if !trigger.is_recurring() || handle.is_cancelled() {
            break;
        }
        next = trigger.following_fire(Utc::now());
        if next.is_none() {
            debug!(task = %handle.id(), "Trigger has no further fire time");
        }
    }

    handle.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: Arc<AtomicUsize>) -> Runnable {
        Arc::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        })
    }

    async fn wait_done(handle: &TaskHandle) {
        for _ in 0..200 {
            if handle.is_done() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("handle did not finish");
    }

    #[tokio::test]
    async fn test_execute_runs_once() {
        let scheduler = TokioTaskScheduler::current().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.execute(counting(counter.clone()));

        wait_done(&handle).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!handle.is_recurring());
    }

    #[tokio::test]
    async fn test_cancel_before_fire() {
        let scheduler = TokioTaskScheduler::current().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.schedule(
            Trigger::At(Utc::now() + chrono::Duration::seconds(60)),
            counting(counter.clone()),
        );

        assert!(handle.cancel());
        wait_done(&handle).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fixed_delay_repeats_until_cancelled() {
        let scheduler = TokioTaskScheduler::current().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.schedule(
            Trigger::FixedDelay {
                initial: Utc::now(),
                delay: Duration::from_millis(20),
            },
            counting(counter.clone()),
        );

        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(counter.load(Ordering::SeqCst) >= 3);

        assert!(handle.cancel());
        wait_done(&handle).await;
    }

    #[tokio::test]
    async fn test_panicking_task_finishes_handle() {
        let scheduler = TokioTaskScheduler::current().unwrap();
        let task: Runnable = Arc::new(|| {
            async {
                if true {
                    panic!("boom")
                }
            }
            .boxed()
        });
        let handle = scheduler.execute(task);
        wait_done(&handle).await;
    }

    #[test]
    fn test_trigger_fire_times() {
        let now = Utc::now();
        assert_eq!(Trigger::Now.first_fire(now), Some(now));
        assert_eq!(Trigger::At(now).following_fire(now), None);

        let delay = Trigger::FixedDelay {
            initial: now,
            delay: Duration::from_secs(60),
        };
        assert_eq!(delay.following_fire(now), Some(now + chrono::Duration::seconds(60)));
        assert!(delay.is_recurring());

        let cron = Trigger::Cron(Schedule::from_str("0 0 * * * *").unwrap());
        let next = cron.first_fire(now).unwrap();
        assert!(next > now);
        assert!(cron.is_recurring());
    }

    #[test]
    fn test_fixed_delay_past_max_date_stops() {
        let now = Utc::now();
        let huge = Trigger::FixedDelay {
            initial: now,
            delay: Duration::from_secs(1_000_000_000_000_000),
        };
        assert_eq!(huge.following_fire(now), None);

        let unrepresentable = Trigger::FixedDelay {
            initial: now,
            delay: Duration::from_secs(u64::MAX),
        };
        assert_eq!(unrepresentable.following_fire(now), None);
    }

    #[tokio::test]
    async fn test_fixed_delay_without_next_fire_finishes_handle() {
        let scheduler = TokioTaskScheduler::current().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.schedule(
            Trigger::FixedDelay {
                initial: Utc::now(),
                delay: Duration::from_secs(u64::MAX),
            },
            counting(counter.clone()),
        );

        wait_done(&handle).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_current_outside_runtime() {
        assert!(matches!(TokioTaskScheduler::current(), Err(EngineError::NoRuntime(_))));
    }
}
