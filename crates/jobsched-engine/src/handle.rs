//! Cancel handles for pending triggers and in-flight runs.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;

struct HandleInner {
    id: Uuid,
    recurring: bool,
    phase: AtomicU8,
    cancelled: AtomicBool,
    interrupted: AtomicBool,
    trigger: CancellationToken,
    run: Mutex<CancellationToken>,
}

/// Cancel handle returned by a [`TaskScheduler`](crate::TaskScheduler).
///
/// A handle distinguishes the pending trigger from the run it fires:
///
/// - [`cancel`](Self::cancel) withdraws the trigger so it will not fire
///   (again). It never touches a run in progress.
/// - [`interrupt`](Self::interrupt) requests cancellation of the run in
///   progress through its run token. Job bodies observe it cooperatively.
///
/// Clones share state.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Arc<HandleInner>,
}

impl TaskHandle {
    pub(crate) fn new(recurring: bool) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                id: Uuid::new_v4(),
                recurring,
                phase: AtomicU8::new(PENDING),
                cancelled: AtomicBool::new(false),
                interrupted: AtomicBool::new(false),
                trigger: CancellationToken::new(),
                run: Mutex::new(CancellationToken::new()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Whether the trigger fires more than once.
    pub fn is_recurring(&self) -> bool {
        self.inner.recurring
    }

    /// Whether both handles refer to the same submission.
    pub fn same(&self, other: &TaskHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Withdraw the pending trigger.
    ///
    /// A one-shot trigger can only be withdrawn before it fired: returns
    /// `false` once its run started or finished. A recurring trigger is
    /// withdrawn unless it is already done; a run in progress completes.
    pub fn cancel(&self) -> bool {
        let withdrawn = if self.inner.recurring {
            self.inner.phase.load(Ordering::SeqCst) != DONE
        } else {
            self.inner
                .phase
                .compare_exchange(PENDING, DONE, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        };
        if withdrawn {
            self.inner.cancelled.store(true, Ordering::SeqCst);
            self.inner.trigger.cancel();
        }
        withdrawn
    }

    /// Request cancellation of the run in progress.
    ///
    /// Returns `true` when a run was signalled, or when a pending one-shot
    /// was withdrawn before it could start. Returns `false` when the handle
    /// is done or a recurring trigger is between runs.
    pub fn interrupt(&self) -> bool {
        let run = self.inner.run.lock();
        match self.inner.phase.load(Ordering::SeqCst) {
            RUNNING => {
                self.inner.interrupted.store(true, Ordering::SeqCst);
                run.cancel();
                true
            }
            PENDING if !self.inner.recurring => {
                drop(run);
                self.cancel()
            }
            _ => false,
        }
    }

    /// Whether the current (or last) run was interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::SeqCst)
    }

    /// Whether the trigger was withdrawn.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the handle will never run again.
    pub fn is_done(&self) -> bool {
        self.inner.phase.load(Ordering::SeqCst) == DONE
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.inner.phase.load(Ordering::SeqCst) == RUNNING
    }

    /// Token of the current run.
    pub fn run_token(&self) -> CancellationToken {
        self.inner.run.lock().clone()
    }

    pub(crate) fn trigger_token(&self) -> CancellationToken {
        self.inner.trigger.clone()
    }

    /// Move from pending to running with a fresh run token.
    ///
    /// Returns `None` when the trigger was withdrawn in the meantime.
    pub(crate) fn begin_run(&self) -> Option<CancellationToken> {
        let mut run = self.inner.run.lock();
        if self.inner.recurring && self.is_cancelled() {
            return None;
        }
        self.inner
            .phase
            .compare_exchange(PENDING, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        self.inner.interrupted.store(false, Ordering::SeqCst);
        let token = CancellationToken::new();
        *run = token.clone();
        Some(token)
    }

    /// Leave the running phase.
    pub(crate) fn end_run(&self) {
        let _run = self.inner.run.lock();
        let next = if self.inner.recurring && !self.is_cancelled() {
            PENDING
        } else {
            DONE
        };
        self.inner.phase.store(next, Ordering::SeqCst);
    }

    /// Mark the handle as done for good.
    pub(crate) fn finish(&self) {
        self.inner.phase.store(DONE, Ordering::SeqCst);
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.inner.phase.load(Ordering::SeqCst) {
            PENDING => "pending",
            RUNNING => "running",
            _ => "done",
        };
        f.debug_struct("TaskHandle")
            .field("id", &self.inner.id)
            .field("recurring", &self.inner.recurring)
            .field("phase", &phase)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
