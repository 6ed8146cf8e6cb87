//! Static leadership signal.

use std::sync::atomic::{AtomicBool, Ordering};

use jobsched_protocols::LeaderSignal;

/// A [`LeaderSignal`] whose answer is set from outside, e.g. from
/// configuration or by an election component.
#[derive(Debug)]
pub struct StaticLeader {
    leader: AtomicBool,
}

impl StaticLeader {
    pub fn new(leader: bool) -> Self {
        Self {
            leader: AtomicBool::new(leader),
        }
    }

    pub fn set_leader(&self, leader: bool) {
        self.leader.store(leader, Ordering::SeqCst);
    }
}

impl Default for StaticLeader {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LeaderSignal for StaticLeader {
    fn is_leader(&self) -> bool {
        self.leader.load(Ordering::SeqCst)
    }
}
