//! Leadership signal.

/// Externally supplied answer to "am I the active leader".
///
/// Jobs are leader-only: only the elected node is expected to schedule
/// them. The election algorithm itself lives outside the engine.
pub trait LeaderSignal: Send + Sync {
    fn is_leader(&self) -> bool;
}
