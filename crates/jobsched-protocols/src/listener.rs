//! Run completion listener.

use async_trait::async_trait;

use crate::configuration::JobConfiguration;

/// Called by the engine after every run finished its cleanup.
///
/// This is the contract through which queue advancement or persistence of
/// run state can be attached. The configuration carries the updated run
/// state (`last_executed_status`, `last_finished`).
#[async_trait]
pub trait RunListener: Send + Sync {
    async fn on_run_finished(&self, configuration: &JobConfiguration);
}
