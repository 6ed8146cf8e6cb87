//! The default scheduling manager.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use jobsched_core::{
    JobRegistry, MemoryClusterCache, RecordingJobProgress, TracingNotifier, next_execution_time,
    parse_cron,
};
use jobsched_protocols::{
    ClusterCache, JobConfiguration, JobStatus, JobType, Notifier, Progress, RunListener,
    SchedulingType,
};

use crate::cluster_state::{ClusterJobState, later_completed};
use crate::error::EngineError;
use crate::handle::TaskHandle;
use crate::heartbeat;
use crate::manager::SchedulingManager;
use crate::task_scheduler::{TaskScheduler, TokioTaskScheduler, Trigger};

const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// A run in progress on this node.
pub(crate) struct ActiveRun {
    pub(crate) uid: String,
    pub(crate) progress: Arc<RecordingJobProgress>,
}

/// Shared engine state.
pub(crate) struct EngineInner {
    pub(crate) node_id: String,
    pub(crate) scheduler: Arc<dyn TaskScheduler>,
    pub(crate) registry: Arc<JobRegistry>,
    pub(crate) cluster: ClusterJobState,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) listeners: Vec<Arc<dyn RunListener>>,
    pub(crate) heartbeat_interval: Duration,
    /// Pending trigger per job type.
    pub(crate) scheduled: DashMap<JobType, TaskHandle>,
    /// In-flight run per job type.
    pub(crate) running: DashMap<JobType, TaskHandle>,
    pub(crate) active: DashMap<JobType, ActiveRun>,
    pub(crate) completed: DashMap<JobType, Progress>,
    /// Run-state view by configuration uid.
    pub(crate) configurations: DashMap<String, JobConfiguration>,
    pub(crate) shutdown: CancellationToken,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
}

impl EngineInner {
    /// Record a configuration's definition, keeping known run state.
    pub(crate) fn remember(&self, configuration: &JobConfiguration) {
        if !configuration.has_identity() {
            return;
        }
        self.configurations
            .entry(configuration.uid.clone())
            .and_modify(|known| known.update_definition(configuration))
            .or_insert_with(|| configuration.clone());
    }

    /// Latest known state of a configuration.
    pub(crate) fn current(&self, configuration: &JobConfiguration) -> JobConfiguration {
        self.configurations
            .get(&configuration.uid)
            .map(|c| c.clone())
            .unwrap_or_else(|| configuration.clone())
    }

    /// Apply `update` to the run-state view of `uid`.
    pub(crate) fn update_state(&self, uid: &str, update: impl FnOnce(&mut JobConfiguration)) {
        if let Some(mut configuration) = self.configurations.get_mut(uid) {
            update(&mut configuration);
        }
    }

    pub(crate) async fn cluster_running(&self, job_type: JobType) -> bool {
        match self.cluster.is_running(job_type).await {
            Ok(running) => running,
            Err(e) => {
                warn!(job_type = %job_type, "Failed to read cluster running state: {}", e);
                false
            }
        }
    }

    fn local_running(&self, job_type: JobType) -> bool {
        self.running.get(&job_type).is_some_and(|h| !h.is_done())
    }

    /// Install `trigger` as the pending trigger of the configuration's type.
    fn install(self: &Arc<Self>, configuration: &JobConfiguration, trigger: Trigger) -> bool {
        let job_type = configuration.job_type;
        self.remember(configuration);
        let (task, handshake) = self.prepare(configuration.clone());

        let handle = match self.scheduled.entry(job_type) {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.get();
                if !previous.cancel() && !previous.is_done() {
                    debug!(
                        job_type = %job_type,
                        uid = %configuration.uid,
                        "Previous trigger already started, dropping replacement"
                    );
                    return false;
                }
                let handle = self.scheduler.schedule(trigger, task);
                occupied.insert(handle.clone());
                handle
            }
            Entry::Vacant(vacant) => {
                let handle = self.scheduler.schedule(trigger, task);
                vacant.insert(handle.clone());
                handle
            }
        };
        let _ = handshake.send(handle);

        self.update_state(&configuration.uid, |c| {
            if c.job_status != JobStatus::Running {
                c.job_status = JobStatus::Scheduled;
            }
        });
        debug!(job_type = %job_type, uid = %configuration.uid, "Trigger installed");
        true
    }

    fn stop_type(&self, job_type: JobType) -> bool {
        match self.running.get(&job_type) {
            None => true,
            Some(handle) => handle.is_done() || handle.interrupt(),
        }
    }
}

/// The scheduling engine.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct DefaultSchedulingManager {
    pub(crate) inner: Arc<EngineInner>,
}

impl DefaultSchedulingManager {
    pub fn builder() -> SchedulingEngineBuilder {
        SchedulingEngineBuilder::new()
    }

    pub fn node_id(&self) -> &str {
        &self.inner.node_id
    }

    /// Run-state snapshot of a configuration seen by this engine.
    pub fn configuration(&self, uid: &str) -> Option<JobConfiguration> {
        self.inner.configurations.get(uid).map(|c| c.clone())
    }

    /// Start the periodic heartbeat. Calling it again has no effect.
    pub fn start(&self) {
        let mut slot = self.inner.heartbeat.lock();
        if slot.is_none() {
            *slot = Some(heartbeat::spawn(self.inner.clone()));
            info!(
                node_id = %self.inner.node_id,
                interval_secs = self.inner.heartbeat_interval.as_secs(),
                "Scheduling engine started"
            );
        }
    }

    /// Run one heartbeat cycle now.
    pub async fn run_heartbeat(&self) {
        heartbeat::beat(&self.inner).await;
    }

    /// Stop the heartbeat, withdraw every pending trigger and request
    /// cancellation of every run in progress.
    pub async fn shutdown(&self) {
        self.inner.shutdown.cancel();

        for entry in self.inner.scheduled.iter() {
            entry.value().cancel();
        }
        self.inner.scheduled.clear();

        for entry in self.inner.running.iter() {
            if entry.value().interrupt() {
                info!(job_type = %entry.key(), "Cancelling running job for shutdown");
            }
        }

        let heartbeat = self.inner.heartbeat.lock().take();
        if let Some(heartbeat) = heartbeat {
            if let Err(e) = heartbeat.await {
                warn!("Heartbeat task ended abnormally: {}", e);
            }
        }
        info!(node_id = %self.inner.node_id, "Scheduling engine stopped");
    }
}

#[async_trait]
impl SchedulingManager for DefaultSchedulingManager {
    async fn schedule(&self, configuration: &JobConfiguration) -> bool {
        if !configuration.enabled {
            debug!(uid = %configuration.uid, "Configuration disabled, not scheduling");
            return false;
        }
        if configuration.is_queue_follower() {
            debug!(uid = %configuration.uid, "Queue follower runs after its predecessor, not scheduling");
            return false;
        }

        let known = self.inner.current(configuration);
        let mut effective = configuration.clone();
        effective.last_executed = known.last_executed.or(configuration.last_executed);

        let Some(first) = next_execution_time(&effective, Utc::now()) else {
            debug!(uid = %configuration.uid, "No next execution time, not scheduling");
            return false;
        };

        let trigger = match configuration.scheduling_type {
            SchedulingType::Cron => {
                let Some(expression) = configuration.defined_cron_expression() else {
                    return false;
                };
                match parse_cron(expression) {
                    Ok(schedule) => Trigger::Cron(schedule),
                    Err(e) => {
                        warn!(uid = %configuration.uid, "Invalid cron expression '{}': {}", expression, e);
                        return false;
                    }
                }
            }
            SchedulingType::FixedDelay => {
                let Some(delay) = configuration.defined_delay() else {
                    return false;
                };
                Trigger::FixedDelay {
                    initial: first,
                    delay: Duration::from_secs(delay.unsigned_abs()),
                }
            }
            SchedulingType::OnceAsap => Trigger::At(first),
        };

        self.inner.install(configuration, trigger)
    }

    async fn schedule_with_start_time(
        &self,
        configuration: &JobConfiguration,
        start_time: DateTime<Utc>,
    ) -> bool {
        if !configuration.enabled {
            debug!(uid = %configuration.uid, "Configuration disabled, not scheduling");
            return false;
        }
        self.inner.install(configuration, Trigger::At(start_time))
    }

    async fn unschedule(&self, configuration: &JobConfiguration) -> bool {
        let job_type = configuration.job_type;
        match self.inner.scheduled.remove(&job_type) {
            Some((_, handle)) => {
                let withdrawn = handle.cancel();
                if withdrawn {
                    self.inner.update_state(&configuration.uid, |c| {
                        if c.job_status == JobStatus::Scheduled {
                            c.job_status = c.last_executed_status;
                        }
                    });
                }
                debug!(job_type = %job_type, withdrawn, "Trigger removed");
                withdrawn
            }
            None => false,
        }
    }

    async fn stop(&self, configuration: &JobConfiguration) -> bool {
        if !configuration.has_identity() {
            return false;
        }
        self.inner.stop_type(configuration.job_type)
    }

    async fn is_scheduled(&self, configuration: &JobConfiguration) -> bool {
        self.inner
            .scheduled
            .get(&configuration.job_type)
            .is_some_and(|h| !h.is_done() && !h.is_cancelled())
    }

    async fn execute_now(&self, configuration: &JobConfiguration) -> bool {
        let job_type = configuration.job_type;
        if self.is_running(job_type).await {
            debug!(job_type = %job_type, "Already running, not executing now");
            return false;
        }
        self.inner.remember(configuration);
        let (task, handshake) = self.inner.prepare(configuration.clone());
        let handle = self.inner.scheduler.execute(task);
        let _ = handshake.send(handle);
        true
    }

    async fn cancel(&self, job_type: JobType) -> bool {
        if !self.is_running(job_type).await {
            return false;
        }
        if let Err(e) = self.inner.cluster.request_cancel(job_type).await {
            warn!(job_type = %job_type, "Failed to publish cancellation request: {}", e);
        }
        if let Some(handle) = self.inner.running.get(&job_type) {
            handle.interrupt();
        }
        info!(job_type = %job_type, "Cancellation requested");
        true
    }

    async fn is_running(&self, job_type: JobType) -> bool {
        self.inner.local_running(job_type) || self.inner.cluster_running(job_type).await
    }

    async fn running_types(&self) -> BTreeSet<JobType> {
        let mut types: BTreeSet<JobType> = self.inner.running.iter().map(|e| *e.key()).collect();
        match self.inner.cluster.running_types().await {
            Ok(remote) => types.extend(remote),
            Err(e) => warn!("Failed to read cluster running types: {}", e),
        }
        types
    }

    async fn completed_types(&self) -> BTreeSet<JobType> {
        let mut types: BTreeSet<JobType> = self.inner.completed.iter().map(|e| *e.key()).collect();
        match self.inner.cluster.completed_types().await {
            Ok(remote) => types.extend(remote),
            Err(e) => warn!("Failed to read cluster completed types: {}", e),
        }
        types
    }

    async fn running_progress(&self, job_type: JobType) -> Option<Progress> {
        if let Some(run) = self.inner.active.get(&job_type) {
            return Some(run.progress.snapshot());
        }
        match self.inner.cluster.running_record(job_type).await {
            Ok(record) => record.map(|r| r.progress),
            Err(e) => {
                warn!(job_type = %job_type, "Failed to read cluster running progress: {}", e);
                None
            }
        }
    }

    async fn completed_progress(&self, job_type: JobType) -> Option<Progress> {
        let local = self.inner.completed.get(&job_type).map(|p| p.clone());
        let remote = match self.inner.cluster.completed_record(job_type).await {
            Ok(record) => record.map(|r| r.progress),
            Err(e) => {
                warn!(job_type = %job_type, "Failed to read cluster completed progress: {}", e);
                None
            }
        };
        later_completed(local, remote)
    }
}

/// Builder for [`DefaultSchedulingManager`].
pub struct SchedulingEngineBuilder {
    node_id: Option<String>,
    cache: Option<Arc<dyn ClusterCache>>,
    registry: Arc<JobRegistry>,
    notifier: Arc<dyn Notifier>,
    scheduler: Option<Arc<dyn TaskScheduler>>,
    listeners: Vec<Arc<dyn RunListener>>,
    heartbeat_interval: Duration,
}

impl SchedulingEngineBuilder {
    pub fn new() -> Self {
        Self {
            node_id: None,
            cache: None,
            registry: Arc::new(JobRegistry::new()),
            notifier: Arc::new(TracingNotifier),
            scheduler: None,
            listeners: Vec::new(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        }
    }

    pub fn node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }

    /// Shared cluster cache. Defaults to a private in-memory cache.
    pub fn cluster_cache(mut self, cache: Arc<dyn ClusterCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn registry(mut self, registry: Arc<JobRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Trigger scheduler. Defaults to the current tokio runtime.
    pub fn task_scheduler(mut self, scheduler: Arc<dyn TaskScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn listener(mut self, listener: Arc<dyn RunListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn build(self) -> Result<DefaultSchedulingManager, EngineError> {
        if self.heartbeat_interval.is_zero() {
            return Err(EngineError::InvalidConfiguration(
                "heartbeat interval must be greater than 0".to_string(),
            ));
        }
        let scheduler: Arc<dyn TaskScheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(TokioTaskScheduler::current()?),
        };
        let node_id = self
            .node_id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let cache: Arc<dyn ClusterCache> = match self.cache {
            Some(cache) => cache,
            None => Arc::new(MemoryClusterCache::with_ttl(self.heartbeat_interval * 3)),
        };

        Ok(DefaultSchedulingManager {
            inner: Arc::new(EngineInner {
                cluster: ClusterJobState::new(cache, node_id.clone()),
                node_id,
                scheduler,
                registry: self.registry,
                notifier: self.notifier,
                listeners: self.listeners,
                heartbeat_interval: self.heartbeat_interval,
                scheduled: DashMap::new(),
                running: DashMap::new(),
                active: DashMap::new(),
                completed: DashMap::new(),
                configurations: DashMap::new(),
                shutdown: CancellationToken::new(),
                heartbeat: Mutex::new(None),
            }),
        })
    }
}

impl Default for SchedulingEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
