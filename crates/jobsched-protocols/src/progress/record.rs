//! Hierarchical progress record.
//!
//! A [`Progress`] is an append-only sequence of processes, each holding
//! stages, each holding work items. Appending and closing nodes happens
//! strictly in event order; a node is never reopened.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::sink::FailurePolicy;

/// Status of a process, stage or work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    Running,
    Success,
    Error,
    Cancelled,
}

/// State shared by every level of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub description: String,
    pub status: NodeStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl NodeState {
    fn start(description: &str, now: DateTime<Utc>) -> Self {
        Self {
            description: description.to_string(),
            status: NodeStatus::Running,
            started_at: now,
            completed_at: None,
            summary: None,
            error: None,
        }
    }

    /// Whether the node reached a terminal status.
    pub fn is_complete(&self) -> bool {
        self.status != NodeStatus::Running
    }

    fn close(&mut self, status: NodeStatus, now: DateTime<Utc>) {
        if !self.is_complete() {
            self.status = status;
            self.completed_at = Some(now);
        }
    }
}

/// A single unit of work inside a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(flatten)]
    pub node: NodeState,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

/// A step of a process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(flatten)]
    pub node: NodeState,
    /// Declared number of work items, if known up front.
    #[serde(default)]
    pub total_items: Option<usize>,
    #[serde(default)]
    pub on_failure: FailurePolicy,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Stage {
    fn open_item(&mut self) -> Option<&mut Item> {
        self.items.last_mut().filter(|i| !i.node.is_complete())
    }

    fn close(&mut self, status: NodeStatus, now: DateTime<Utc>) {
        if let Some(item) = self.open_item() {
            item.node.close(status, now);
        }
        self.node.close(status, now);
    }
}

/// One run of a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    #[serde(flatten)]
    pub node: NodeState,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub stages: Vec<Stage>,
}

impl Process {
    fn open_stage(&mut self) -> Option<&mut Stage> {
        self.stages.last_mut().filter(|s| !s.node.is_complete())
    }

    fn close(&mut self, status: NodeStatus, now: DateTime<Utc>) {
        if let Some(stage) = self.open_stage() {
            stage.close(status, now);
        }
        self.node.close(status, now);
    }
}

/// Append-only progress log of a job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub sequence: Vec<Process>,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Start time of the first process.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.sequence.first().map(|p| p.node.started_at)
    }

    /// Completion time: the timestamp of the terminal event of the last
    /// process, `None` while it is still running.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.sequence.last().and_then(|p| p.node.completed_at)
    }

    /// Whether the last process reached a terminal status.
    pub fn is_complete(&self) -> bool {
        self.sequence.last().is_some_and(|p| p.node.is_complete())
    }

    /// Status of the last process.
    pub fn status(&self) -> Option<NodeStatus> {
        self.sequence.last().map(|p| p.node.status)
    }

    /// The running process, if any.
    pub fn open_process(&mut self) -> Option<&mut Process> {
        self.sequence.last_mut().filter(|p| !p.node.is_complete())
    }

    /// The running stage of the running process, if any.
    pub fn open_stage(&mut self) -> Option<&mut Stage> {
        self.open_process().and_then(|p| p.open_stage())
    }

    /// The running work item, if any.
    pub fn open_item(&mut self) -> Option<&mut Item> {
        self.open_stage().and_then(|s| s.open_item())
    }

    pub fn start_process(
        &mut self,
        description: &str,
        job_id: Option<String>,
        user_id: Option<String>,
        now: DateTime<Utc>,
    ) {
        // a new process implicitly completes an unfinished predecessor
        if let Some(previous) = self.open_process() {
            previous.close(NodeStatus::Success, now);
        }
        self.sequence.push(Process {
            node: NodeState::start(description, now),
            job_id,
            user_id,
            stages: Vec::new(),
        });
    }

    pub fn complete_process(&mut self, summary: Option<&str>, now: DateTime<Utc>) {
        if let Some(process) = self.open_process() {
            process.close(NodeStatus::Success, now);
            process.node.summary = summary.map(str::to_string);
        }
    }

    pub fn fail_process(&mut self, error: &str, now: DateTime<Utc>) {
        if let Some(process) = self.open_process() {
            process.close(NodeStatus::Error, now);
            process.node.error = Some(error.to_string());
        }
    }

    /// Mark every open node as cancelled.
    pub fn cancel_process(&mut self, now: DateTime<Utc>) {
        if let Some(process) = self.open_process() {
            process.close(NodeStatus::Cancelled, now);
        }
    }

    /// Start a stage in the running process.
    ///
    /// Returns `false` when there is no running process to attach it to.
    pub fn start_stage(
        &mut self,
        description: &str,
        total_items: Option<usize>,
        on_failure: FailurePolicy,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(process) = self.open_process() else {
            return false;
        };
        if let Some(previous) = process.open_stage() {
            previous.close(NodeStatus::Success, now);
        }
        process.stages.push(Stage {
            node: NodeState::start(description, now),
            total_items,
            on_failure,
            items: Vec::new(),
        });
        true
    }

    pub fn complete_stage(&mut self, summary: Option<&str>, now: DateTime<Utc>) {
        if let Some(stage) = self.open_stage() {
            stage.close(NodeStatus::Success, now);
            stage.node.summary = summary.map(str::to_string);
        }
    }

    pub fn fail_stage(&mut self, error: &str, now: DateTime<Utc>) {
        if let Some(stage) = self.open_stage() {
            stage.close(NodeStatus::Error, now);
            stage.node.error = Some(error.to_string());
        }
    }

    /// Start a work item in the running stage.
    ///
    /// Returns `false` when there is no running stage to attach it to.
    pub fn start_item(&mut self, description: &str, on_failure: FailurePolicy, now: DateTime<Utc>) -> bool {
        let Some(stage) = self.open_stage() else {
            return false;
        };
        if let Some(previous) = stage.open_item() {
            previous.node.close(NodeStatus::Success, now);
        }
        stage.items.push(Item {
            node: NodeState::start(description, now),
            on_failure,
        });
        true
    }

    pub fn complete_item(&mut self, summary: Option<&str>, now: DateTime<Utc>) {
        if let Some(item) = self.open_item() {
            item.node.close(NodeStatus::Success, now);
            item.node.summary = summary.map(str::to_string);
        }
    }

    pub fn fail_item(&mut self, error: &str, now: DateTime<Utc>) {
        if let Some(item) = self.open_item() {
            item.node.close(NodeStatus::Error, now);
            item.node.error = Some(error.to_string());
        }
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
