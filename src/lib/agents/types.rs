use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lib::client::types::ClientError;
use crate::lib::tasks::types::ResourceUsage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub hostname: String,
    pub port: u16,
    #[serde(default)]
    pub version: String,
    /// Seconds since the epoch at which the agent registered.
    #[serde(default)]
    pub registered_time: f64,
    #[serde(default)]
    pub resources: ResourceUsage,
    #[serde(default)]
    pub used_resources: ResourceUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutorRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Sandbox path on the agent's filesystem.
    pub directory: String,
    /// Tasks launched through this executor.
    #[serde(default)]
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    #[serde(default)]
    pub executors: Vec<ExecutorRecord>,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no task found with id {0}")]
    TaskNotFound(String),
    #[error("no agent found with id {0}")]
    AgentNotFound(String),
    #[error("task {task_id} is ambiguous: {matches} matching {what}")]
    Ambiguous {
        task_id: String,
        what: &'static str,
        matches: usize,
    },
    #[error("could not resolve executor for task {0}")]
    ExecutorNotFound(String),
    #[error("cannot redirect to agent {agent}: {reason}")]
    Redirect { agent: String, reason: String },
    #[error(transparent)]
    Client(#[from] ClientError),
}

pub type ResolveResult<T> = Result<T, ResolveError>;
