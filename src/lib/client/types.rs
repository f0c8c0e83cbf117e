use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lib::agents::types::{AgentRecord, AgentState};
use crate::lib::tasks::types::{SortOrder, TaskInfo, TaskRecord};

/// Network location of an operator API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(pub(crate) Url);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskQuery {
    pub offset: usize,
    pub limit: usize,
    pub order: SortOrder,
}

/// Operator calls, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Call {
    GetTasks(TaskQuery),
    GetAgents,
    GetState,
    Launch { task_info: TaskInfo },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tasks {
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Agents {
    #[serde(default)]
    pub agents: Vec<AgentRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTasksResponse {
    pub get_tasks: Tasks,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAgentsResponse {
    pub get_agents: Agents,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetStateResponse {
    pub get_state: AgentState,
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("cannot decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type ClientResult<T> = Result<T, ClientError>;

/// The control-plane operations the CLI depends on.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// One page of tasks starting at `query.offset`.
    async fn list_tasks(&self, query: TaskQuery) -> ClientResult<Vec<TaskRecord>>;

    async fn list_agents(&self) -> ClientResult<Vec<AgentRecord>>;

    /// Fetches executor state from an agent. The endpoint is consumed.
    async fn get_agent_state(&self, agent: Endpoint) -> ClientResult<AgentState>;

    async fn submit_task(&self, task: &TaskInfo) -> ClientResult<()>;
}

#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    pub client: reqwest::Client,
    pub master: Endpoint,
    pub scheduler: Endpoint,
}
