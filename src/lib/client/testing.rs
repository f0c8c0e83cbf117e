//! In-memory control plane for tests.
//!
//! Tasks are served in pages straight out of a vector, so a test controls
//! exactly what each `list_tasks` call sees. Every call is recorded.

use std::sync::Mutex;

use async_trait::async_trait;

use super::types::{Call, ClientError, ClientResult, ControlPlane, Endpoint, TaskQuery};
use crate::lib::agents::types::{AgentRecord, AgentState};
use crate::lib::tasks::types::{ResourceUsage, TaskInfo, TaskRecord, TaskState};

#[derive(Default)]
pub struct FakeControlPlane {
    pub tasks: Vec<TaskRecord>,
    pub agents: Vec<AgentRecord>,
    pub state: AgentState,
    /// `list_tasks` fails once this many pages have been served.
    pub fail_after_pages: Option<usize>,
    /// Serve every `list_tasks` call from the start of the list.
    pub ignore_offset: bool,
    pub calls: Mutex<Vec<Call>>,
    pub agent_endpoints: Mutex<Vec<Endpoint>>,
}

impl FakeControlPlane {
    pub fn with_tasks(tasks: Vec<TaskRecord>) -> Self {
        FakeControlPlane {
            tasks,
            ..Default::default()
        }
    }

    pub fn task_fetches(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, Call::GetTasks(_)))
            .count()
    }

    pub fn submitted(&self) -> Vec<TaskInfo> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                Call::Launch { task_info } => Some(task_info.clone()),
                _ => None,
            })
            .collect()
    }
}

pub fn task(id: &str, name: &str, state: TaskState) -> TaskRecord {
    TaskRecord {
        id: id.to_string(),
        name: name.to_string(),
        framework_id: "framework-0001".to_string(),
        agent_id: "agent-1".to_string(),
        state,
        resources: ResourceUsage {
            cpus: 0.1,
            mem: 32.0,
            gpus: 0.0,
            disk: 0.0,
        },
    }
}

pub fn agent(id: &str, hostname: &str, port: u16) -> AgentRecord {
    AgentRecord {
        id: id.to_string(),
        hostname: hostname.to_string(),
        port,
        version: "1.11.0".to_string(),
        registered_time: 0.0,
        resources: ResourceUsage::default(),
        used_resources: ResourceUsage::default(),
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn list_tasks(&self, query: TaskQuery) -> ClientResult<Vec<TaskRecord>> {
        let served = self.task_fetches();
        self.calls.lock().unwrap().push(Call::GetTasks(query));
        if self.fail_after_pages.is_some_and(|limit| served >= limit) {
            return Err(ClientError::Status {
                url: "fake://master/api/v1".to_string(),
                status: 503,
                body: "master unavailable".to_string(),
            });
        }
        Ok(self
            .tasks
            .iter()
            .skip(if self.ignore_offset { 0 } else { query.offset })
            .take(query.limit)
            .cloned()
            .collect())
    }

    async fn list_agents(&self) -> ClientResult<Vec<AgentRecord>> {
        self.calls.lock().unwrap().push(Call::GetAgents);
        Ok(self.agents.clone())
    }

    async fn get_agent_state(&self, agent: Endpoint) -> ClientResult<AgentState> {
        self.calls.lock().unwrap().push(Call::GetState);
        self.agent_endpoints.lock().unwrap().push(agent);
        Ok(self.state.clone())
    }

    async fn submit_task(&self, task: &TaskInfo) -> ClientResult<()> {
        self.calls.lock().unwrap().push(Call::Launch {
            task_info: task.clone(),
        });
        Ok(())
    }
}
