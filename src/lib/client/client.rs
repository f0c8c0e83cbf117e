use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{
    Call, ClientError, ClientResult, ControlPlane, Endpoint, GetAgentsResponse, GetStateResponse,
    GetTasksResponse, HttpControlPlane, TaskQuery,
};
use crate::lib::agents::types::{AgentRecord, AgentState};
use crate::lib::config::types::{ConfigResult, Profile};
use crate::lib::tasks::types::{TaskInfo, TaskRecord};

impl Endpoint {
    pub fn new(url: Url) -> Self {
        Endpoint(url)
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub(crate) fn url_mut(&mut self) -> &mut Url {
        &mut self.0
    }
}

impl HttpControlPlane {
    pub fn new(master: Endpoint, scheduler: Endpoint) -> Self {
        HttpControlPlane {
            client: reqwest::Client::new(),
            master,
            scheduler,
        }
    }

    pub fn from_profile(profile: &Profile) -> ConfigResult<Self> {
        Ok(Self::new(profile.endpoint()?, profile.scheduler_endpoint()?))
    }

    async fn send(&self, endpoint: &Endpoint, call: &Call) -> ClientResult<String> {
        let url = endpoint.url().to_string();
        debug!(
            url = %url,
            body = %serde_json::to_string(call).unwrap_or_default(),
            "http request"
        );

        let response = self
            .client
            .post(endpoint.url().clone())
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(call)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        debug!(url = %url, status = status.as_u16(), "http response");

        if !status.is_success() {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn call<T: DeserializeOwned>(&self, endpoint: &Endpoint, call: &Call) -> ClientResult<T> {
        let body = self.send(endpoint, call).await?;
        serde_json::from_str(&body).map_err(|source| ClientError::Decode {
            url: endpoint.url().to_string(),
            source,
        })
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn list_tasks(&self, query: TaskQuery) -> ClientResult<Vec<TaskRecord>> {
        let resp: GetTasksResponse = self.call(&self.master, &Call::GetTasks(query)).await?;
        Ok(resp.get_tasks.tasks)
    }

    async fn list_agents(&self) -> ClientResult<Vec<AgentRecord>> {
        let resp: GetAgentsResponse = self.call(&self.master, &Call::GetAgents).await?;
        Ok(resp.get_agents.agents)
    }

    async fn get_agent_state(&self, agent: Endpoint) -> ClientResult<AgentState> {
        let resp: GetStateResponse = self.call(&agent, &Call::GetState).await?;
        Ok(resp.get_state)
    }

    async fn submit_task(&self, task: &TaskInfo) -> ClientResult<()> {
        let call = Call::Launch {
            task_info: task.clone(),
        };
        self.send(&self.scheduler, &call).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
    use serde_json::{Value, json};
    use tokio::net::TcpListener;

    use super::*;
    use crate::lib::tasks::types::{SortOrder, TaskState};

    type Seen = Arc<Mutex<Vec<Call>>>;

    async fn master(State(seen): State<Seen>, Json(call): Json<Call>) -> (StatusCode, Json<Value>) {
        seen.lock().unwrap().push(call.clone());
        match call {
            Call::GetTasks(query) => {
                let tasks: Vec<Value> = (query.offset..query.offset + query.limit)
                    .map(|i| {
                        json!({
                            "id": format!("task-{i}"),
                            "name": "web",
                            "framework_id": "fw-1",
                            "slave_id": "agent-1",
                            "state": "TASK_RUNNING",
                            "resources": {"cpus": 0.5, "mem": 128.0}
                        })
                    })
                    .collect();
                (StatusCode::OK, Json(json!({"type": "GET_TASKS", "get_tasks": {"tasks": tasks}})))
            }
            Call::GetAgents => (
                StatusCode::OK,
                Json(json!({"get_agents": {"agents": [
                    {"id": "agent-1", "hostname": "127.0.0.1", "port": 5051, "version": "1.11.0"}
                ]}})),
            ),
            Call::Launch { .. } => (StatusCode::ACCEPTED, Json(json!({}))),
            Call::GetState => (StatusCode::BAD_REQUEST, Json(json!({"error": "not an agent"}))),
        }
    }

    async fn agent(Json(call): Json<Call>) -> (StatusCode, Json<Value>) {
        assert_eq!(call, Call::GetState);
        (
            StatusCode::OK,
            Json(json!({"get_state": {"executors": [
                {"id": "task-1", "directory": "/var/lib/mesos/slaves/agent-1/task-1"}
            ]}})),
        )
    }

    async fn serve() -> (SocketAddr, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/api/v1", post(master))
            .route("/api/v1/scheduler", post(master))
            .route("/slave(1)/api/v1", post(agent))
            .with_state(seen.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (addr, seen)
    }

    fn plane(addr: SocketAddr) -> HttpControlPlane {
        let profile = Profile::default().with_master(Some(&format!("http://{addr}")));
        HttpControlPlane::from_profile(&profile).unwrap()
    }

    #[tokio::test]
    async fn list_tasks_sends_page_query() {
        let (addr, seen) = serve().await;
        let query = TaskQuery {
            offset: 4,
            limit: 2,
            order: SortOrder::Asc,
        };

        let tasks = plane(addr).list_tasks(query).await.unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "task-4");
        assert_eq!(tasks[0].agent_id, "agent-1");
        assert_eq!(tasks[0].state, TaskState::Running);
        assert_eq!(tasks[0].resources.mem, 128.0);
        assert_eq!(seen.lock().unwrap().as_slice(), &[Call::GetTasks(query)]);
    }

    #[tokio::test]
    async fn list_agents_decodes_records() {
        let (addr, _) = serve().await;
        let agents = plane(addr).list_agents().await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].fqdn(), "127.0.0.1:5051");
    }

    #[tokio::test]
    async fn agent_state_is_fetched_from_the_given_endpoint() {
        let (addr, _) = serve().await;
        let mut url = Url::parse(&format!("http://{addr}")).unwrap();
        url.set_path("/slave(1)/api/v1");

        let state = plane(addr).get_agent_state(Endpoint::new(url)).await.unwrap();
        assert_eq!(state.executors.len(), 1);
        assert_eq!(state.executors[0].directory, "/var/lib/mesos/slaves/agent-1/task-1");
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let (addr, _) = serve().await;
        let mut url = Url::parse(&format!("http://{addr}")).unwrap();
        url.set_path("/api/v1");

        let err = plane(addr).get_agent_state(Endpoint::new(url)).await.unwrap_err();
        match err {
            ClientError::Status { status, body, .. } => {
                assert_eq!(status, 400);
                assert!(body.contains("not an agent"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn submit_posts_launch_to_scheduler() {
        let (addr, seen) = serve().await;
        let task = TaskInfo::default();

        plane(addr).submit_task(&task).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(
            &seen[0],
            Call::Launch { task_info } if task_info.task_id == task.task_id
        ));
    }

    #[tokio::test]
    async fn unreachable_master_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = plane(addr).list_agents().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }));
    }
}
