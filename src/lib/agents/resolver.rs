use tracing::{debug, warn};

use super::types::{AgentRecord, AgentState, ExecutorRecord, ResolveError, ResolveResult};
use crate::lib::client::types::{ControlPlane, Endpoint};
use crate::lib::config::types::AGENT_OPERATOR_API_PATH;
use crate::lib::tasks::filter::{Filter, FilterChain};
use crate::lib::tasks::paginator::{PageOptions, collect_tasks};
use crate::lib::tasks::types::{SortOrder, TaskRecord};

/// Page size used when scanning the master for a single task.
pub const LOOKUP_PAGE_LIMIT: usize = 100;

impl AgentRecord {
    pub fn fqdn(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

/// Scans every task on the master for `task_id`. The id must resolve to
/// tasks on a single agent.
pub async fn find_task<C>(client: &C, task_id: &str) -> ResolveResult<TaskRecord>
where
    C: ControlPlane + ?Sized,
{
    let opts = PageOptions {
        limit: LOOKUP_PAGE_LIMIT,
        max: usize::MAX,
        order: SortOrder::Desc,
    };
    let filters = FilterChain::new(vec![Filter::Id(task_id.to_string())]);
    let mut found = collect_tasks(client, opts, &filters).await?;

    let mut agents: Vec<&str> = found.iter().map(|t| t.agent_id.as_str()).collect();
    agents.sort_unstable();
    agents.dedup();
    match agents.len() {
        0 => Err(ResolveError::TaskNotFound(task_id.to_string())),
        1 => Ok(found.swap_remove(0)),
        n => Err(ResolveError::Ambiguous {
            task_id: task_id.to_string(),
            what: "agents",
            matches: n,
        }),
    }
}

/// Finds the agent running `task_id`. Agent records are always fetched
/// fresh from the master.
pub async fn resolve_agent<C>(client: &C, task_id: &str) -> ResolveResult<AgentRecord>
where
    C: ControlPlane + ?Sized,
{
    let task = find_task(client, task_id).await?;
    if task.state.is_terminal() {
        warn!(
            "task {} is {}, its sandbox may already be garbage collected",
            task.id, task.state
        );
    }
    let mut matching: Vec<AgentRecord> = client
        .list_agents()
        .await?
        .into_iter()
        .filter(|agent| agent.id == task.agent_id)
        .collect();

    match matching.len() {
        0 => Err(ResolveError::AgentNotFound(task.agent_id)),
        1 => Ok(matching.remove(0)),
        n => Err(ResolveError::Ambiguous {
            task_id: task_id.to_string(),
            what: "agent records",
            matches: n,
        }),
    }
}

/// Points a copy of the master endpoint at the agent's own operator API.
pub fn redirect_endpoint(master: &Endpoint, agent: &AgentRecord) -> ResolveResult<Endpoint> {
    let redirect_error = |reason: String| ResolveError::Redirect {
        agent: agent.id.clone(),
        reason,
    };

    let mut endpoint = master.clone();
    let url = endpoint.url_mut();
    url.set_host(Some(&agent.hostname))
        .map_err(|e| redirect_error(e.to_string()))?;
    url.set_port(Some(agent.port))
        .map_err(|_| redirect_error("endpoint cannot carry a port".to_string()))?;
    url.set_path(AGENT_OPERATOR_API_PATH);
    debug!(agent = %agent.id, url = %url, "redirected endpoint to agent");
    Ok(endpoint)
}

/// Linear scan for the executor that launched `task_id`.
pub fn find_executor<'a>(state: &'a AgentState, task_id: &str) -> Option<&'a ExecutorRecord> {
    state
        .executors
        .iter()
        .find(|executor| executor.id == task_id || executor.tasks.iter().any(|t| t == task_id))
}

/// Resolves the sandbox directory of a task on its agent.
pub async fn sandbox_directory<C>(
    client: &C,
    master: &Endpoint,
    task_id: &str,
) -> ResolveResult<String>
where
    C: ControlPlane + ?Sized,
{
    let agent = resolve_agent(client, task_id).await?;
    let endpoint = redirect_endpoint(master, &agent)?;
    let state = client.get_agent_state(endpoint).await?;
    find_executor(&state, task_id)
        .map(|executor| executor.directory.clone())
        .ok_or_else(|| ResolveError::ExecutorNotFound(task_id.to_string()))
}
