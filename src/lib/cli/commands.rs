use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::table::{Table, truncate};
use super::types::{Cli, CliError, CliResult, Cmd, LocalCmd, PsArgs, RunArgs};
use crate::lib::agents::resolver::sandbox_directory;
use crate::lib::agents::types::{AgentRecord, ResolveError};
use crate::lib::client::types::{ControlPlane, HttpControlPlane};
use crate::lib::config::config::{default_config_path, load_profile};
use crate::lib::config::types::{ConfigError, Profile};
use crate::lib::local::types::{LocalCluster, LocalError, UpOptions};
use crate::lib::tasks::builder::{TaskBuilder, parse_key_value, parse_port, parse_volume};
use crate::lib::tasks::filter::{FilterChain, FilterOptions};
use crate::lib::tasks::paginator::{PageOptions, TaskStream};
use crate::lib::tasks::types::{Label, Parameter, TaskError, TaskInfo, TaskRecord, Variable};

pub const EXIT_USAGE: u8 = 1;
pub const EXIT_RUNTIME: u8 = 2;

impl CliError {
    /// 1 for anything the user can fix by changing the invocation, 2 for
    /// failures talking to the cluster or the container engine.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Config(
                ConfigError::Io { .. } | ConfigError::Parse { .. } | ConfigError::NoHomeDir,
            ) => EXIT_RUNTIME,
            CliError::Config(_) => EXIT_USAGE,
            CliError::Task(TaskError::Client(_) | TaskError::Aborted(_)) => EXIT_RUNTIME,
            CliError::Task(_) => EXIT_USAGE,
            CliError::Resolve(ResolveError::Ambiguous { .. }) => EXIT_USAGE,
            CliError::Resolve(_) | CliError::Client(_) | CliError::Local(_) => EXIT_RUNTIME,
        }
    }
}

pub async fn execute(cli: Cli) -> CliResult<()> {
    match cli.cmd {
        Cmd::Local { cmd } => local(cmd).await,
        cmd => {
            let path = match cli.config {
                Some(path) => path,
                None => default_config_path()?,
            };
            let profile =
                load_profile(&path, &cli.profile)?.with_master(cli.master.as_deref());
            debug!(profile = %cli.profile, master = %profile.master, "loaded profile");
            cluster(cmd, &profile).await
        }
    }
}

async fn cluster(cmd: Cmd, profile: &Profile) -> CliResult<()> {
    let client = Arc::new(HttpControlPlane::from_profile(profile)?);

    match cmd {
        Cmd::Ps(args) => {
            let (table, result) = ps(client, args).await?;
            print!("{table}");
            result
        }
        Cmd::Ls { id } => {
            let directory = sandbox_directory(client.as_ref(), &profile.endpoint()?, &id).await?;
            println!("{directory}");
            Ok(())
        }
        Cmd::Agents => {
            print!("{}", agents(client.as_ref()).await?);
            Ok(())
        }
        Cmd::Run(args) => {
            let task = run(client.as_ref(), profile, args).await?;
            println!("{}", task.task_id.value);
            Ok(())
        }
        Cmd::Local { cmd } => local(cmd).await,
    }
}

fn task_row(task: &TaskRecord) -> [String; 7] {
    [
        task.id.clone(),
        truncate(&task.framework_id, 8).to_string(),
        task.state.to_string(),
        task.resources.cpus.to_string(),
        task.resources.mem.to_string(),
        task.resources.gpus.to_string(),
        task.resources.disk.to_string(),
    ]
}

/// Streams matching tasks into a table. A failed listing still returns the
/// rows received before the failure alongside the error.
pub async fn ps<C>(client: Arc<C>, args: PsArgs) -> CliResult<(Table, CliResult<()>)>
where
    C: ControlPlane + 'static,
{
    let filters = FilterChain::build(&FilterOptions {
        name: args.name,
        all: args.all,
        running: args.running,
        failed: args.failed,
        killed: args.killed,
        finished: args.finished,
    })?;
    let opts = PageOptions::new(args.limit, args.max, args.order)?;

    let mut stream = TaskStream::spawn(client, opts, filters);
    let mut table = Table::new(["ID", "FRAMEWORK", "STATE", "CPUS", "MEM", "GPUS", "DISK"]);
    while let Some(task) = stream.next().await {
        table.add_row(task_row(&task));
    }

    let result = stream.finish().await;
    if let Err(err) = &result {
        warn!("task listing stopped after {} tasks: {}", table.len(), err);
    }
    Ok((table, result.map(|_| ()).map_err(CliError::from)))
}

fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, hours, mins, secs) = (secs / 86400, secs / 3600 % 24, secs / 60 % 60, secs % 60);
    if days > 0 {
        format!("{days}d{hours}h{mins}m{secs}s")
    } else if hours > 0 {
        format!("{hours}h{mins}m{secs}s")
    } else if mins > 0 {
        format!("{mins}m{secs}s")
    } else {
        format!("{secs}s")
    }
}

impl AgentRecord {
    pub fn uptime(&self, now: SystemTime) -> Duration {
        let now = now.duration_since(UNIX_EPOCH).unwrap_or_default();
        let registered = Duration::try_from_secs_f64(self.registered_time).unwrap_or_default();
        now.saturating_sub(registered)
    }
}

pub async fn agents<C>(client: &C) -> CliResult<Table>
where
    C: ControlPlane + ?Sized,
{
    let now = SystemTime::now();
    let mut table = Table::new([
        "ID", "FQDN", "VERSION", "UPTIME", "CPUS", "MEM", "GPUS", "DISK",
    ]);
    for agent in client.list_agents().await? {
        let (used, total) = (&agent.used_resources, &agent.resources);
        table.add_row([
            agent.id.clone(),
            agent.fqdn(),
            agent.version.clone(),
            format_uptime(agent.uptime(now)),
            format!("{:.2}/{:.2}", used.cpus, total.cpus),
            format!("{:.2}/{:.2}", used.mem, total.mem),
            format!("{:.2}/{:.2}", used.gpus, total.gpus),
            format!("{:.2}/{:.2}", used.disk, total.disk),
        ]);
    }
    Ok(table)
}

/// Translates `run` flags into builder options.
pub fn task_builder(base: TaskInfo, args: RunArgs) -> CliResult<TaskBuilder> {
    let mut builder = TaskBuilder::new(base)
        .arguments(args.args)
        .privileged(args.privileged)
        .force_pull(args.force_pull)
        .network(args.net);

    if let Some(name) = args.name {
        builder = builder.name(name);
    }
    if let Some(user) = args.user {
        builder = builder.user(user);
    }
    if let Some(cpus) = args.cpus {
        builder = builder.cpus(cpus);
    }
    if let Some(mem) = args.mem {
        builder = builder.mem(mem);
    }
    if let Some(disk) = args.disk {
        builder = builder.disk(disk);
    }
    if let Some(shell) = args.shell {
        builder = builder.shell(shell);
    }
    if let Some(path) = args.task_file {
        builder = builder.task_file(path);
    }
    if let Some(image) = args.image {
        builder = builder.image(image);
    }
    for port in &args.ports {
        builder = builder.port(parse_port(port)?);
    }
    for volume in &args.volumes {
        builder = builder.volume(parse_volume(volume)?);
    }
    for param in &args.params {
        let (key, value) = parse_key_value("param", param)?;
        builder = builder.parameter(Parameter { key, value });
    }
    for env in &args.envs {
        let (name, value) = parse_key_value("env", env)?;
        builder = builder.env(Variable { name, value });
    }
    for label in &args.labels {
        let (key, value) = parse_key_value("label", label)?;
        builder = builder.label(Label { key, value });
    }
    Ok(builder)
}

/// Builds a task on top of the profile's default and submits it.
pub async fn run<C>(client: &C, profile: &Profile, args: RunArgs) -> CliResult<TaskInfo>
where
    C: ControlPlane + ?Sized,
{
    let task = task_builder(profile.task_info(), args)?.build()?;
    debug!(
        task_id = %task.task_id.value,
        cpus = task.scalar("cpus").unwrap_or_default(),
        mem = task.scalar("mem").unwrap_or_default(),
        "submitting task"
    );
    client.submit_task(&task).await?;
    Ok(task)
}

async fn local(cmd: LocalCmd) -> CliResult<()> {
    let cluster = LocalCluster::new()?;
    match cmd {
        LocalCmd::Up { remove, force } => {
            let id = cluster
                .up(UpOptions {
                    remove,
                    force_pull: force,
                })
                .await?;
            println!("{id}");
        }
        LocalCmd::Down => {
            let id = cluster.down().await?;
            println!("stopped container {id}");
        }
        LocalCmd::Status => match cluster.container().await? {
            Some(container) => println!("{}: {}", container.id, container.state),
            None => println!("{}", LocalError::NoContainer),
        },
        LocalCmd::Rm => {
            let id = cluster.rm().await?;
            println!("removed container {id}");
        }
    }
    Ok(())
}
