use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use crate::lib::agents::types::ResolveError;
use crate::lib::client::types::ClientError;
use crate::lib::config::types::{ConfigError, DEFAULT_PROFILE};
use crate::lib::local::types::LocalError;
use crate::lib::tasks::types::{NetworkMode, SortOrder, TaskError};

#[derive(Debug, Parser)]
#[command(name = "mesos-cli", version, about = "Operator client for a Mesos cluster")]
pub struct Cli {
    /// Mesos master, overrides the profile, e.g. http://127.0.0.1:5050
    #[arg(long, global = true)]
    pub master: Option<String>,

    /// Profile to load from the config file.
    #[arg(long, global = true, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// Config file, defaults to ~/.mesos-cli.json
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log HTTP requests and other details to stderr.
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Debug, Subcommand)]
pub enum Cmd {
    /// List tasks
    Ps(PsArgs),
    /// Print the sandbox directory of a task
    Ls {
        /// Task to list
        id: String,
    },
    /// List agents
    Agents,
    /// Run a task on the cluster
    #[command(visible_alias = "exec", args_override_self = true)]
    Run(RunArgs),
    /// Manage a single node cluster in a local container
    Local {
        #[command(subcommand)]
        cmd: LocalCmd,
    },
}

#[derive(Debug, Args)]
pub struct PsArgs {
    /// Maximum number of tasks to return per request
    #[arg(long, default_value_t = 100)]
    pub limit: usize,

    /// Maximum number of tasks to list
    #[arg(long, default_value_t = 250)]
    pub max: usize,

    /// Regular expression to match the task name
    #[arg(long)]
    pub name: Option<String>,

    /// Show all tasks
    #[arg(short, long)]
    pub all: bool,

    /// Show running tasks
    #[arg(short, long)]
    pub running: bool,

    /// Show failed tasks. Spell it `--fa` or `--failed`: a single dash
    /// `-fa` reads as `-f -a` and lists every task
    #[arg(long, visible_alias = "fa")]
    pub failed: bool,

    /// Show killed tasks
    #[arg(short, long)]
    pub killed: bool,

    /// Show finished tasks
    #[arg(short, long)]
    pub finished: bool,

    /// Sort order requested from the master
    #[arg(value_enum, default_value_t = SortOrder::Desc)]
    pub order: SortOrder,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Task name
    #[arg(short, long)]
    pub name: Option<String>,

    /// User to run as
    #[arg(short, long)]
    pub user: Option<String>,

    /// CPU resources to allocate
    #[arg(short, long)]
    pub cpus: Option<f64>,

    /// Memory resources (MB) to allocate
    #[arg(short, long)]
    pub mem: Option<f64>,

    /// Disk resources (MB) to allocate
    #[arg(short, long)]
    pub disk: Option<f64>,

    /// Give extended privileges to this container
    #[arg(long)]
    pub privileged: bool,

    /// Always pull the container image
    #[arg(short = 'f', long)]
    pub force_pull: bool,

    /// Docker image to run
    #[arg(short, long)]
    pub image: Option<String>,

    /// Docker network mode
    #[arg(long, value_enum, default_value_t = NetworkMode::Host)]
    pub net: NetworkMode,

    /// Docker parameters, KEY=VALUE
    #[arg(long = "param")]
    pub params: Vec<String>,

    /// Volume mappings, HOST:CONTAINER[:ro|rw]
    #[arg(short, long = "volume")]
    pub volumes: Vec<String>,

    /// Port mappings, CONTAINER:HOST[/PROTOCOL]
    #[arg(short, long = "port")]
    pub ports: Vec<String>,

    /// Environment variables, KEY=VALUE
    #[arg(short, long = "env")]
    pub envs: Vec<String>,

    /// Task labels, KEY=VALUE
    #[arg(long = "label")]
    pub labels: Vec<String>,

    /// Shell command to execute
    #[arg(short, long)]
    pub shell: Option<String>,

    /// Path to a TaskInfo JSON file
    #[arg(long = "task")]
    pub task_file: Option<PathBuf>,

    /// Command arguments
    #[arg(trailing_var_arg = true)]
    pub args: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum LocalCmd {
    /// Start the local cluster
    Up {
        /// Remove any existing local cluster
        #[arg(long = "rm")]
        remove: bool,
        /// Force pull a new image
        #[arg(short, long)]
        force: bool,
    },
    /// Stop the local cluster
    Down,
    /// Display the status of the local cluster
    Status,
    /// Remove the local cluster
    Rm,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Local(#[from] LocalError),
}

pub type CliResult<T> = Result<T, CliError>;
