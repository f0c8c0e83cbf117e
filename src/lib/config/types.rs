use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lib::tasks::types::TaskInfo;

pub const DEFAULT_MASTER: &str = "http://localhost:5050";
pub const DEFAULT_PROFILE: &str = "default";
pub const CONFIG_FILE_NAME: &str = ".mesos-cli.json";

pub const OPERATOR_API_PATH: &str = "/api/v1";
pub const SCHEDULER_API_PATH: &str = "/api/v1/scheduler";
pub const AGENT_OPERATOR_API_PATH: &str = "/slave(1)/api/v1";

/// Environment specific options: where the master lives and what a new
/// task looks like before any flags are applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub master: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_info: Option<TaskInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot load profile: {0}")]
    UnknownProfile(String),
    #[error("invalid master address {address}: {reason}")]
    InvalidMaster { address: String, reason: String },
    #[error("cannot locate home directory, pass --config")]
    NoHomeDir,
    #[error("config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
