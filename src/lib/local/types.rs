use bollard::Docker;
use thiserror::Error;

pub const REPOSITORY: &str = "quay.io/vektorcloud/mesos:latest";
pub const CONTAINER_NAME: &str = "mesos_cli";

/// Single-node cluster running `mesos-local` inside one container.
#[derive(Debug, Clone)]
pub struct LocalCluster {
    pub client: Docker,
    pub repository: String,
    pub container_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStatus {
    pub id: String,
    pub state: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpOptions {
    /// Remove an existing container before starting.
    pub remove: bool,
    /// Pull the image even when it is present locally.
    pub force_pull: bool,
}

#[derive(Debug, Error)]
pub enum LocalError {
    #[error("docker: {0}")]
    Docker(#[from] bollard::errors::Error),
    #[error("cannot pull image {0}")]
    ImageUnavailable(String),
    #[error("no container found")]
    NoContainer,
    #[error("container is in invalid state: {0}")]
    InvalidState(String),
}

pub type LocalResult<T> = Result<T, LocalError>;
