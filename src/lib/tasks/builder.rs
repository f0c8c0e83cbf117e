use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::{
    CommandInfo, ContainerInfo, ContainerType, DockerInfo, Environment, Label, Labels, MesosInfo,
    NetworkMode, Parameter, PortMapping, Range, Ranges, Resource, ResourceKind, Scalar, TaskError,
    TaskId, TaskInfo, TaskResult, Variable, Volume, VolumeMode,
};

pub const DEFAULT_CPUS: f64 = 0.1;

impl Default for TaskInfo {
    /// A CPU-only task for the Mesos containerizer with a fresh id.
    fn default() -> Self {
        TaskInfo {
            name: String::new(),
            task_id: TaskId {
                value: uuid::Uuid::new_v4().to_string(),
            },
            resources: vec![Resource::scalar("cpus", DEFAULT_CPUS)],
            command: CommandInfo {
                environment: Environment::default(),
                ..Default::default()
            },
            container: ContainerInfo {
                kind: ContainerType::Mesos,
                volumes: Vec::new(),
                docker: None,
                mesos: Some(MesosInfo::default()),
            },
            labels: Labels::default(),
        }
    }
}

impl Resource {
    pub fn scalar(name: &str, value: f64) -> Self {
        Resource {
            name: name.to_string(),
            kind: ResourceKind::Scalar,
            role: "*".to_string(),
            scalar: Some(Scalar { value }),
            ranges: None,
        }
    }

    /// A single-port range resource for a requested host port.
    pub fn port(port: u32) -> Self {
        Resource {
            name: "ports".to_string(),
            kind: ResourceKind::Ranges,
            role: "*".to_string(),
            scalar: None,
            ranges: Some(Ranges {
                range: vec![Range {
                    begin: u64::from(port),
                    end: u64::from(port),
                }],
            }),
        }
    }
}

impl TaskInfo {
    /// Sets a named scalar resource, adding it when absent.
    pub fn set_scalar(&mut self, name: &str, value: f64) {
        match self
            .resources
            .iter_mut()
            .find(|r| r.name == name && r.kind == ResourceKind::Scalar)
        {
            Some(resource) => resource.scalar = Some(Scalar { value }),
            None => self.resources.push(Resource::scalar(name, value)),
        }
    }

    pub fn scalar(&self, name: &str) -> Option<f64> {
        self.resources
            .iter()
            .find(|r| r.name == name)
            .and_then(|r| r.scalar.as_ref())
            .map(|s| s.value)
    }
}

/// Collects options for a new task and derives the final [`TaskInfo`].
///
/// Setters may be called in any order and repeatedly: scalar options keep
/// the last value, list options accumulate. All derivation happens in
/// [`TaskBuilder::build`].
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    base: TaskInfo,
    name: Option<String>,
    user: Option<String>,
    cpus: Option<f64>,
    mem: Option<f64>,
    disk: Option<f64>,
    shell: Option<String>,
    arguments: Vec<String>,
    task_file: Option<PathBuf>,
    image: Option<String>,
    privileged: bool,
    force_pull: bool,
    network: NetworkMode,
    parameters: Vec<Parameter>,
    volumes: Vec<Volume>,
    ports: Vec<PortMapping>,
    envs: Vec<Variable>,
    labels: Vec<Label>,
}

impl Default for TaskBuilder {
    fn default() -> Self {
        TaskBuilder::new(TaskInfo::default())
    }
}

impl TaskBuilder {
    /// Starts from `base`, normally the profile's default task.
    pub fn new(base: TaskInfo) -> Self {
        TaskBuilder {
            base,
            name: None,
            user: None,
            cpus: None,
            mem: None,
            disk: None,
            shell: None,
            arguments: Vec::new(),
            task_file: None,
            image: None,
            privileged: false,
            force_pull: false,
            network: NetworkMode::default(),
            parameters: Vec::new(),
            volumes: Vec::new(),
            ports: Vec::new(),
            envs: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn cpus(mut self, cpus: f64) -> Self {
        self.cpus = Some(cpus);
        self
    }

    pub fn mem(mut self, mem: f64) -> Self {
        self.mem = Some(mem);
        self
    }

    pub fn disk(mut self, disk: f64) -> Self {
        self.disk = Some(disk);
        self
    }

    pub fn shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = Some(shell.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn arguments<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn task_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.task_file = Some(path.into());
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn force_pull(mut self, force_pull: bool) -> Self {
        self.force_pull = force_pull;
        self
    }

    pub fn network(mut self, network: NetworkMode) -> Self {
        self.network = network;
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn volume(mut self, volume: Volume) -> Self {
        self.volumes.push(volume);
        self
    }

    pub fn port(mut self, mapping: PortMapping) -> Self {
        self.ports.push(mapping);
        self
    }

    pub fn env(mut self, variable: Variable) -> Self {
        self.envs.push(variable);
        self
    }

    pub fn label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    fn is_runnable(&self) -> bool {
        self.image.is_some()
            || self.task_file.is_some()
            || !self.arguments.is_empty()
            || self.shell.is_some()
    }

    /// Derives the task. Every build gets a fresh task id unless a task file
    /// supplies one. The steps run in a fixed order:
    ///
    /// 1. a shell string wins over positional arguments; positional
    ///    arguments form an argv command, the first one is the executable
    ///    (`value`) and the full list is passed as `arguments` without a
    ///    shell, rather than being joined into a single string;
    /// 2. a task file replaces everything built so far, remaining options
    ///    are applied on top of it;
    /// 3. every port mapping reserves its host port as a `ports` range;
    /// 4. an image selects the Docker containerizer and drops the Mesos
    ///    container, no image drops the Docker container;
    /// 5. a task with nothing to run is rejected.
    pub fn build(self) -> TaskResult<TaskInfo> {
        let runnable = self.is_runnable();
        let mut task = self.base;
        task.task_id = TaskId {
            value: uuid::Uuid::new_v4().to_string(),
        };

        if let Some(shell) = self.shell {
            task.command.shell = true;
            task.command.value = Some(shell);
            task.command.arguments.clear();
        } else if let Some(first) = self.arguments.first() {
            task.command.shell = false;
            task.command.value = Some(first.clone());
            task.command.arguments = self.arguments.clone();
        }

        if let Some(path) = &self.task_file {
            task = task_from_file(path)?;
        }

        if let Some(name) = self.name {
            task.name = name;
        }
        if let Some(user) = self.user {
            task.command.user = Some(user);
        }
        if let Some(cpus) = self.cpus {
            task.set_scalar("cpus", cpus);
        }
        if let Some(mem) = self.mem {
            task.set_scalar("mem", mem);
        }
        if let Some(disk) = self.disk {
            task.set_scalar("disk", disk);
        }
        task.command.environment.variables.extend(self.envs);
        task.labels.labels.extend(self.labels);
        task.container.volumes.extend(self.volumes);

        // The host port has to fall inside the agents' offered port range
        // (31000-32000 by default). Picking one is left to the caller.
        for mapping in &self.ports {
            task.resources.push(Resource::port(mapping.host_port));
        }

        match self.image {
            Some(image) => {
                task.container.kind = ContainerType::Docker;
                task.container.mesos = None;
                let docker = task.container.docker.get_or_insert_with(DockerInfo::default);
                docker.image = image;
                docker.privileged = self.privileged;
                docker.force_pull_image = self.force_pull;
                docker.network = self.network;
                docker.parameters.extend(self.parameters);
                docker.port_mappings.extend(self.ports);
            }
            None => {
                task.container.docker = None;
                if task.container.kind == ContainerType::Docker {
                    task.container.kind = ContainerType::Mesos;
                    task.container.mesos.get_or_insert_with(MesosInfo::default);
                }
            }
        }

        if !runnable {
            return Err(TaskError::NothingToRun);
        }

        debug!(task_id = %task.task_id.value, "built task");
        Ok(task)
    }
}

/// Reads a task in wire format from a JSON file.
pub fn task_from_file(path: &Path) -> TaskResult<TaskInfo> {
    let task_file_error = |reason: String| TaskError::TaskFile {
        path: path.display().to_string(),
        reason,
    };
    let raw = std::fs::read(path).map_err(|e| task_file_error(e.to_string()))?;
    serde_json::from_slice(&raw).map_err(|e| task_file_error(e.to_string()))
}

/// Parses `CONTAINER:HOST[/PROTOCOL]`.
pub fn parse_port(value: &str) -> TaskResult<PortMapping> {
    let invalid = |reason: &str| TaskError::InvalidFlag {
        flag: "port",
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let (ports, protocol) = match value.split_once('/') {
        Some((ports, protocol)) if !protocol.is_empty() => (ports, Some(protocol.to_string())),
        Some(_) => return Err(invalid("empty protocol")),
        None => (value, None),
    };
    let (container, host) = ports
        .split_once(':')
        .ok_or_else(|| invalid("expected CONTAINER:HOST"))?;
    let container_port = container
        .parse()
        .map_err(|_| invalid("container port is not a number"))?;
    let host_port = host
        .parse()
        .map_err(|_| invalid("host port is not a number"))?;
    Ok(PortMapping {
        host_port,
        container_port,
        protocol,
    })
}

/// Parses `HOST:CONTAINER[:ro|rw]` or a bare `CONTAINER` path.
pub fn parse_volume(value: &str) -> TaskResult<Volume> {
    let invalid = |reason: &str| TaskError::InvalidFlag {
        flag: "volume",
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let parts: Vec<&str> = value.split(':').collect();
    let (host_path, container_path, mode) = match parts.as_slice() {
        [container] => (None, *container, VolumeMode::Rw),
        [host, container] => (Some(*host), *container, VolumeMode::Rw),
        [host, container, "rw"] => (Some(*host), *container, VolumeMode::Rw),
        [host, container, "ro"] => (Some(*host), *container, VolumeMode::Ro),
        [_, _, _] => return Err(invalid("mode must be ro or rw")),
        _ => return Err(invalid("expected HOST:CONTAINER[:MODE]")),
    };
    if container_path.is_empty() || host_path.is_some_and(str::is_empty) {
        return Err(invalid("empty path"));
    }
    Ok(Volume {
        container_path: container_path.to_string(),
        host_path: host_path.map(str::to_string),
        mode,
    })
}

/// Splits `KEY=VALUE` on the first `=`.
pub fn parse_key_value(flag: &'static str, value: &str) -> TaskResult<(String, String)> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(TaskError::InvalidFlag {
            flag,
            value: value.to_string(),
            reason: "expected KEY=VALUE".to_string(),
        }),
    }
}
