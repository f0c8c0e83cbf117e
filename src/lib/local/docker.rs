use super::types::{
    CONTAINER_NAME, ContainerStatus, LocalCluster, LocalError, LocalResult, REPOSITORY, UpOptions,
};
use bollard::{
    Docker,
    container::{
        Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
        StartContainerOptions,
    },
    image::{CreateImageOptions, ListImagesOptions},
    secret::HostConfig,
};
use futures_util::stream::StreamExt;
use tracing::{debug, info};

impl LocalCluster {
    pub fn new() -> LocalResult<Self> {
        let client = Docker::connect_with_local_defaults()?;

        Ok(LocalCluster {
            client,
            repository: REPOSITORY.to_string(),
            container_name: CONTAINER_NAME.to_string(),
        })
    }

    async fn has_image(&self) -> LocalResult<bool> {
        let images = self
            .client
            .list_images(Some(ListImagesOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await?;

        Ok(images
            .iter()
            .any(|image| image.repo_tags.iter().any(|tag| *tag == self.repository)))
    }

    async fn pull(&self) -> LocalResult<()> {
        info!("Pulling image: {}", self.repository);

        let mut stream = self.client.create_image(
            Some(CreateImageOptions {
                from_image: self.repository.clone(),
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(msg) = stream.next().await {
            let info = msg?;
            if let Some(status) = info.status {
                debug!("{}", status);
            }
        }

        info!("Image pulled: {}", self.repository);
        Ok(())
    }

    /// The cluster container, matched by name. Docker reports names with a
    /// leading slash.
    pub async fn container(&self) -> LocalResult<Option<ContainerStatus>> {
        let containers = self
            .client
            .list_containers(Some(ListContainersOptions::<String> {
                all: true,
                ..Default::default()
            }))
            .await?;

        Ok(containers.into_iter().find_map(|container| {
            let named = container
                .names
                .as_ref()?
                .iter()
                .any(|name| name.trim_start_matches('/') == self.container_name);
            named.then(|| ContainerStatus {
                id: container.id.clone().unwrap_or_default(),
                state: container.state.clone().unwrap_or_default(),
            })
        }))
    }

    async fn create(&self) -> LocalResult<String> {
        let host_config = HostConfig {
            network_mode: Some("host".to_string()),
            binds: Some(vec![
                "/var/run/docker.sock:/var/run/docker.sock:rw".to_string(),
            ]),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(self.repository.clone()),
            cmd: Some(vec!["mesos-local".to_string()]),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = Some(CreateContainerOptions {
            name: self.container_name.clone(),
            ..Default::default()
        });

        let resp = self
            .client
            .create_container(options, container_config)
            .await?;
        info!("Container created successfully: {}", resp.id);
        Ok(resp.id)
    }

    async fn remove_container(&self, id: &str) -> LocalResult<()> {
        self.client
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    /// Pulls the image when needed, creates the container when missing and
    /// starts it. Returns the container id.
    pub async fn up(&self, opts: UpOptions) -> LocalResult<String> {
        if opts.force_pull || !self.has_image().await? {
            self.pull().await?;
        }
        if !self.has_image().await? {
            return Err(LocalError::ImageUnavailable(self.repository.clone()));
        }

        let mut existing = self.container().await?;
        if let Some(container) = existing.as_ref().filter(|_| opts.remove) {
            info!("removing container {}", container.id);
            self.remove_container(&container.id).await?;
            existing = None;
        }

        let id = match existing {
            Some(container) if container.state == "running" => {
                info!("container {} already running", container.id);
                return Ok(container.id);
            }
            Some(container) => container.id,
            None => self.create().await?,
        };

        info!("Starting container: {}", id);
        self.client
            .start_container(&id, None::<StartContainerOptions<String>>)
            .await?;
        Ok(id)
    }

    /// Stops a running cluster container.
    pub async fn down(&self) -> LocalResult<String> {
        let container = self.container().await?.ok_or(LocalError::NoContainer)?;
        if container.state != "running" {
            return Err(LocalError::InvalidState(container.state));
        }
        info!("Stopping container: {}", container.id);
        self.client.stop_container(&container.id, None).await?;
        Ok(container.id)
    }

    /// Force-removes the cluster container.
    pub async fn rm(&self) -> LocalResult<String> {
        let container = self.container().await?.ok_or(LocalError::NoContainer)?;
        info!("removing container {}", container.id);
        self.remove_container(&container.id).await?;
        Ok(container.id)
    }
}
