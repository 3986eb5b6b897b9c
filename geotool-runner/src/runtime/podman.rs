//! Podman service client
//!
//! Talks to the podman system service over its Docker-compatible REST API:
//! - Pinging the daemon and reading its version
//! - Pulling missing images before launch
//! - Creating, starting, inspecting, waiting on and removing containers
//! - Reading the combined stdout/stderr log stream

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions, LogsOptions,
    RemoveContainerOptions, StopContainerOptions, WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{HostConfig, Mount, MountTypeEnum};
use futures_util::stream::StreamExt;
use geotool_core::ContainerSpec;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ContainerRuntime, ContainerSummary, DaemonVersion};
use crate::error::RuntimeError;

/// Seconds a container gets to exit after SIGTERM before it is killed
const STOP_GRACE_SECS: i64 = 10;

/// Container runtime backed by a podman (or Docker) service socket
#[derive(Debug, Clone)]
pub struct PodmanRuntime {
    docker: Docker,
    endpoint: String,
}

impl PodmanRuntime {
    /// Opens a client for the given endpoint
    ///
    /// No request is made here; the connection manager probes the daemon
    /// before the runtime is used. A unix socket that does not exist fails
    /// here already, as `RuntimeError::Unavailable`.
    ///
    /// # Arguments
    /// * `uri` - `unix:///path/to/podman.sock`, `tcp://host:port` or `http://host:port`
    /// * `timeout` - Per-request timeout
    pub fn open(uri: &str, timeout: Duration) -> Result<Self, RuntimeError> {
        let secs = timeout.as_secs();

        let connected = if let Some(path) = uri.strip_prefix("unix://") {
            Docker::connect_with_unix(path, secs, bollard::API_DEFAULT_VERSION)
        } else if uri.starts_with("tcp://") || uri.starts_with("http://") {
            Docker::connect_with_http(uri, secs, bollard::API_DEFAULT_VERSION)
        } else {
            return Err(RuntimeError::InvalidEndpoint(uri.to_string()));
        };

        let docker = connected.map_err(|e| RuntimeError::Unavailable {
            endpoint: uri.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            docker,
            endpoint: uri.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Pulls the image unless it is already in the local store
    async fn ensure_image(&self, image: &str) -> Result<(), RuntimeError> {
        if self.docker.inspect_image(image).await.is_ok() {
            debug!("Image {} already present", image);
            return Ok(());
        }

        info!("Pulling image {}", image);

        let options = Some(CreateImageOptions {
            from_image: image,
            ..Default::default()
        });

        let mut stream = self.docker.create_image(options, None, None);
        while let Some(progress) = stream.next().await {
            let progress = progress.map_err(map_error)?;
            if let Some(status) = progress.status {
                debug!("pull {}: {}", image, status);
            }
        }

        info!("Image {} pulled", image);
        Ok(())
    }

    fn container_config(spec: &ContainerSpec) -> Config<String> {
        let mounts: Vec<Mount> = spec
            .mounts
            .iter()
            .map(|m| Mount {
                source: Some(m.source.clone()),
                target: Some(m.target.clone()),
                typ: Some(MountTypeEnum::BIND),
                read_only: Some(m.read_only),
                ..Default::default()
            })
            .collect();

        let host_config = HostConfig {
            mounts: if mounts.is_empty() { None } else { Some(mounts) },
            network_mode: spec.network_mode.clone(),
            ..Default::default()
        };

        let env = spec.env_pairs();

        Config {
            image: Some(spec.image.clone()),
            cmd: if spec.command.is_empty() {
                None
            } else {
                Some(spec.command.clone())
            },
            env: if env.is_empty() { None } else { Some(env) },
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            host_config: Some(host_config),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ContainerRuntime for PodmanRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| RuntimeError::Unavailable {
                endpoint: self.endpoint.clone(),
                message: e.to_string(),
            })
    }

    async fn version(&self) -> Result<DaemonVersion, RuntimeError> {
        let version = self.docker.version().await.map_err(map_error)?;
        Ok(DaemonVersion {
            release: version.version,
            api_version: version.api_version,
        })
    }

    async fn list_containers(&self, name: &str) -> Result<Vec<ContainerSummary>, RuntimeError> {
        // The daemon's name filter is a substring match, so results are
        // narrowed to exact names below
        let mut filters = HashMap::new();
        filters.insert("name".to_string(), vec![name.to_string()]);

        let options = ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(map_error)?;

        Ok(containers
            .into_iter()
            .filter(|c| {
                c.names
                    .as_ref()
                    .is_some_and(|names| names.iter().any(|n| n.trim_start_matches('/') == name))
            })
            .map(|c| ContainerSummary {
                id: c.id.unwrap_or_default(),
                name: name.to_string(),
                state: c.state.unwrap_or_default(),
            })
            .collect())
    }

    async fn create_and_start(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        self.ensure_image(&spec.image).await?;

        info!("Creating container {} from image {}", spec.name, spec.image);

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let response = self
            .docker
            .create_container(Some(options), Self::container_config(spec))
            .await
            .map_err(map_error)?;

        for warning in &response.warnings {
            warn!("Daemon warning for container {}: {}", spec.name, warning);
        }

        if let Err(e) = self.docker.start_container::<String>(&response.id, None).await {
            let err = map_error(e);
            warn!(
                "Container {} created but failed to start, removing it: {}",
                spec.name, err
            );
            if let Err(rm_err) = self.remove(&spec.name).await {
                warn!("Failed to remove unstarted container {}: {}", spec.name, rm_err);
            }
            return Err(err);
        }

        info!(
            "Container {} started with ID: {}",
            spec.name, response.id
        );
        Ok(response.id)
    }

    async fn status(&self, name: &str) -> Result<String, RuntimeError> {
        let inspect = self
            .docker
            .inspect_container(name, None::<InspectContainerOptions>)
            .await
            .map_err(map_error)?;

        Ok(inspect
            .state
            .and_then(|state| state.status)
            .map(|status| status.to_string())
            .unwrap_or_default())
    }

    async fn wait(&self, name: &str) -> Result<i64, RuntimeError> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };

        let mut stream = self.docker.wait_container(name, Some(options));

        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // A non-zero exit is reported as an error by the client
            Some(Err(BollardError::DockerContainerWaitError { code, error })) => {
                debug!("Container {} exited with code {}: {}", name, code, error);
                Ok(code)
            }
            Some(Err(e)) => Err(map_error(e)),
            None => Err(RuntimeError::Transport(format!(
                "wait stream for {} ended without a result",
                name
            ))),
        }
    }

    async fn logs(&self, name: &str) -> Result<Vec<Vec<u8>>, RuntimeError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: false,
            ..Default::default()
        };

        let mut stream = self.docker.logs(name, Some(options));
        let mut frames = Vec::new();

        while let Some(frame) = stream.next().await {
            frames.push(frame.map_err(map_error)?.into_bytes().to_vec());
        }

        debug!("Collected {} log frame(s) from {}", frames.len(), name);
        Ok(frames)
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.docker
            .stop_container(name, Some(StopContainerOptions { t: STOP_GRACE_SECS }))
            .await
            .map_err(map_error)
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        self.docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(map_error)
    }
}

/// Keeps the daemon's own message and status where there is one
fn map_error(err: BollardError) -> RuntimeError {
    match err {
        BollardError::DockerResponseServerError {
            status_code,
            message,
        } => RuntimeError::daemon(status_code, message),
        other => RuntimeError::Transport(other.to_string()),
    }
}
