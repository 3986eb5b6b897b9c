//! Container lifecycle controller
//!
//! Runs one `ContainerSpec` to completion against a probed connection:
//! 1. remove any stale container with the same name
//! 2. create and start the container
//! 3. re-read its state to confirm it left "created"
//! 4. wait for it to stop, bounded by the configured timeout
//! 5. collect the full log stream
//! 6. read the final daemon state
//!
//! Steps run strictly in this order. Once step 1 has begun the caller always
//! gets a `JobResult`; failures are recorded on it instead of returned.

use chrono::Utc;
use geotool_core::{ContainerSpec, ContainerStatus, JobResult, LifecycleError, NO_LOGS};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::connection::RuntimeConnection;
use crate::runtime::ContainerRuntime;

/// What to do with a container after its logs and status were collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Leave the terminated container for inspection by name
    #[default]
    Retain,
    /// Force-remove it
    Remove,
}

impl FromStr for RemovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" | "keep" => Ok(RemovalPolicy::Retain),
            "remove" => Ok(RemovalPolicy::Remove),
            other => Err(format!("unknown removal policy '{}'", other)),
        }
    }
}

/// Lifecycle controller options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleOptions {
    /// Upper bound on step 4, `None` waits forever
    pub wait_timeout: Option<Duration>,
    pub removal_policy: RemovalPolicy,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            wait_timeout: Some(Duration::from_secs(3600)),
            removal_policy: RemovalPolicy::Retain,
        }
    }
}

/// Outcome of the wait step
enum WaitOutcome {
    Exited(i64),
    TimedOut,
    Failed,
}

/// Drives containers through their lifecycle
#[derive(Debug, Clone, Default)]
pub struct LifecycleController {
    options: LifecycleOptions,
}

impl LifecycleController {
    pub fn new(options: LifecycleOptions) -> Self {
        Self { options }
    }

    /// Runs a container to completion
    ///
    /// # Arguments
    /// * `connection` - Probed daemon connection
    /// * `spec` - What to run
    ///
    /// # Returns
    /// The job result; never an error
    pub async fn run(&self, connection: &RuntimeConnection, spec: &ContainerSpec) -> JobResult {
        let runtime = connection.runtime();
        let name = spec.name.as_str();
        let started_at = Utc::now();
        let mut errors = Vec::new();

        info!("Running container {} from image {}", name, spec.image);

        self.clear_stale(runtime, name, &mut errors).await;

        if let Err(e) = runtime.create_and_start(spec).await {
            error!("Failed to launch container {}: {}", name, e);
            errors.push(LifecycleError::Launch {
                container: name.to_string(),
                message: e.message(),
            });
            return JobResult {
                container: name.to_string(),
                status: ContainerStatus::Failed,
                exit_code: None,
                log_text: NO_LOGS.to_string(),
                errors,
                started_at,
                finished_at: Utc::now(),
            };
        }

        match runtime.status(name).await {
            Ok(state) => match ContainerStatus::from_daemon(&state) {
                ContainerStatus::Created => {
                    warn!("Container {} still reports 'created' after start", name)
                }
                status => debug!("Container {} is {} after start", name, status),
            },
            Err(e) => {
                warn!("Failed to refresh status of container {}: {}", name, e);
                errors.push(LifecycleError::Status {
                    container: name.to_string(),
                    message: e.message(),
                });
            }
        }

        let waited = self.await_completion(runtime, name, &mut errors).await;

        let log_text = match runtime.logs(name).await {
            Ok(frames) => decode_logs(&frames),
            Err(e) => {
                warn!("Failed to collect logs of container {}: {}", name, e);
                errors.push(LifecycleError::LogCollection {
                    container: name.to_string(),
                    message: e.message(),
                });
                NO_LOGS.to_string()
            }
        };

        let final_status = match runtime.status(name).await {
            Ok(state) => ContainerStatus::from_daemon(&state),
            Err(e) => {
                warn!("Failed to read final status of container {}: {}", name, e);
                errors.push(LifecycleError::Status {
                    container: name.to_string(),
                    message: e.message(),
                });
                ContainerStatus::Unknown
            }
        };

        let (status, exit_code) = match waited {
            WaitOutcome::Exited(code) => (final_status, Some(code)),
            WaitOutcome::TimedOut => (ContainerStatus::Failed, None),
            WaitOutcome::Failed => (ContainerStatus::Unknown, None),
        };

        if self.options.removal_policy == RemovalPolicy::Remove {
            if let Err(e) = self.remove(connection, name).await {
                warn!("{}", e);
                errors.push(e);
            }
        }

        info!(
            "Container {} finished with status {} (exit code: {:?})",
            name, status, exit_code
        );

        JobResult {
            container: name.to_string(),
            status,
            exit_code,
            log_text,
            errors,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Force-removes a container by name
    ///
    /// A container that is already gone counts as removed.
    pub async fn remove(
        &self,
        connection: &RuntimeConnection,
        name: &str,
    ) -> Result<(), LifecycleError> {
        match connection.runtime().remove(name).await {
            Ok(()) => {
                debug!("Container {} removed", name);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("Container {} already removed", name);
                Ok(())
            }
            Err(e) => Err(LifecycleError::Removal {
                container: name.to_string(),
                message: e.message(),
            }),
        }
    }

    /// Stops and removes every container already using `name`
    ///
    /// Best-effort: failures are recorded and the run continues.
    async fn clear_stale(
        &self,
        runtime: &dyn ContainerRuntime,
        name: &str,
        errors: &mut Vec<LifecycleError>,
    ) {
        let stale = match runtime.list_containers(name).await {
            Ok(stale) => stale,
            Err(e) => {
                warn!("Failed to list containers named {}: {}", name, e);
                errors.push(LifecycleError::ConflictResolution {
                    container: name.to_string(),
                    message: e.message(),
                });
                return;
            }
        };

        for container in stale {
            info!(
                "Container '{}' already exists ({}). Removing...",
                name, container.state
            );

            if !ContainerStatus::from_daemon(&container.state).is_terminal() {
                if let Err(e) = runtime.stop(name).await {
                    debug!("Stopping stale container {} failed: {}", name, e);
                }
            }

            match runtime.remove(name).await {
                Ok(()) => debug!("Stale container {} removed", name),
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    warn!("Failed to remove stale container {}: {}", name, e);
                    errors.push(LifecycleError::ConflictResolution {
                        container: name.to_string(),
                        message: e.message(),
                    });
                }
            }
        }
    }

    /// Blocks until the container stops or the wait bound expires
    ///
    /// On expiry the container is stopped so it does not outlive the job.
    async fn await_completion(
        &self,
        runtime: &dyn ContainerRuntime,
        name: &str,
        errors: &mut Vec<LifecycleError>,
    ) -> WaitOutcome {
        let waited = match self.options.wait_timeout {
            Some(limit) => match tokio::time::timeout(limit, runtime.wait(name)).await {
                Ok(waited) => waited,
                Err(_) => {
                    error!(
                        "Container {} did not finish within {:?}, stopping it",
                        name, limit
                    );
                    if let Err(e) = runtime.stop(name).await {
                        warn!("Failed to stop timed out container {}: {}", name, e);
                    }
                    errors.push(LifecycleError::WaitTimedOut {
                        container: name.to_string(),
                        seconds: limit.as_secs(),
                    });
                    return WaitOutcome::TimedOut;
                }
            },
            None => runtime.wait(name).await,
        };

        match waited {
            Ok(code) => {
                debug!("Container {} exited with code {}", name, code);
                WaitOutcome::Exited(code)
            }
            Err(e) => {
                error!("Failed while waiting for container {}: {}", name, e);
                errors.push(LifecycleError::Wait {
                    container: name.to_string(),
                    message: e.message(),
                });
                WaitOutcome::Failed
            }
        }
    }
}

/// Decodes raw log frames into text
///
/// Frames are joined before decoding so multi-byte characters split across
/// frame boundaries survive.
pub fn decode_logs(frames: &[Vec<u8>]) -> String {
    let raw: Vec<u8> = frames.concat();
    String::from_utf8_lossy(&raw).into_owned()
}
