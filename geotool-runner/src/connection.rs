//! Runtime connection manager
//!
//! A `RuntimeConnection` can only be obtained from a runtime that answered its
//! liveness probe. A daemon that fails the probe never gets a single further
//! request. No retries happen here; retry policy belongs to the caller.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::RuntimeError;
use crate::runtime::{ContainerRuntime, DaemonVersion, PodmanRuntime};

/// Probed handle to one container daemon endpoint
#[derive(Clone)]
pub struct RuntimeConnection {
    runtime: Arc<dyn ContainerRuntime>,
    endpoint: String,
    version: Option<DaemonVersion>,
}

impl RuntimeConnection {
    /// Probes a runtime and wraps it on success
    ///
    /// Version metadata is fetched for diagnostics; failing to get it does
    /// not fail the connection.
    ///
    /// # Errors
    /// `RuntimeError::Unavailable` if the liveness probe fails
    pub async fn establish(
        runtime: Arc<dyn ContainerRuntime>,
        endpoint: impl Into<String>,
    ) -> Result<Self, RuntimeError> {
        let endpoint = endpoint.into();

        if let Err(e) = runtime.ping().await {
            return Err(RuntimeError::Unavailable {
                endpoint,
                message: e.message(),
            });
        }

        info!("Container service at {} is running", endpoint);

        let version = match runtime.version().await {
            Ok(version) => {
                info!(
                    "Release: {}, compatible API: {}",
                    version.release.as_deref().unwrap_or("unknown"),
                    version.api_version.as_deref().unwrap_or("unknown")
                );
                Some(version)
            }
            Err(e) => {
                warn!("Failed to read daemon version from {}: {}", endpoint, e);
                None
            }
        };

        Ok(Self {
            runtime,
            endpoint,
            version,
        })
    }

    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Daemon version, if it could be read at connect time
    pub fn version(&self) -> Option<&DaemonVersion> {
        self.version.as_ref()
    }
}

impl std::fmt::Debug for RuntimeConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeConnection")
            .field("endpoint", &self.endpoint)
            .field("version", &self.version)
            .finish()
    }
}

/// Connects to the podman service at `uri` and probes it
///
/// # Arguments
/// * `uri` - Daemon endpoint, e.g. `unix:///run/podman/podman.sock`
/// * `timeout` - Per-request timeout
pub async fn connect(uri: &str, timeout: Duration) -> Result<RuntimeConnection, RuntimeError> {
    let runtime = PodmanRuntime::open(uri, timeout)?;
    RuntimeConnection::establish(Arc::new(runtime), uri).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::fake::{FakeBehavior, FakeRuntime};

    #[tokio::test]
    async fn test_establish_probes_and_reads_version() {
        let fake = Arc::new(FakeRuntime::new(FakeBehavior::default()));
        let conn = RuntimeConnection::establish(fake.clone(), "unix:///run/podman/podman.sock")
            .await
            .unwrap();

        assert_eq!(conn.endpoint(), "unix:///run/podman/podman.sock");
        assert_eq!(
            conn.version().and_then(|v| v.release.as_deref()),
            Some("5.0.0")
        );
        assert_eq!(fake.calls(), vec!["ping", "version"]);
    }

    #[tokio::test]
    async fn test_failed_probe_issues_no_further_calls() {
        let fake = Arc::new(FakeRuntime::new(FakeBehavior {
            ping_fails: true,
            ..Default::default()
        }));

        let err = RuntimeConnection::establish(fake.clone(), "unix:///run/podman/podman.sock")
            .await
            .unwrap_err();

        assert!(matches!(err, RuntimeError::Unavailable { .. }));
        assert_eq!(fake.calls(), vec!["ping"]);
    }

    #[tokio::test]
    async fn test_version_failure_is_not_fatal() {
        let fake = Arc::new(FakeRuntime::new(FakeBehavior {
            version_fails: true,
            ..Default::default()
        }));

        let conn = RuntimeConnection::establish(fake, "tcp://127.0.0.1:8888")
            .await
            .unwrap();
        assert!(conn.version().is_none());
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_scheme() {
        let err = connect("ftp://daemon", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidEndpoint(_)));
    }

    #[tokio::test]
    async fn test_connect_unreachable_socket() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("unix://{}/podman.sock", dir.path().display());

        let err = connect(&uri, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Unavailable { .. }));
    }
}
