//! In-memory container runtime for tests
//!
//! Keeps a name -> state table, records every call in order and can be
//! scripted to fail any step.

use async_trait::async_trait;
use geotool_core::ContainerSpec;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{ContainerRuntime, ContainerSummary, DaemonVersion};
use crate::error::RuntimeError;

/// Scripted behavior of the fake daemon
#[derive(Debug, Clone)]
pub(crate) struct FakeBehavior {
    pub ping_fails: bool,
    pub version_fails: bool,
    pub list_fails: bool,
    /// Daemon message returned by create_and_start
    pub launch_error: Option<String>,
    pub status_fails: bool,
    pub wait_fails: bool,
    /// wait() never completes
    pub wait_hangs: bool,
    pub logs_fail: bool,
    pub remove_fails: bool,
    pub exit_code: i64,
    pub log_frames: Vec<Vec<u8>>,
    pub state_after_start: String,
}

impl Default for FakeBehavior {
    fn default() -> Self {
        Self {
            ping_fails: false,
            version_fails: false,
            list_fails: false,
            launch_error: None,
            status_fails: false,
            wait_fails: false,
            wait_hangs: false,
            logs_fail: false,
            remove_fails: false,
            exit_code: 0,
            log_frames: Vec::new(),
            state_after_start: "running".to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct FakeState {
    containers: BTreeMap<String, String>,
    calls: Vec<String>,
    specs: Vec<ContainerSpec>,
    next_id: u64,
}

pub(crate) struct FakeRuntime {
    behavior: FakeBehavior,
    state: Mutex<FakeState>,
}

impl FakeRuntime {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Seeds a container that existed before the test started
    pub fn with_container(self, name: &str, state: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .containers
            .insert(name.to_string(), state.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Every spec passed to create_and_start, in order
    pub fn specs(&self) -> Vec<ContainerSpec> {
        self.state.lock().unwrap().specs.clone()
    }

    pub fn count(&self, name: &str) -> usize {
        usize::from(self.state.lock().unwrap().containers.contains_key(name))
    }

    pub fn state_of(&self, name: &str) -> Option<String> {
        self.state.lock().unwrap().containers.get(name).cloned()
    }

    fn record(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn not_found(name: &str) -> RuntimeError {
        RuntimeError::daemon(404, format!("no container with name or ID \"{}\" found", name))
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn ping(&self) -> Result<(), RuntimeError> {
        self.record("ping".to_string());
        if self.behavior.ping_fails {
            return Err(RuntimeError::Unavailable {
                endpoint: "fake".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn version(&self) -> Result<DaemonVersion, RuntimeError> {
        self.record("version".to_string());
        if self.behavior.version_fails {
            return Err(RuntimeError::daemon(500, "version unavailable"));
        }
        Ok(DaemonVersion {
            release: Some("5.0.0".to_string()),
            api_version: Some("1.41".to_string()),
        })
    }

    async fn list_containers(&self, name: &str) -> Result<Vec<ContainerSummary>, RuntimeError> {
        self.record(format!("list:{}", name));
        if self.behavior.list_fails {
            return Err(RuntimeError::Transport("list failed".to_string()));
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .containers
            .get(name)
            .map(|s| ContainerSummary {
                id: format!("id-{}", name),
                name: name.to_string(),
                state: s.clone(),
            })
            .into_iter()
            .collect())
    }

    async fn create_and_start(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        self.record(format!("create:{}", spec.name));
        self.state.lock().unwrap().specs.push(spec.clone());
        if let Some(message) = &self.behavior.launch_error {
            return Err(RuntimeError::daemon(404, message.clone()));
        }

        let mut state = self.state.lock().unwrap();
        if state.containers.contains_key(&spec.name) {
            return Err(RuntimeError::daemon(
                409,
                format!("the container name \"{}\" is already in use", spec.name),
            ));
        }
        state.next_id += 1;
        state
            .containers
            .insert(spec.name.clone(), self.behavior.state_after_start.clone());
        Ok(format!("id-{}", state.next_id))
    }

    async fn status(&self, name: &str) -> Result<String, RuntimeError> {
        self.record(format!("status:{}", name));
        if self.behavior.status_fails {
            return Err(RuntimeError::Transport("inspect failed".to_string()));
        }
        self.state_of(name).ok_or_else(|| Self::not_found(name))
    }

    async fn wait(&self, name: &str) -> Result<i64, RuntimeError> {
        self.record(format!("wait:{}", name));
        if self.behavior.wait_hangs {
            return std::future::pending().await;
        }
        if self.behavior.wait_fails {
            return Err(RuntimeError::Transport("connection reset by peer".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        match state.containers.get_mut(name) {
            Some(s) => {
                *s = "exited".to_string();
                Ok(self.behavior.exit_code)
            }
            None => Err(Self::not_found(name)),
        }
    }

    async fn logs(&self, name: &str) -> Result<Vec<Vec<u8>>, RuntimeError> {
        self.record(format!("logs:{}", name));
        if self.behavior.logs_fail {
            return Err(RuntimeError::daemon(500, "log driver unavailable"));
        }
        if self.state_of(name).is_none() {
            return Err(Self::not_found(name));
        }
        Ok(self.behavior.log_frames.clone())
    }

    async fn stop(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("stop:{}", name));
        let mut state = self.state.lock().unwrap();
        match state.containers.get_mut(name) {
            Some(s) => {
                *s = "exited".to_string();
                Ok(())
            }
            None => Err(Self::not_found(name)),
        }
    }

    async fn remove(&self, name: &str) -> Result<(), RuntimeError> {
        self.record(format!("remove:{}", name));
        if self.behavior.remove_fails {
            return Err(RuntimeError::daemon(500, "container is busy"));
        }
        match self.state.lock().unwrap().containers.remove(name) {
            Some(_) => Ok(()),
            None => Err(Self::not_found(name)),
        }
    }
}
