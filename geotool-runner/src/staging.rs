//! Per-job directory staging
//!
//! Every tool run gets its own input and output directory under the data root:
//! `<root>/in/<user>/<job>` and `<root>/out/<user>/<job>`. The directories are
//! created on the host side of the data root and mounted from the daemon side,
//! which differ when the service runs in a container itself.

use geotool_core::{BindMount, CONTAINER_IN, CONTAINER_OUT, RemovalReport};
use serde_json::Value as JsonValue;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RunnerConfig;
use crate::error::StagingError;

/// User segment for anonymous requests
pub const NO_USER: &str = "NO_USER";

const IN_DIR: &str = "in";
const OUT_DIR: &str = "out";

/// Random 10-hex-char suffix for job directories and container names
pub fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

/// Creates and removes job directories under the configured data roots
#[derive(Debug, Clone)]
pub struct JobStaging {
    host_root: PathBuf,
    server_root: PathBuf,
    shared_data_path: Option<String>,
    dir_mode: u32,
}

impl JobStaging {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            host_root: config.host_data_root.clone(),
            server_root: config.server_data_root.clone(),
            shared_data_path: config.shared_data_path.clone(),
            dir_mode: 0o775,
        }
    }

    /// Creates the input and output directory of a new job
    ///
    /// # Arguments
    /// * `tool_id` - Tool the job runs, used as directory prefix
    /// * `user` - Requesting user, `NO_USER` when absent
    ///
    /// # Errors
    /// `StagingError::InvalidInput` if the user is not a single path segment
    pub fn stage(&self, tool_id: &str, user: Option<&str>) -> Result<StagedJob, StagingError> {
        let user = user.filter(|u| !u.is_empty()).unwrap_or(NO_USER);
        if !is_single_segment(user) {
            return Err(StagingError::InvalidInput(format!(
                "user '{}' is not a valid directory name",
                user
            )));
        }

        let job_id = format!("{}_{}", tool_id, short_id());

        let job = StagedJob {
            host_in: self.host_root.join(IN_DIR).join(user).join(&job_id),
            host_out: self.host_root.join(OUT_DIR).join(user).join(&job_id),
            server_in: self.server_root.join(IN_DIR).join(user).join(&job_id),
            server_out: self.server_root.join(OUT_DIR).join(user).join(&job_id),
            shared_data_path: self.shared_data_path.clone(),
            user: user.to_string(),
            job_id,
        };

        self.create_dir(&job.host_in)?;
        self.create_dir(&job.host_out)?;

        debug!(
            "Staged job {} at {} (daemon side: {})",
            job.job_id,
            job.host_in.display(),
            job.server_in.display()
        );
        Ok(job)
    }

    fn create_dir(&self, path: &Path) -> Result<(), StagingError> {
        std::fs::create_dir_all(path).map_err(|e| StagingError::io(path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(self.dir_mode))
                .map_err(|e| StagingError::io(path, e))?;
        }

        Ok(())
    }

    /// Removes the directories of a job that never ran
    pub fn discard(&self, job: &StagedJob) {
        for dir in [&job.host_in, &job.host_out] {
            if let Err(e) = std::fs::remove_dir_all(dir) {
                warn!("Failed to discard {}: {}", dir.display(), e);
            }
        }
    }

    /// Deletes job result folders
    ///
    /// Input folders must lie under `<root>/in`, output folders under
    /// `<root>/out`, of either data root. Daemon-side paths are translated to
    /// the host side before deletion. Anything else is refused.
    pub fn remove_results(&self, input_folders: &[String], output_folders: &[String]) -> RemovalReport {
        let mut report = RemovalReport::default();
        self.remove_folders(input_folders, IN_DIR, &mut report);
        self.remove_folders(output_folders, OUT_DIR, &mut report);

        info!(
            "Removed {} folder(s), {} not removed",
            report.removed.len(),
            report.not_removed.len()
        );
        report
    }

    fn remove_folders(&self, folders: &[String], area: &str, report: &mut RemovalReport) {
        for folder in folders {
            let result = match self.resolve_host_path(Path::new(folder), area) {
                Some(path) => {
                    std::fs::remove_dir_all(&path).map_err(|e| format!("{}: {}", folder, e))
                }
                None => Err(format!(
                    "{}: not a job folder under the {} data root",
                    folder, area
                )),
            };

            match result {
                Ok(()) => {
                    info!("Removed {} folder {}", area, folder);
                    report.removed.push(folder.clone());
                }
                Err(e) => {
                    warn!("Unable to remove {} folder. Error: {}", area, e);
                    report.not_removed.push(folder.clone());
                    report.errors.push(e);
                }
            }
        }
    }

    /// Maps a folder to its host path if it lies strictly inside `<root>/<area>`
    fn resolve_host_path(&self, folder: &Path, area: &str) -> Option<PathBuf> {
        if folder
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::CurDir))
        {
            return None;
        }

        let host_area = self.host_root.join(area);
        let server_area = self.server_root.join(area);

        let relative = folder
            .strip_prefix(&host_area)
            .or_else(|_| folder.strip_prefix(&server_area))
            .ok()?;

        if relative.as_os_str().is_empty() {
            return None;
        }

        Some(host_area.join(relative))
    }
}

/// Directories of one staged job
#[derive(Debug, Clone)]
pub struct StagedJob {
    job_id: String,
    user: String,
    host_in: PathBuf,
    host_out: PathBuf,
    server_in: PathBuf,
    server_out: PathBuf,
    shared_data_path: Option<String>,
}

impl StagedJob {
    /// Job directory name, `<tool_id>_<10 hex>`
    pub fn id(&self) -> &str {
        &self.job_id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn host_input_dir(&self) -> &Path {
        &self.host_in
    }

    pub fn host_output_dir(&self) -> &Path {
        &self.host_out
    }

    /// Output directory as the daemon and the endpoint caller see it
    pub fn output_dir(&self) -> String {
        self.server_out.display().to_string()
    }

    /// Writes a JSON document into the input directory
    ///
    /// # Returns
    /// Host path of the written file
    pub fn write_parameters(
        &self,
        file_name: &str,
        parameters: &JsonValue,
    ) -> Result<PathBuf, StagingError> {
        if !is_single_segment(file_name) {
            return Err(StagingError::InvalidInput(format!(
                "invalid parameter file name '{}'",
                file_name
            )));
        }

        let path = self.host_in.join(file_name);
        let content = serde_json::to_string_pretty(parameters)?;
        std::fs::write(&path, content).map_err(|e| StagingError::io(&path, e))?;

        debug!("Wrote {}", path.display());
        Ok(path)
    }

    /// Copies a data file into the input directory
    ///
    /// # Returns
    /// The file's path inside the container, `/in/<file name>`
    ///
    /// # Errors
    /// `StagingError::InvalidInput` if a file with the same name was already
    /// staged for this job
    pub fn copy_input(&self, source: &Path) -> Result<String, StagingError> {
        let file_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                StagingError::InvalidInput(format!("{} has no file name", source.display()))
            })?;

        let target = self.host_in.join(file_name);
        if target.exists() {
            return Err(StagingError::InvalidInput(format!(
                "{} clashes with an already staged input named {}",
                source.display(),
                file_name
            )));
        }

        std::fs::copy(source, &target).map_err(|e| StagingError::io(source, e))?;

        debug!("Copied {} to {}", source.display(), target.display());
        Ok(format!("{}/{}", CONTAINER_IN, file_name))
    }

    /// Bind mounts for the job container
    ///
    /// Input is read-only, output read-write, and the shared dataset
    /// directory (if any) is mounted read-only at its own path.
    pub fn mounts(&self) -> Vec<BindMount> {
        let mut mounts = Vec::with_capacity(3);

        if let Some(shared) = &self.shared_data_path {
            mounts.push(BindMount::read_only(shared.clone(), shared.clone()));
        }

        mounts.push(BindMount::read_only(
            self.server_in.display().to_string(),
            CONTAINER_IN,
        ));
        mounts.push(BindMount::read_write(
            self.server_out.display().to_string(),
            CONTAINER_OUT,
        ));

        mounts
    }
}

fn is_single_segment(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
