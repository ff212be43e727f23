//! Durable JSON-on-disk project records.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};

use vtour_models::PipelineProject;

use crate::error::{StoreError, StoreResult};

/// File name of the project record inside each project directory.
const PROJECT_FILE: &str = "project.json";

/// Store rooted at a projects directory, one subdirectory per project id.
///
/// Writes replace the whole record atomically, so a concurrent reader never
/// observes a partial document.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one project's record and stage outputs.
    pub fn project_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    fn project_file(&self, id: &str) -> PathBuf {
        self.project_dir(id).join(PROJECT_FILE)
    }

    /// Persist the full record, restamping `updated_at`.
    ///
    /// Called on every stage transition and appended log line; writes to a
    /// temp file in the project directory, then renames over the record.
    pub async fn write(&self, project: &mut PipelineProject) -> StoreResult<()> {
        let dir = self.project_dir(&project.id);
        fs::create_dir_all(&dir).await?;

        project.updated_at = Utc::now();
        let body = serde_json::to_vec_pretty(project)?;

        let tmp = dir.join(format!("{PROJECT_FILE}.tmp"));
        fs::write(&tmp, &body).await?;
        fs::rename(&tmp, dir.join(PROJECT_FILE)).await?;

        debug!(project_id = %project.id, status = %project.status, "project persisted");
        Ok(())
    }

    /// Load one project by id; absent or malformed records are `NotFound`.
    pub async fn read(&self, id: &str) -> StoreResult<PipelineProject> {
        let raw = fs::read(self.project_file(id))
            .await
            .map_err(|_| StoreError::NotFound(id.to_string()))?;
        serde_json::from_slice(&raw).map_err(|err| {
            warn!(project_id = %id, %err, "unreadable project record");
            StoreError::NotFound(id.to_string())
        })
    }

    /// All valid projects under the root, most recently touched first.
    ///
    /// Directories without a readable record are skipped.
    pub async fn scan(&self) -> StoreResult<Vec<PipelineProject>> {
        fs::create_dir_all(&self.root).await?;

        let mut projects = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let record = entry.path().join(PROJECT_FILE);
            let Ok(raw) = fs::read(&record).await else {
                continue;
            };
            match serde_json::from_slice::<PipelineProject>(&raw) {
                Ok(project) => projects.push(project),
                Err(err) => {
                    debug!(path = %record.display(), %err, "skipping invalid project record");
                }
            }
        }

        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    /// Remove a project directory and everything in it.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        fs::remove_dir_all(self.project_dir(id))
            .await
            .map_err(|_| StoreError::NotFound(id.to_string()))
    }
}
