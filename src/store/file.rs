// JSON file backed project store and JSON-lines audit log
//
// Layout under the data directory:
//   projects/<id>.json      current ProjectRecord
//   projects/<id>.lock      exclusive lock held around compare-and-write
//   audit/<id>.jsonl        one AuditEntry per line, append only

use async_trait::async_trait;
use fd_lock::RwLock;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::{AuditLogSink, AuditTrail, ProjectRecord, ProjectRecordStore, StoreError};
use crate::approvals::{AuditEntry, ProjectApprovalState};

fn validate_project_id(project_id: &str) -> Result<(), StoreError> {
    let valid = !project_id.is_empty()
        && project_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !project_id.starts_with('.');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidProjectId {
            project_id: project_id.to_string(),
        })
    }
}

fn not_found(project_id: &str) -> StoreError {
    StoreError::NotFound {
        project_id: project_id.to_string(),
    }
}

fn read_record_blocking(path: &Path, project_id: &str) -> Result<ProjectRecord, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(serde_json::from_str(&contents)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(project_id)),
        Err(e) => Err(e.into()),
    }
}

fn write_record_blocking(path: &Path, record: &ProjectRecord) -> Result<(), StoreError> {
    let serialized = serde_json::to_vec_pretty(record)?;
    // Write to temporary file first, then rename
    let temp_file = path.with_extension("json.tmp");
    std::fs::write(&temp_file, serialized)?;
    std::fs::rename(&temp_file, path)?;
    Ok(())
}

/// Run `f` while holding the exclusive lock for one project
fn with_project_lock<T>(
    lock_path: &Path,
    f: impl FnOnce() -> Result<T, StoreError>,
) -> Result<T, StoreError> {
    let lock_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;
    let mut lock = RwLock::new(lock_file);
    let _guard = lock.write().map_err(|e| StoreError::Lock {
        reason: format!("{}: {e}", lock_path.display()),
    })?;
    f()
}

/// Project record store keeping one JSON document per project
#[derive(Debug, Clone)]
pub struct FileProjectStore {
    root: PathBuf,
}

impl FileProjectStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            root: data_dir.as_ref().join("projects"),
        }
    }

    fn record_path(&self, project_id: &str) -> PathBuf {
        self.root.join(format!("{project_id}.json"))
    }

    fn lock_path(&self, project_id: &str) -> PathBuf {
        self.root.join(format!("{project_id}.lock"))
    }

    /// Create a project document at version 0; fails if it already exists
    pub async fn create(
        &self,
        project_id: &str,
        approvals: ProjectApprovalState,
    ) -> Result<ProjectRecord, StoreError> {
        validate_project_id(project_id)?;
        fs::create_dir_all(&self.root).await?;

        let record_path = self.record_path(project_id);
        let lock_path = self.lock_path(project_id);
        let record = ProjectRecord::new(project_id, approvals);

        let record = tokio::task::spawn_blocking(move || {
            with_project_lock(&lock_path, || {
                if record_path.exists() {
                    return Err(std::io::Error::new(
                        ErrorKind::AlreadyExists,
                        format!("{} already exists", record_path.display()),
                    )
                    .into());
                }
                write_record_blocking(&record_path, &record)?;
                Ok(record)
            })
        })
        .await
        .map_err(|e| StoreError::Lock {
            reason: format!("create task failed: {e}"),
        })??;

        info!(project_id = %project_id, "Created project approval record");
        Ok(record)
    }
}

#[async_trait]
impl ProjectRecordStore for FileProjectStore {
    async fn read(&self, project_id: &str) -> Result<ProjectRecord, StoreError> {
        validate_project_id(project_id)?;
        let path = self.record_path(project_id);

        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(not_found(project_id)),
            Err(e) => return Err(e.into()),
        };

        let record: ProjectRecord = serde_json::from_str(&contents)?;
        debug!(project_id = %project_id, version = record.version, "Loaded project record");
        Ok(record)
    }

    async fn write(
        &self,
        project_id: &str,
        state: &ProjectApprovalState,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        validate_project_id(project_id)?;

        let record_path = self.record_path(project_id);
        let lock_path = self.lock_path(project_id);
        let project_id = project_id.to_string();
        let state = state.clone();

        tokio::task::spawn_blocking(move || -> Result<u64, StoreError> {
            if !record_path.exists() {
                return Err(not_found(&project_id));
            }
            with_project_lock(&lock_path, || {
                let mut record = read_record_blocking(&record_path, &project_id)?;
                match expected_version {
                    Some(expected) if expected != record.version => {
                        return Err(StoreError::VersionConflict {
                            project_id,
                            expected,
                            found: record.version,
                        });
                    }
                    Some(_) => {}
                    None => warn!(
                        project_id = %project_id,
                        version = record.version,
                        "Unconditional write to project approvals (last writer wins)"
                    ),
                }

                record.version += 1;
                record.approvals = state;
                write_record_blocking(&record_path, &record)?;

                debug!(project_id = %project_id, version = record.version, "Wrote project record");
                Ok(record.version)
            })
        })
        .await
        .map_err(|e| StoreError::Lock {
            reason: format!("write task failed: {e}"),
        })?
    }
}

/// Audit log writing one JSON line per entry, per project
#[derive(Debug, Clone)]
pub struct FileAuditLog {
    root: PathBuf,
}

impl FileAuditLog {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            root: data_dir.as_ref().join("audit"),
        }
    }

    fn log_path(&self, project_id: &str) -> PathBuf {
        self.root.join(format!("{project_id}.jsonl"))
    }
}

#[async_trait]
impl AuditLogSink for FileAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        validate_project_id(&entry.project_id)?;
        fs::create_dir_all(&self.root).await?;

        if self
            .entries(&entry.project_id)
            .await?
            .iter()
            .any(|existing| existing.id == entry.id)
        {
            debug!(entry_id = %entry.id, "Audit entry already recorded");
            return Ok(());
        }

        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(&entry.project_id))
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        debug!(project_id = %entry.project_id, entry_id = %entry.id, "Appended audit entry");
        Ok(())
    }
}

#[async_trait]
impl AuditTrail for FileAuditLog {
    async fn entries(&self, project_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        validate_project_id(project_id)?;

        let contents = match fs::read_to_string(self.log_path(project_id)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }
}
