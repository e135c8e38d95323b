// In-memory store and audit log, for embedding and tests

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::{AuditLogSink, AuditTrail, ProjectRecord, ProjectRecordStore, StoreError};
use crate::approvals::{AuditEntry, ProjectApprovalState};

#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    records: RwLock<HashMap<String, ProjectRecord>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project with its initial approval state at version 0
    pub async fn insert(&self, project_id: &str, approvals: ProjectApprovalState) {
        self.records
            .write()
            .await
            .insert(project_id.to_string(), ProjectRecord::new(project_id, approvals));
    }
}

#[async_trait]
impl ProjectRecordStore for InMemoryProjectStore {
    async fn read(&self, project_id: &str) -> Result<ProjectRecord, StoreError> {
        self.records
            .read()
            .await
            .get(project_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                project_id: project_id.to_string(),
            })
    }

    async fn write(
        &self,
        project_id: &str,
        state: &ProjectApprovalState,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(project_id)
            .ok_or_else(|| StoreError::NotFound {
                project_id: project_id.to_string(),
            })?;

        match expected_version {
            Some(expected) if expected != record.version => {
                return Err(StoreError::VersionConflict {
                    project_id: project_id.to_string(),
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
        record.approvals = state.clone();
        Ok(record.version)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl AuditLogSink for InMemoryAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|existing| existing.id == entry.id) {
            debug!(entry_id = %entry.id, "Audit entry already recorded");
            return Ok(());
        }
        entries.push(entry.clone());
        Ok(())
    }
}

#[async_trait]
impl AuditTrail for InMemoryAuditLog {
    async fn entries(&self, project_id: &str) -> Result<Vec<AuditEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|entry| entry.project_id == project_id)
            .cloned()
            .collect())
    }
}
