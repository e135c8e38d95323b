//! Collaborator contracts for the greenlight engine
//!
//! The engine itself performs no I/O. Callers read a [`ProjectRecord`] from a
//! [`ProjectRecordStore`], run a decision, write the new state back with the
//! version they read, and append one [`AuditEntry`] to an [`AuditLogSink`].
//!
//! Stores must provide a conditional write: a write carrying an expected version
//! fails with [`StoreError::VersionConflict`] when another writer got there first.
//! A write without an expected version is last-writer-wins.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::approvals::{AuditEntry, ProjectApprovalState};

pub mod file;
pub mod memory;

pub use file::{FileAuditLog, FileProjectStore};
pub use memory::{InMemoryAuditLog, InMemoryProjectStore};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Project not found: {project_id}")]
    NotFound { project_id: String },

    #[error("Version conflict on project {project_id}: expected {expected}, found {found}")]
    VersionConflict {
        project_id: String,
        expected: u64,
        found: u64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid project id: {project_id:?}")]
    InvalidProjectId { project_id: String },

    #[error("Corrupt stored data: {reason}")]
    Corrupt { reason: String },

    #[error("Lock acquisition failed: {reason}")]
    Lock { reason: String },

    #[cfg(feature = "database")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::VersionConflict { .. })
    }
}

/// Versioned approval state of one project, as held by the record store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub approvals: ProjectApprovalState,
}

impl ProjectRecord {
    pub fn new(project_id: &str, approvals: ProjectApprovalState) -> Self {
        Self {
            project_id: project_id.to_string(),
            version: 0,
            approvals,
        }
    }
}

/// Holds per-role assignment and approval state for projects
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait ProjectRecordStore: Send + Sync {
    /// Fetch the current state and version of a project
    async fn read(&self, project_id: &str) -> Result<ProjectRecord, StoreError>;

    /// Replace a project's approval state, returning the new version.
    ///
    /// With `expected_version` set, fails with `VersionConflict` unless the stored
    /// version still equals it.
    async fn write(
        &self,
        project_id: &str,
        state: &ProjectApprovalState,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError>;
}

/// Append-only record of greenlight decisions
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait AuditLogSink: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError>;
}

/// Read access to an audit trail, in append order
#[async_trait]
pub trait AuditTrail: Send + Sync {
    async fn entries(&self, project_id: &str) -> Result<Vec<AuditEntry>, StoreError>;
}
