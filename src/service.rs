//! Greenlight service: fetch → decide → conditional write → audit append
//!
//! The engine decides against a snapshot; this layer owns the read-modify-write
//! cycle around it. Writes carry the version that was read, and a
//! `VersionConflict` causes the decision to be re-derived against fresh state.

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn, Instrument};

use crate::approvals::{
    AuditEntry, Decision, DecisionResult, GreenlightEngine, GreenlightError, ProjectApprovalState,
    Progress, Role,
};
use crate::observability::{decision_metrics, OperationTimer};
use crate::store::{AuditLogSink, ProjectRecordStore, StoreError};
use crate::telemetry::{create_decision_span, generate_correlation_id};

/// Extra attempts after the first when the store reports a version conflict
pub const DEFAULT_MAX_CONFLICT_RETRIES: u32 = 3;

/// Extra append attempts, with the same entry, after an audit sink failure
pub const DEFAULT_MAX_AUDIT_RETRIES: u32 = 2;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Decision(#[from] GreenlightError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Gave up after {attempts} attempts: project state kept changing under concurrent writers")]
    ConflictRetriesExhausted { attempts: u32 },

    /// The state write landed but the audit entry did not. `entry` is the exact entry
    /// to re-append (see [`GreenlightService::reappend_audit`]); sinks skip ids they
    /// already hold.
    #[error("Decision saved at version {version} but audit entry {} could not be appended: {source}", .entry.id)]
    AuditAppend {
        version: u64,
        entry: Box<AuditEntry>,
        #[source]
        source: StoreError,
    },
}

impl ServiceError {
    /// Precondition failure reported by the engine, if that is what this is
    pub fn decision_error(&self) -> Option<&GreenlightError> {
        match self {
            ServiceError::Decision(e) => Some(e),
            _ => None,
        }
    }

    /// Audit entry of a decision that was saved without its audit record
    pub fn unrecorded_audit_entry(&self) -> Option<&AuditEntry> {
        match self {
            ServiceError::AuditAppend { entry, .. } => Some(entry),
            _ => None,
        }
    }
}

/// A persisted decision
#[derive(Debug, Clone)]
pub struct DecisionOutcome {
    pub project_id: String,
    pub version: u64,
    pub state: ProjectApprovalState,
    pub audit_entry: AuditEntry,
    pub progress: Progress,
    /// Attempts taken, including the one that succeeded
    pub attempts: u32,
}

impl DecisionOutcome {
    pub fn greenlit(&self) -> bool {
        self.audit_entry.metadata.all_approvals_complete
    }
}

pub struct GreenlightService {
    engine: GreenlightEngine,
    store: Arc<dyn ProjectRecordStore>,
    audit_log: Arc<dyn AuditLogSink>,
    max_conflict_retries: u32,
    max_audit_retries: u32,
}

impl GreenlightService {
    pub fn new(store: Arc<dyn ProjectRecordStore>, audit_log: Arc<dyn AuditLogSink>) -> Self {
        Self {
            engine: GreenlightEngine::new(),
            store,
            audit_log,
            max_conflict_retries: DEFAULT_MAX_CONFLICT_RETRIES,
            max_audit_retries: DEFAULT_MAX_AUDIT_RETRIES,
        }
    }

    pub fn with_engine(mut self, engine: GreenlightEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    pub fn with_max_audit_retries(mut self, retries: u32) -> Self {
        self.max_audit_retries = retries;
        self
    }

    /// Record a decision for `role` on `project_id` and append its audit entry.
    ///
    /// Precondition failures are returned without writing anything. On a version
    /// conflict the project is re-read and the decision re-derived, so a decision
    /// that became invalid in the meantime (for example `AlreadyDecided`) surfaces
    /// as that error rather than overwriting the other writer.
    pub async fn decide(
        &self,
        project_id: &str,
        role: Role,
        acting_identity: &str,
        decision: Decision,
        comment: Option<&str>,
    ) -> Result<DecisionOutcome, ServiceError> {
        let correlation_id = generate_correlation_id();
        let span = create_decision_span(project_id, role.key(), acting_identity, &correlation_id);

        let timer = OperationTimer::new("greenlight_decision");
        let result = self
            .decide_with_retries(project_id, role, acting_identity, decision, comment)
            .instrument(span)
            .await;
        timer.finish();
        result
    }

    async fn decide_with_retries(
        &self,
        project_id: &str,
        role: Role,
        acting_identity: &str,
        decision: Decision,
        comment: Option<&str>,
    ) -> Result<DecisionOutcome, ServiceError> {
        let metrics = decision_metrics();
        let max_attempts = self.max_conflict_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let record = self.store.read(project_id).await?;

            let DecisionResult { state, event } = match self.engine.decide(
                &record.approvals,
                role,
                acting_identity,
                decision,
                comment,
            ) {
                Ok(result) => result,
                Err(e) => {
                    metrics.record_refused();
                    return Err(e.into());
                }
            };

            let version = match self
                .store
                .write(project_id, &state, Some(record.version))
                .await
            {
                Ok(version) => version,
                Err(e) if e.is_conflict() => {
                    metrics.record_version_conflict();
                    if attempt >= max_attempts {
                        warn!(
                            project_id = %project_id,
                            attempts = attempt,
                            "Giving up on greenlight decision after repeated version conflicts"
                        );
                        return Err(ServiceError::ConflictRetriesExhausted { attempts: attempt });
                    }
                    warn!(
                        project_id = %project_id,
                        attempt = attempt,
                        error = %e,
                        "Version conflict, re-deriving decision against fresh state"
                    );
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let audit_entry = AuditEntry::from_event(project_id, &event);
            self.append_audit(version, &audit_entry).await?;

            match decision {
                Decision::Approve => metrics.record_approval(),
                Decision::Reject => metrics.record_rejection(),
            }
            if event.all_approvals_complete {
                metrics.record_greenlight();
                info!(project_id = %project_id, "Project greenlit: all required approvals recorded");
            }

            let progress = Progress::of(&state);
            return Ok(DecisionOutcome {
                project_id: project_id.to_string(),
                version,
                state,
                audit_entry,
                progress,
                attempts: attempt,
            });
        }
    }

    /// Append `entry`, retrying the same entry a bounded number of times
    async fn append_audit(&self, version: u64, entry: &AuditEntry) -> Result<(), ServiceError> {
        let max_attempts = self.max_audit_retries.saturating_add(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.audit_log.append(entry).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_attempts => {
                    warn!(
                        project_id = %entry.project_id,
                        entry_id = %entry.id,
                        attempt = attempt,
                        error = %e,
                        "Audit append failed, retrying with the same entry"
                    );
                }
                Err(source) => {
                    decision_metrics().record_audit_failure();
                    warn!(
                        project_id = %entry.project_id,
                        entry_id = %entry.id,
                        version = version,
                        attempts = attempt,
                        error = %source,
                        "Audit append failed after state write"
                    );
                    return Err(ServiceError::AuditAppend {
                        version,
                        entry: Box::new(entry.clone()),
                        source,
                    });
                }
            }
        }
    }

    /// Re-append the entry carried by [`ServiceError::AuditAppend`]
    pub async fn reappend_audit(&self, entry: &AuditEntry) -> Result<(), ServiceError> {
        self.audit_log.append(entry).await?;
        info!(project_id = %entry.project_id, entry_id = %entry.id, "Recovered audit entry appended");
        Ok(())
    }

    pub async fn progress(&self, project_id: &str) -> Result<Progress, ServiceError> {
        let record = self.store.read(project_id).await?;
        Ok(self.engine.progress(&record.approvals))
    }

    pub async fn actionable_roles(
        &self,
        project_id: &str,
        acting_identity: &str,
    ) -> Result<Vec<Role>, ServiceError> {
        let record = self.store.read(project_id).await?;
        Ok(self.engine.actionable_roles(&record.approvals, acting_identity))
    }

    pub async fn state(&self, project_id: &str) -> Result<ProjectApprovalState, ServiceError> {
        Ok(self.store.read(project_id).await?.approvals)
    }
}
