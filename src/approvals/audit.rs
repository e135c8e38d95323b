// Audit records emitted for greenlight decisions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{Decision, Role};

/// Action name recorded for every greenlight decision
pub const GREENLIGHT_ACTION: &str = "greenlight_decision";

/// Entity type the decision applies to
pub const GREENLIGHT_TARGET: &str = "Project";

/// Record of one accepted decision, produced by the engine and persisted by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub actor_identity: String,
    pub role: Role,
    pub decision: Decision,
    pub comment: Option<String>,
    /// Whether this decision completed the set of required approvals
    pub all_approvals_complete: bool,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn role_label(&self) -> &'static str {
        self.role.label()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditMetadata {
    pub approver_role: Role,
    pub decision: Decision,
    pub comment: Option<String>,
    pub all_approvals_complete: bool,
}

/// An append-only audit trail entry as handed to the audit log sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub project_id: String,
    pub actor_identity: String,
    pub actor_role_label: String,
    pub action: String,
    pub target: String,
    pub metadata: AuditMetadata,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn from_event(project_id: &str, event: &AuditEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            actor_identity: event.actor_identity.clone(),
            actor_role_label: event.role_label().to_string(),
            action: GREENLIGHT_ACTION.to_string(),
            target: GREENLIGHT_TARGET.to_string(),
            metadata: AuditMetadata {
                approver_role: event.role,
                decision: event.decision,
                comment: event.comment.clone(),
                all_approvals_complete: event.all_approvals_complete,
            },
            created_at: event.occurred_at,
        }
    }

    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} {} {} as {}",
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.actor_identity,
            match self.metadata.decision {
                Decision::Approve => "approved",
                Decision::Reject => "rejected",
            },
            self.actor_role_label
        );
        if let Some(comment) = &self.metadata.comment {
            line.push_str(&format!(": \"{comment}\""));
        }
        if self.metadata.all_approvals_complete {
            line.push_str(" [greenlit]");
        }
        line
    }
}
