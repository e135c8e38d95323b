// Greenlight decision engine - pure, synchronous, no I/O
//
// The engine validates a decision against a snapshot of project state and returns
// the next state together with the audit event to persist. The input snapshot is
// never mutated, so a refused decision leaves nothing to roll back.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use super::audit::AuditEvent;
use super::types::{Decision, ProjectApprovalState, Progress, Role};

/// Precondition failures of `decide`, checked in declaration order
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GreenlightError {
    #[error("Role {role} has no assigned approver on this project")]
    RoleNotApplicable { role: Role },
    #[error("{identity} is not the assigned approver for role {role}")]
    NotAuthorized { role: Role, identity: String },
    #[error("Role {role} has already been approved")]
    AlreadyDecided { role: Role },
}

impl GreenlightError {
    pub fn role(&self) -> Role {
        match self {
            GreenlightError::RoleNotApplicable { role }
            | GreenlightError::NotAuthorized { role, .. }
            | GreenlightError::AlreadyDecided { role } => *role,
        }
    }

    /// Short machine-friendly name of the failure
    pub fn kind(&self) -> &'static str {
        match self {
            GreenlightError::RoleNotApplicable { .. } => "RoleNotApplicable",
            GreenlightError::NotAuthorized { .. } => "NotAuthorized",
            GreenlightError::AlreadyDecided { .. } => "AlreadyDecided",
        }
    }

    /// Corrective action for the person who hit the error
    pub fn hint(&self) -> &'static str {
        match self {
            GreenlightError::RoleNotApplicable { .. } => {
                "Assign an approver to this role before recording a decision"
            }
            GreenlightError::NotAuthorized { .. } => {
                "Switch to the account of the role's assigned approver"
            }
            GreenlightError::AlreadyDecided { .. } => {
                "Refresh the project; this approval is already recorded and cannot be changed"
            }
        }
    }
}

/// Source of the current time for decision timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Result of an accepted decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionResult {
    pub state: ProjectApprovalState,
    pub event: AuditEvent,
}

impl DecisionResult {
    /// True when this decision moved the project into the greenlit state
    pub fn greenlit(&self) -> bool {
        self.event.all_approvals_complete
    }
}

#[derive(Clone)]
pub struct GreenlightEngine {
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for GreenlightEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GreenlightEngine").finish_non_exhaustive()
    }
}

impl Default for GreenlightEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GreenlightEngine {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Validate and apply one approve/reject decision for `role`.
    ///
    /// Preconditions are checked in order: the role must be required, the acting
    /// identity must match the assigned email exactly, and the role must not be
    /// approved yet.
    pub fn decide(
        &self,
        state: &ProjectApprovalState,
        role: Role,
        acting_identity: &str,
        decision: Decision,
        comment: Option<&str>,
    ) -> Result<DecisionResult, GreenlightError> {
        if let Err(e) = Self::check_preconditions(state, role, acting_identity) {
            tracing::warn!(
                role = role.key(),
                identity = %acting_identity,
                decision = decision.as_str(),
                error = e.kind(),
                "Greenlight decision refused"
            );
            return Err(e);
        }

        let now = self.clock.now();
        let mut next = state.clone();

        let record = next.role_mut(role);
        record.approved = decision.is_approve();
        record.approved_at = Some(now);
        record.approved_by = Some(acting_identity.to_string());
        record.comment = comment
            .filter(|text| !text.is_empty())
            .map(str::to_string);

        let all_approved = Progress::of(&next).all_approved;
        let completes_greenlight = all_approved
            && decision.is_approve()
            && next.all_approvals_completed_at.is_none();

        if completes_greenlight {
            next.all_approvals_completed_at = Some(now);
        }

        let event = AuditEvent {
            actor_identity: acting_identity.to_string(),
            role,
            decision,
            comment: next.role(role).comment.clone(),
            all_approvals_complete: completes_greenlight,
            occurred_at: now,
        };

        tracing::info!(
            role = role.key(),
            identity = %acting_identity,
            decision = decision.as_str(),
            greenlit = completes_greenlight,
            "Greenlight decision recorded"
        );

        Ok(DecisionResult { state: next, event })
    }

    fn check_preconditions(
        state: &ProjectApprovalState,
        role: Role,
        acting_identity: &str,
    ) -> Result<(), GreenlightError> {
        let record = state.role(role);

        if !record.is_required() {
            return Err(GreenlightError::RoleNotApplicable { role });
        }
        if record.assigned_email.as_deref() != Some(acting_identity) {
            return Err(GreenlightError::NotAuthorized {
                role,
                identity: acting_identity.to_string(),
            });
        }
        if record.approved {
            return Err(GreenlightError::AlreadyDecided { role });
        }
        Ok(())
    }

    pub fn progress(&self, state: &ProjectApprovalState) -> Progress {
        Progress::of(state)
    }

    /// Roles `acting_identity` may decide right now, in enumeration order
    pub fn actionable_roles(&self, state: &ProjectApprovalState, acting_identity: &str) -> Vec<Role> {
        state
            .roles()
            .filter(|(_, record)| record.is_assigned_to(acting_identity) && !record.approved)
            .map(|(role, _)| role)
            .collect()
    }
}
