// Core types for the greenlight approval workflow

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stakeholder roles that may be asked to sign off on a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Producer,
    Legal,
    Finance,
    Executive,
    Client,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Producer,
        Role::Legal,
        Role::Finance,
        Role::Executive,
        Role::Client,
    ];

    /// Human-readable label, as shown in audit entries
    pub fn label(&self) -> &'static str {
        match self {
            Role::Producer => "Producer",
            Role::Legal => "Legal",
            Role::Finance => "Finance",
            Role::Executive => "Executive",
            Role::Client => "Client",
        }
    }

    /// Stable key used in stored state and audit metadata
    pub fn key(&self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Legal => "legal",
            Role::Finance => "finance",
            Role::Executive => "executive",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown role '{0}' (expected one of: producer, legal, finance, executive, client)")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.key().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Outcome an approver records for their role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Approve => "approve",
            Decision::Reject => "reject",
        }
    }

    pub fn is_approve(&self) -> bool {
        matches!(self, Decision::Approve)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval record for a single role on a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleApproval {
    /// Approver assigned to this role; absent or empty means the role is not required
    pub assigned_email: Option<String>,
    pub approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub comment: Option<String>,
}

impl RoleApproval {
    /// Unassigned role, as created implicitly with a new project
    pub fn unassigned() -> Self {
        Self::default()
    }

    pub fn is_required(&self) -> bool {
        self.assigned_email
            .as_deref()
            .is_some_and(|email| !email.is_empty())
    }

    pub fn is_assigned_to(&self, identity: &str) -> bool {
        self.is_required() && self.assigned_email.as_deref() == Some(identity)
    }

    pub fn status(&self) -> RoleStatus {
        if !self.is_required() {
            RoleStatus::NotRequired
        } else if self.approved {
            RoleStatus::Approved
        } else if self.approved_at.is_some() {
            RoleStatus::Rejected
        } else {
            RoleStatus::Pending
        }
    }
}

/// Derived, display-only view of a role's position in the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleStatus {
    NotRequired,
    Pending,
    /// A rejection was recorded; the role can still be decided again
    Rejected,
    Approved,
}

impl fmt::Display for RoleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RoleStatus::NotRequired => "not required",
            RoleStatus::Pending => "pending",
            RoleStatus::Rejected => "rejected",
            RoleStatus::Approved => "approved",
        };
        f.write_str(text)
    }
}

/// Greenlight approval state for one project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectApprovalState {
    pub producer: RoleApproval,
    pub legal: RoleApproval,
    pub finance: RoleApproval,
    pub executive: RoleApproval,
    pub client: RoleApproval,
    /// Set once, the first time every required role is approved
    pub all_approvals_completed_at: Option<DateTime<Utc>>,
}

impl ProjectApprovalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper for assigning an approver to a role
    pub fn with_assignment(mut self, role: Role, email: &str) -> Self {
        self.role_mut(role).assigned_email = Some(email.to_string());
        self
    }

    pub fn role(&self, role: Role) -> &RoleApproval {
        match role {
            Role::Producer => &self.producer,
            Role::Legal => &self.legal,
            Role::Finance => &self.finance,
            Role::Executive => &self.executive,
            Role::Client => &self.client,
        }
    }

    pub fn role_mut(&mut self, role: Role) -> &mut RoleApproval {
        match role {
            Role::Producer => &mut self.producer,
            Role::Legal => &mut self.legal,
            Role::Finance => &mut self.finance,
            Role::Executive => &mut self.executive,
            Role::Client => &mut self.client,
        }
    }

    /// Iterate roles with their records in enumeration order
    pub fn roles(&self) -> impl Iterator<Item = (Role, &RoleApproval)> + '_ {
        Role::ALL.into_iter().map(move |role| (role, self.role(role)))
    }

    pub fn required_roles(&self) -> Vec<Role> {
        self.roles()
            .filter(|(_, approval)| approval.is_required())
            .map(|(role, _)| role)
            .collect()
    }

    pub fn is_greenlit(&self) -> bool {
        self.progress().all_approved
    }

    pub fn progress(&self) -> Progress {
        Progress::of(self)
    }
}

/// Completion summary across the required roles of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub required_count: usize,
    pub completed_count: usize,
    pub percent: u8,
    pub all_approved: bool,
}

impl Progress {
    pub fn of(state: &ProjectApprovalState) -> Self {
        let (required_count, completed_count) =
            state
                .roles()
                .fold((0usize, 0usize), |(required, completed), (_, approval)| {
                    if approval.is_required() {
                        (required + 1, completed + usize::from(approval.approved))
                    } else {
                        (required, completed)
                    }
                });

        // round(100 * completed / required), halves rounded up
        let percent = if required_count == 0 {
            0
        } else {
            ((200 * completed_count + required_count) / (2 * required_count)) as u8
        };

        Self {
            required_count,
            completed_count,
            percent,
            all_approved: required_count > 0 && completed_count == required_count,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} approvals ({}%)",
            self.completed_count, self.required_count, self.percent
        )
    }
}
