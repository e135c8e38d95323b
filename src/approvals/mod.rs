// Greenlight Approval Module - Decision and Audit Engine
//
// Role-based sign-off for projects: typed per-role approval records, a pure
// decision function, progress queries and the audit events every accepted
// decision produces.

pub mod types;
pub mod engine;
pub mod audit;


pub use types::{Decision, ProjectApprovalState, Progress, Role, RoleApproval, RoleStatus, UnknownRole};
pub use engine::{Clock, DecisionResult, FixedClock, GreenlightEngine, GreenlightError, SystemClock};
pub use audit::{AuditEntry, AuditEvent, AuditMetadata, GREENLIGHT_ACTION, GREENLIGHT_TARGET};
