// Greenlight Library - Multi-Stakeholder Project Approvals
// Exposes the decision engine, stores and service for the CLI and for embedding

pub mod approvals;
pub mod cli;
pub mod config;
pub mod database;
pub mod observability;
pub mod service;
pub mod store;
pub mod telemetry;

// Re-export key types for easy access
pub use approvals::{
    AuditEntry, AuditEvent, Clock, Decision, DecisionResult, FixedClock, GreenlightEngine,
    GreenlightError, ProjectApprovalState, Progress, Role, RoleApproval, RoleStatus, SystemClock,
};
pub use config::{config, GreenlightConfig};
pub use observability::{decision_metrics, DecisionMetrics, OperationTimer};
pub use service::{DecisionOutcome, GreenlightService, ServiceError};
pub use store::{
    AuditLogSink, AuditTrail, FileAuditLog, FileProjectStore, InMemoryAuditLog,
    InMemoryProjectStore, ProjectRecord, ProjectRecordStore, StoreError,
};
pub use telemetry::{create_decision_span, generate_correlation_id, init_telemetry, shutdown_telemetry};

#[cfg(feature = "database")]
pub use database::{init_database, DatabaseManager};
