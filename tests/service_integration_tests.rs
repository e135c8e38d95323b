// Service integration tests
// Drives the fetch → decide → write → audit cycle against the in-memory store

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use greenlight::approvals::{
    AuditEntry, Decision, FixedClock, GreenlightEngine, GreenlightError, ProjectApprovalState, Role,
    RoleStatus,
};
use greenlight::service::{GreenlightService, ServiceError};
use greenlight::store::{
    AuditLogSink, AuditTrail, InMemoryAuditLog, InMemoryProjectStore, ProjectRecord,
    ProjectRecordStore, StoreError,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

struct Harness {
    store: Arc<InMemoryProjectStore>,
    audit: Arc<InMemoryAuditLog>,
    service: Arc<GreenlightService>,
}

async fn harness(approvals: ProjectApprovalState) -> Harness {
    let store = Arc::new(InMemoryProjectStore::new());
    store.insert("film-1", approvals).await;
    let audit = Arc::new(InMemoryAuditLog::new());
    let clock = Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap();
    let service = GreenlightService::new(store.clone(), audit.clone())
        .with_engine(GreenlightEngine::with_clock(Arc::new(FixedClock(clock))));

    Harness {
        store,
        audit,
        service: Arc::new(service),
    }
}

fn producer_and_legal() -> ProjectApprovalState {
    ProjectApprovalState::new()
        .with_assignment(Role::Producer, "p@x.com")
        .with_assignment(Role::Legal, "l@x.com")
}

#[tokio::test]
async fn test_two_approvals_greenlight_the_project() {
    let h = harness(producer_and_legal()).await;

    let first = h
        .service
        .decide("film-1", Role::Producer, "p@x.com", Decision::Approve, Some(""))
        .await
        .unwrap();
    assert_eq!(first.version, 1);
    assert_eq!(first.progress.completed_count, 1);
    assert_eq!(first.progress.percent, 50);
    assert!(!first.greenlit());
    assert!(first.state.all_approvals_completed_at.is_none());

    let second = h
        .service
        .decide("film-1", Role::Legal, "l@x.com", Decision::Approve, Some("looks good"))
        .await
        .unwrap();
    assert_eq!(second.version, 2);
    assert!(second.progress.all_approved);
    assert!(second.greenlit());
    assert!(second.state.all_approvals_completed_at.is_some());

    let entries = h.audit.entries("film-1").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].metadata.comment.as_deref(), Some("looks good"));
    assert!(entries[1].metadata.all_approvals_complete);

    let stored = h.store.read("film-1").await.unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.approvals, second.state);
}

#[tokio::test]
async fn test_refused_decisions_leave_store_and_audit_untouched() {
    let h = harness(producer_and_legal()).await;

    let cases = [
        (Role::Finance, "f@x.com", "RoleNotApplicable"),
        (Role::Producer, "wrong@x.com", "NotAuthorized"),
    ];
    for (role, identity, kind) in cases {
        let err = h
            .service
            .decide("film-1", role, identity, Decision::Approve, None)
            .await
            .unwrap_err();
        assert_eq!(err.decision_error().map(GreenlightError::kind), Some(kind));
    }

    assert_eq!(h.store.read("film-1").await.unwrap().version, 0);
    assert!(h.audit.is_empty().await);
    assert_eq!(h.service.progress("film-1").await.unwrap().completed_count, 0);
}

#[tokio::test]
async fn test_rejection_is_recorded_and_role_stays_open() {
    let h = harness(producer_and_legal()).await;

    h.service
        .decide("film-1", Role::Legal, "l@x.com", Decision::Reject, Some("clearance missing"))
        .await
        .unwrap();

    let state = h.service.state("film-1").await.unwrap();
    assert_eq!(state.legal.status(), RoleStatus::Rejected);
    assert_eq!(state.legal.comment.as_deref(), Some("clearance missing"));
    assert_eq!(
        h.service.actionable_roles("film-1", "l@x.com").await.unwrap(),
        vec![Role::Legal]
    );

    let outcome = h
        .service
        .decide("film-1", Role::Legal, "l@x.com", Decision::Approve, None)
        .await
        .unwrap();
    assert_eq!(outcome.state.legal.status(), RoleStatus::Approved);
    assert_eq!(h.audit.len().await, 2);
}

#[tokio::test]
async fn test_unknown_project_is_a_store_error() {
    let h = harness(producer_and_legal()).await;

    let err = h
        .service
        .decide("film-404", Role::Producer, "p@x.com", Decision::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Store(StoreError::NotFound { .. })));
}

/// Store that lets another writer land first on the initial write attempt
struct RacingStore {
    inner: InMemoryProjectStore,
    rival: (Role, String),
    raced: AtomicBool,
}

#[async_trait]
impl ProjectRecordStore for RacingStore {
    async fn read(&self, project_id: &str) -> Result<ProjectRecord, StoreError> {
        self.inner.read(project_id).await
    }

    async fn write(
        &self,
        project_id: &str,
        state: &ProjectApprovalState,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            let current = self.inner.read(project_id).await?;
            let (role, identity) = &self.rival;
            let rival = GreenlightEngine::new()
                .decide(&current.approvals, *role, identity, Decision::Approve, None)
                .map_err(|e| StoreError::Corrupt {
                    reason: e.to_string(),
                })?;
            self.inner
                .write(project_id, &rival.state, Some(current.version))
                .await?;
        }
        self.inner.write(project_id, state, expected_version).await
    }
}

async fn racing_service(rival: Role, rival_identity: &str) -> (Arc<RacingStore>, GreenlightService) {
    let inner = InMemoryProjectStore::new();
    inner.insert("film-1", producer_and_legal()).await;
    let store = Arc::new(RacingStore {
        inner,
        rival: (rival, rival_identity.to_string()),
        raced: AtomicBool::new(false),
    });
    let service = GreenlightService::new(store.clone(), Arc::new(InMemoryAuditLog::new()));
    (store, service)
}

#[tokio::test]
async fn test_conflict_on_other_role_is_rederived_and_completes_greenlight() {
    let (store, service) = racing_service(Role::Legal, "l@x.com").await;

    let outcome = service
        .decide("film-1", Role::Producer, "p@x.com", Decision::Approve, None)
        .await
        .unwrap();

    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.version, 2);
    assert!(outcome.greenlit());

    let stored = store.read("film-1").await.unwrap();
    assert!(stored.approvals.legal.approved);
    assert!(stored.approvals.producer.approved);
}

#[tokio::test]
async fn test_conflict_on_same_role_surfaces_already_decided() {
    let (store, service) = racing_service(Role::Legal, "l@x.com").await;

    let err = service
        .decide("film-1", Role::Legal, "l@x.com", Decision::Reject, Some("late"))
        .await
        .unwrap_err();

    assert!(matches!(
        err.decision_error(),
        Some(GreenlightError::AlreadyDecided { role: Role::Legal })
    ));
    let stored = store.read("film-1").await.unwrap();
    assert!(stored.approvals.legal.approved);
    assert!(stored.approvals.legal.comment.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_all_land() {
    let approvals = ProjectApprovalState::new()
        .with_assignment(Role::Producer, "p@x.com")
        .with_assignment(Role::Legal, "l@x.com")
        .with_assignment(Role::Finance, "f@x.com")
        .with_assignment(Role::Executive, "e@x.com");
    let h = harness(approvals).await;

    let deciders = [
        (Role::Producer, "p@x.com"),
        (Role::Legal, "l@x.com"),
        (Role::Finance, "f@x.com"),
        (Role::Executive, "e@x.com"),
    ];
    let mut handles = Vec::new();
    for (role, identity) in deciders {
        let service = h.service.clone();
        handles.push(tokio::spawn(async move {
            service
                .decide("film-1", role, identity, Decision::Approve, None)
                .await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = h.store.read("film-1").await.unwrap();
    assert_eq!(stored.version, 4);
    assert!(stored.approvals.is_greenlit());

    let entries = h.audit.entries("film-1").await.unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(
        entries
            .iter()
            .filter(|e| e.metadata.all_approvals_complete)
            .count(),
        1
    );
}

/// Audit sink that fails its first `failures` appends
struct FlakyAuditLog {
    inner: InMemoryAuditLog,
    failures: AtomicU32,
}

#[async_trait]
impl AuditLogSink for FlakyAuditLog {
    async fn append(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Lock {
                reason: "audit log unavailable".to_string(),
            });
        }
        self.inner.append(entry).await
    }
}

async fn flaky_service(failures: u32, audit_retries: u32) -> (Arc<FlakyAuditLog>, GreenlightService) {
    let store = Arc::new(InMemoryProjectStore::new());
    store.insert("film-1", producer_and_legal()).await;
    let mut approvals = producer_and_legal();
    approvals.producer.approved = true;
    store.write("film-1", &approvals, Some(0)).await.unwrap();

    let audit = Arc::new(FlakyAuditLog {
        inner: InMemoryAuditLog::new(),
        failures: AtomicU32::new(failures),
    });
    let service = GreenlightService::new(store, audit.clone()).with_max_audit_retries(audit_retries);
    (audit, service)
}

#[tokio::test]
async fn test_transient_audit_failure_is_retried_in_service() {
    let (audit, service) = flaky_service(1, 2).await;

    let outcome = service
        .decide("film-1", Role::Legal, "l@x.com", Decision::Approve, None)
        .await
        .unwrap();

    assert!(outcome.greenlit());
    let entries = audit.inner.entries("film-1").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, outcome.audit_entry.id);
}

#[tokio::test]
async fn test_lost_audit_entry_can_be_recovered_from_the_error() {
    let (audit, service) = flaky_service(3, 1).await;

    let err = service
        .decide("film-1", Role::Legal, "l@x.com", Decision::Approve, None)
        .await
        .unwrap_err();
    let entry = err.unrecorded_audit_entry().cloned().unwrap();
    assert!(matches!(err, ServiceError::AuditAppend { version: 2, .. }));
    assert!(entry.metadata.all_approvals_complete);

    // The state write landed, so re-deciding is refused
    let retry = service
        .decide("film-1", Role::Legal, "l@x.com", Decision::Approve, None)
        .await
        .unwrap_err();
    assert!(matches!(
        retry.decision_error(),
        Some(GreenlightError::AlreadyDecided { .. })
    ));
    assert!(service.state("film-1").await.unwrap().all_approvals_completed_at.is_some());

    // The carried entry restores the missing audit record exactly once
    service.reappend_audit(&entry).await.unwrap();
    service.reappend_audit(&entry).await.unwrap();

    let entries = audit.inner.entries("film-1").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0], entry);
}
