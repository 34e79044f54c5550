use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use rhflow_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, InMemoryAuditSink,
};
use rhflow_core::config::WorkflowConfig;
use rhflow_core::domain::org::{Employee, EmployeeId};
use rhflow_core::domain::request::{RequestFilter, RequestId, RequestRecord};
use rhflow_core::domain::requisition::RequisitionDetails;
use rhflow_core::domain::termination::TerminationDetails;
use rhflow_core::domain::transfer::TransferDetails;
use rhflow_core::errors::{ApplicationError, DomainError};
use rhflow_core::flows::{FlowAction, FlowEngine, FlowError, TransitionOutcome};
use rhflow_core::org::{can_view, history_scope, HistoryScope, OrgDirectory, OrgSnapshot, RoutingPolicy};

use crate::repositories::{
    InMemoryWorkflowStore, OrgRepository, RepositoryError, RequestRepository, SqlOrgRepository,
    SqlRequestRepository, TransitionCommit,
};
use crate::DbPool;

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepositoryError::Conflict { request, .. } => Self::Conflict { request, attempts: 1 },
            other => Self::Persistence(other.to_string()),
        }
    }
}

fn new_correlation_id() -> String {
    format!("req-{}", Uuid::new_v4())
}

/// Entry point for every request operation.
///
/// Mutations on one record are serialized through a per-record lock and
/// committed with an optimistic version check, retried on conflict.
pub struct RequestService {
    org: Arc<dyn OrgRepository>,
    requests: Arc<dyn RequestRepository>,
    policy: RoutingPolicy,
    conflict_retries: u32,
    locks: Mutex<HashMap<RequestId, Arc<Mutex<()>>>>,
}

impl RequestService {
    pub fn new(
        org: Arc<dyn OrgRepository>,
        requests: Arc<dyn RequestRepository>,
        workflow: &WorkflowConfig,
    ) -> Self {
        Self {
            org,
            requests,
            policy: workflow.routing_policy(),
            conflict_retries: workflow.conflict_retries,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn sqlite(pool: DbPool, workflow: &WorkflowConfig) -> Self {
        Self::new(
            Arc::new(SqlOrgRepository::new(pool.clone())),
            Arc::new(SqlRequestRepository::new(pool)),
            workflow,
        )
    }

    pub fn in_memory(store: Arc<InMemoryWorkflowStore>, workflow: &WorkflowConfig) -> Self {
        Self::new(store.clone(), store, workflow)
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    pub async fn open_requisition(
        &self,
        requester: &EmployeeId,
        details: RequisitionDetails,
    ) -> Result<RequestRecord, ApplicationError> {
        self.open(requester, "requisition", |engine, now| {
            engine.open_requisition(requester, details, now).map(RequestRecord::from)
        })
        .await
    }

    pub async fn open_transfer(
        &self,
        requester: &EmployeeId,
        details: TransferDetails,
    ) -> Result<RequestRecord, ApplicationError> {
        self.open(requester, "transfer", |engine, now| {
            engine.open_transfer(requester, details, now).map(RequestRecord::from)
        })
        .await
    }

    pub async fn open_termination(
        &self,
        requester: &EmployeeId,
        details: TerminationDetails,
    ) -> Result<RequestRecord, ApplicationError> {
        self.open(requester, "termination", |engine, now| {
            engine.open_termination(requester, details, now).map(RequestRecord::from)
        })
        .await
    }

    pub async fn approve(
        &self,
        id: &RequestId,
        actor: &EmployeeId,
    ) -> Result<TransitionOutcome, ApplicationError> {
        self.transition(id, actor, FlowAction::Approve).await
    }

    pub async fn reject(
        &self,
        id: &RequestId,
        actor: &EmployeeId,
        reason: impl Into<String>,
    ) -> Result<TransitionOutcome, ApplicationError> {
        self.transition(id, actor, FlowAction::Reject { reason: reason.into() }).await
    }

    pub async fn return_to_manager(
        &self,
        id: &RequestId,
        actor: &EmployeeId,
        justification: impl Into<String>,
    ) -> Result<TransitionOutcome, ApplicationError> {
        let action = FlowAction::ReturnToManager { justification: justification.into() };
        self.transition(id, actor, action).await
    }

    pub async fn cancel(
        &self,
        id: &RequestId,
        actor: &EmployeeId,
    ) -> Result<TransitionOutcome, ApplicationError> {
        self.transition(id, actor, FlowAction::Cancel).await
    }

    /// Open requests currently waiting on `actor`, oldest first.
    pub async fn pending_for(
        &self,
        actor: &EmployeeId,
    ) -> Result<Vec<RequestRecord>, ApplicationError> {
        Ok(self.requests.list_requests(&RequestFilter::pending_for(actor)).await?)
    }

    pub async fn requested_by(
        &self,
        actor: &EmployeeId,
    ) -> Result<Vec<RequestRecord>, ApplicationError> {
        Ok(self.requests.list_requests(&RequestFilter::requested_by(actor)).await?)
    }

    /// Finished requests visible to `actor` according to their history scope.
    pub async fn history_for(
        &self,
        actor: &EmployeeId,
    ) -> Result<Vec<RequestRecord>, ApplicationError> {
        let snapshot = self.org.load_snapshot().await?;
        let employee = known_employee(&snapshot, actor)?;

        let filter = match history_scope(employee, &snapshot) {
            HistoryScope::All => RequestFilter::finished(),
            HistoryScope::Participated => {
                RequestFilter { participant: Some(actor.clone()), ..RequestFilter::finished() }
            }
            HistoryScope::Requested => {
                RequestFilter { requester: Some(actor.clone()), ..RequestFilter::finished() }
            }
            HistoryScope::None => return Ok(Vec::new()),
        };
        Ok(self.requests.list_requests(&filter).await?)
    }

    pub async fn view(
        &self,
        id: &RequestId,
        actor: &EmployeeId,
    ) -> Result<RequestRecord, ApplicationError> {
        let record = self.load(id).await?;
        let snapshot = self.org.load_snapshot().await?;
        let employee = known_employee(&snapshot, actor)?;

        if !can_view(employee, &record, &snapshot) {
            return Err(DomainError::AccessDenied { actor: actor.clone(), request: id.clone() }
                .into());
        }
        Ok(record)
    }

    pub async fn audit_trail(&self, id: &RequestId) -> Result<Vec<AuditEvent>, ApplicationError> {
        self.load(id).await?;
        Ok(self.requests.list_audit_events(id).await?)
    }

    async fn load(&self, id: &RequestId) -> Result<RequestRecord, ApplicationError> {
        self.requests
            .find_request(id)
            .await?
            .ok_or_else(|| ApplicationError::NotFound { entity: "request", id: id.to_string() })
    }

    async fn open<F>(
        &self,
        requester: &EmployeeId,
        kind: &'static str,
        open: F,
    ) -> Result<RequestRecord, ApplicationError>
    where
        F: for<'a> FnOnce(&FlowEngine<'a>, DateTime<Utc>) -> Result<RequestRecord, FlowError>,
    {
        let correlation_id = new_correlation_id();
        let snapshot = self.org.load_snapshot().await?;
        let opened = {
            let engine = FlowEngine::new(&snapshot, &self.policy);
            open(&engine, Utc::now())
        };

        let record = match opened {
            Ok(record) => record,
            Err(error) => {
                let error = ApplicationError::from(error);
                warn!(
                    event_name = "request.open_rejected",
                    request_kind = kind,
                    actor = %requester,
                    correlation_id = %correlation_id,
                    error_class = error.class(),
                    error = %error,
                    "request could not be opened"
                );
                return Err(error);
            }
        };

        let approvers = record.pending_approvers();
        let pending =
            approvers.iter().map(|id| id.0.as_str()).collect::<Vec<_>>().join(",");
        let event = AuditEvent::new(
            Some(record.id().clone()),
            Some(record.kind()),
            correlation_id.clone(),
            "request.opened",
            AuditCategory::Request,
            requester.0.clone(),
            AuditOutcome::Success,
        )
        .with_metadata("status", record.status_str())
        .with_metadata("pending_approvers", pending.clone());
        self.requests.insert_request(record.clone(), vec![event]).await?;

        info!(
            event_name = "request.opened",
            request_id = %record.id(),
            request_kind = kind,
            actor = %requester,
            correlation_id = %correlation_id,
            status = record.status_str(),
            pending_approvers = %pending,
            "request opened"
        );
        Ok(record)
    }

    async fn transition(
        &self,
        id: &RequestId,
        actor: &EmployeeId,
        action: FlowAction,
    ) -> Result<TransitionOutcome, ApplicationError> {
        let correlation_id = new_correlation_id();
        let lock = self.record_lock(id).await;
        let result = {
            let _guard = lock.lock().await;
            self.transition_locked(id, actor, &action, &correlation_id).await
        };
        drop(lock);
        self.release_lock(id).await;

        if let Err(error) = &result {
            warn!(
                event_name = "request.transition_failed",
                request_id = %id,
                actor = %actor,
                correlation_id = %correlation_id,
                action = action.name(),
                error_class = error.class(),
                error = %error,
                "request transition failed"
            );
        }
        result
    }

    async fn transition_locked(
        &self,
        id: &RequestId,
        actor: &EmployeeId,
        action: &FlowAction,
        correlation_id: &str,
    ) -> Result<TransitionOutcome, ApplicationError> {
        let context = AuditContext::new(Some(id.clone()), correlation_id, actor.0.clone());
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let mut record = self.load(id).await?;
            let snapshot = self.org.load_snapshot().await?;
            let expected_version = record.version();
            let sink = InMemoryAuditSink::default();

            let applied = {
                let engine = FlowEngine::new(&snapshot, &self.policy);
                engine.apply_with_audit(&mut record, action, actor, Utc::now(), &sink, &context)
            };

            let outcome = match applied {
                Ok(outcome) => outcome,
                Err(error) => {
                    for event in sink.drain() {
                        self.requests.append_audit(event).await?;
                    }
                    return Err(error.into());
                }
            };

            let commit = TransitionCommit {
                record,
                expected_version,
                effects: outcome.effects.clone(),
                audit: sink.drain(),
            };
            match self.requests.commit_transition(commit).await {
                Ok(()) => {
                    info!(
                        event_name = "request.transition_applied",
                        request_id = %id,
                        request_kind = outcome.kind.as_str(),
                        actor = %actor,
                        correlation_id = %correlation_id,
                        action = outcome.action,
                        from = outcome.from,
                        to = outcome.to,
                        version = outcome.version,
                        attempts,
                        "request transition applied"
                    );
                    return Ok(outcome);
                }
                Err(error) if error.is_conflict() && attempts <= self.conflict_retries => {
                    warn!(
                        event_name = "request.transition_conflict",
                        request_id = %id,
                        request_kind = outcome.kind.as_str(),
                        actor = %actor,
                        correlation_id = %correlation_id,
                        expected_version,
                        attempts,
                        "record changed concurrently, retrying"
                    );
                }
                Err(error) if error.is_conflict() => {
                    return Err(ApplicationError::Conflict { request: id.clone(), attempts });
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    async fn record_lock(&self, id: &RequestId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(id.clone()).or_default().clone()
    }

    /// Drops the lock entry once no other caller holds it.
    async fn release_lock(&self, id: &RequestId) {
        let mut locks = self.locks.lock().await;
        if locks.get(id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(id);
        }
    }
}

fn known_employee<'a>(
    snapshot: &'a OrgSnapshot,
    id: &EmployeeId,
) -> Result<&'a Employee, ApplicationError> {
    snapshot
        .employee(id)
        .ok_or_else(|| ApplicationError::NotFound { entity: "employee", id: id.to_string() })
}
