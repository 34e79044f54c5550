use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::org::{Employee, EmployeeId};
use crate::domain::request::{RequestId, RequestKind, RequestRecord, SideEffect};
use crate::domain::requisition::{Requisition, RequisitionDetails};
use crate::domain::termination::{Termination, TerminationDetails};
use crate::domain::transfer::{Transfer, TransferDetails};
use crate::domain::vacancy::VacancyId;
use crate::org::access::can_open_requests;
use crate::org::directory::OrgDirectory;
use crate::org::locator::{ApproverLocator, RoutingError, RoutingPolicy};

pub trait FlowStatus: Copy + Eq + fmt::Debug {
    fn as_str(self) -> &'static str;
    fn is_terminal(self) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FlowAction {
    Approve,
    Reject { reason: String },
    ReturnToManager { justification: String },
    Cancel,
}

impl FlowAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject { .. } => "reject",
            Self::ReturnToManager { .. } => "return_to_manager",
            Self::Cancel => "cancel",
        }
    }
}

/// What a flow needs from the outside world while transitioning.
pub struct TransitionContext<'a> {
    pub locator: ApproverLocator<'a>,
    pub now: DateTime<Utc>,
}

/// A request type driven by [`FlowEngine`].
///
/// `transition` only sees actions the engine already authorized and may leave
/// the record half-updated on error; the engine works on a copy.
pub trait ApprovalFlow: Clone {
    const KIND: RequestKind;
    type Status: FlowStatus;

    fn request_id(&self) -> &RequestId;
    fn requester(&self) -> &EmployeeId;
    fn status(&self) -> Self::Status;
    /// Employees the request is currently waiting on.
    fn pending_approvers(&self) -> Vec<EmployeeId>;
    /// Every approver field that is still filled, acted on or not.
    fn assigned_approvers(&self) -> Vec<EmployeeId>;
    /// Employees who approved, rejected or returned the request.
    fn participants(&self) -> BTreeSet<EmployeeId>;
    fn transition(
        &mut self,
        action: &FlowAction,
        actor: &EmployeeId,
        context: &TransitionContext<'_>,
    ) -> Result<Vec<SideEffect>, FlowError>;
    fn revision(&self) -> i64;
    /// Bumps the optimistic version and refreshes `updated_at`.
    fn stamp_revision(&mut self, now: DateTime<Utc>);

    fn status_str(&self) -> &'static str {
        self.status().as_str()
    }

    fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    fn may_act(&self, action: &FlowAction, actor: &EmployeeId) -> bool {
        match action {
            FlowAction::Cancel => self.requester() == actor,
            _ => self.pending_approvers().contains(actor),
        }
    }

    /// Open requests wait on someone; finished requests wait on no one.
    fn ensure_consistent(&self) -> Result<(), FlowError> {
        let detail = if self.is_terminal() {
            let assigned = self.assigned_approvers();
            (!assigned.is_empty()).then(|| {
                format!("terminal status `{}` still assigns {assigned:?}", self.status_str())
            })
        } else {
            self.pending_approvers()
                .is_empty()
                .then(|| format!("status `{}` has no pending approver", self.status_str()))
        };

        match detail {
            Some(detail) => {
                Err(FlowError::InvariantViolation { request: self.request_id().clone(), detail })
            }
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    pub request: RequestId,
    pub kind: RequestKind,
    pub action: &'static str,
    pub actor: EmployeeId,
    pub from: &'static str,
    pub to: &'static str,
    pub effects: Vec<SideEffect>,
    pub next_approvers: Vec<EmployeeId>,
    pub version: i64,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("{kind} request {request} is `{status}`; `{action}` is not allowed")]
    InvalidTransition {
        kind: RequestKind,
        request: RequestId,
        status: &'static str,
        action: &'static str,
    },
    #[error("employee {actor} cannot act on {kind} request {request}")]
    NotCurrentApprover { kind: RequestKind, request: RequestId, actor: EmployeeId },
    #[error("a rejection reason is required")]
    MissingReason,
    #[error("a justification is required to return a requisition to its manager")]
    MissingJustification,
    #[error("unknown {entity} `{id}`")]
    UnknownEntity { entity: &'static str, id: String },
    #[error("employee {0} is not allowed to open requests")]
    RequesterNotEligible(EmployeeId),
    #[error("employee {actor} cannot open requests about {subject}")]
    SubjectOutOfScope { actor: EmployeeId, subject: EmployeeId },
    #[error("vacancy {0} is not open")]
    VacancyNotOpen(VacancyId),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error("request {request} is inconsistent: {detail}")]
    InvariantViolation { request: RequestId, detail: String },
}

impl FlowError {
    pub fn invalid<F: ApprovalFlow>(record: &F, action: &FlowAction) -> Self {
        Self::InvalidTransition {
            kind: F::KIND,
            request: record.request_id().clone(),
            status: record.status_str(),
            action: action.name(),
        }
    }

    fn unknown(entity: &'static str, id: &impl fmt::Display) -> Self {
        Self::UnknownEntity { entity, id: id.to_string() }
    }
}

/// Opens requests and applies approval actions against an organization snapshot.
pub struct FlowEngine<'a> {
    locator: ApproverLocator<'a>,
}

impl<'a> FlowEngine<'a> {
    pub fn new(directory: &'a dyn OrgDirectory, policy: &'a RoutingPolicy) -> Self {
        Self { locator: ApproverLocator::new(directory, policy) }
    }

    pub fn locator(&self) -> ApproverLocator<'a> {
        self.locator
    }

    pub fn directory(&self) -> &'a dyn OrgDirectory {
        self.locator.graph().directory()
    }

    fn context(&self, now: DateTime<Utc>) -> TransitionContext<'a> {
        TransitionContext { locator: self.locator, now }
    }

    fn eligible_requester(&self, requester: &EmployeeId) -> Result<&'a Employee, FlowError> {
        let employee = self
            .directory()
            .employee(requester)
            .ok_or_else(|| FlowError::unknown("employee", requester))?;
        if !can_open_requests(employee) {
            return Err(FlowError::RequesterNotEligible(requester.clone()));
        }
        Ok(employee)
    }

    fn subject_in_scope(
        &self,
        requester: &Employee,
        subject: &EmployeeId,
    ) -> Result<&'a Employee, FlowError> {
        let employee = self
            .directory()
            .employee(subject)
            .ok_or_else(|| FlowError::unknown("employee", subject))?;
        let in_scope = self
            .locator
            .graph()
            .subjects_in_scope(requester)
            .iter()
            .any(|candidate| candidate.id == employee.id);
        if !in_scope {
            return Err(FlowError::SubjectOutOfScope {
                actor: requester.id.clone(),
                subject: subject.clone(),
            });
        }
        Ok(employee)
    }

    pub fn open_requisition(
        &self,
        requester: &EmployeeId,
        details: RequisitionDetails,
        now: DateTime<Utc>,
    ) -> Result<Requisition, FlowError> {
        let requester = self.eligible_requester(requester)?;
        let vacancy = self
            .directory()
            .vacancy(&details.vacancy)
            .ok_or_else(|| FlowError::unknown("vacancy", &details.vacancy))?;
        if !vacancy.is_open() {
            return Err(FlowError::VacancyNotOpen(vacancy.id.clone()));
        }

        let record = Requisition::open(RequestId::generate(), requester, details, &self.context(now))?;
        record.ensure_consistent()?;
        Ok(record)
    }

    pub fn open_transfer(
        &self,
        requester: &EmployeeId,
        details: TransferDetails,
        now: DateTime<Utc>,
    ) -> Result<Transfer, FlowError> {
        let requester = self.eligible_requester(requester)?;
        let subject = self.subject_in_scope(requester, &details.subject)?;
        if self.directory().cargo(&details.proposed_cargo).is_none() {
            return Err(FlowError::unknown("cargo", &details.proposed_cargo));
        }
        if self.directory().sector(&details.proposed_sector).is_none() {
            return Err(FlowError::unknown("sector", &details.proposed_sector));
        }

        let record = Transfer::open(
            RequestId::generate(),
            requester,
            subject,
            details,
            &self.context(now),
        )?;
        record.ensure_consistent()?;
        Ok(record)
    }

    pub fn open_termination(
        &self,
        requester: &EmployeeId,
        details: TerminationDetails,
        now: DateTime<Utc>,
    ) -> Result<Termination, FlowError> {
        let requester = self.eligible_requester(requester)?;
        let subject = self.subject_in_scope(requester, &details.subject)?;

        let record = Termination::open(
            RequestId::generate(),
            requester,
            subject,
            details,
            &self.context(now),
        )?;
        record.ensure_consistent()?;
        Ok(record)
    }

    /// Applies `action` by `actor`. The record is replaced only when the
    /// transition succeeds and leaves it consistent.
    pub fn apply<F>(
        &self,
        record: &mut F,
        action: &FlowAction,
        actor: &EmployeeId,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, FlowError>
    where
        F: ApprovalFlow,
    {
        if record.is_terminal() {
            return Err(FlowError::invalid(record, action));
        }
        match action {
            FlowAction::Reject { reason } if reason.trim().is_empty() => {
                return Err(FlowError::MissingReason);
            }
            FlowAction::ReturnToManager { justification } if justification.trim().is_empty() => {
                return Err(FlowError::MissingJustification);
            }
            _ => {}
        }
        if !record.may_act(action, actor) {
            return Err(FlowError::NotCurrentApprover {
                kind: F::KIND,
                request: record.request_id().clone(),
                actor: actor.clone(),
            });
        }

        let from = record.status_str();
        let mut next = record.clone();
        let effects = next.transition(action, actor, &self.context(now))?;
        next.ensure_consistent()?;
        next.stamp_revision(now);

        let outcome = TransitionOutcome {
            request: next.request_id().clone(),
            kind: F::KIND,
            action: action.name(),
            actor: actor.clone(),
            from,
            to: next.status_str(),
            effects,
            next_approvers: next.pending_approvers(),
            version: next.revision(),
        };
        *record = next;
        Ok(outcome)
    }

    pub fn apply_record(
        &self,
        record: &mut RequestRecord,
        action: &FlowAction,
        actor: &EmployeeId,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, FlowError> {
        match record {
            RequestRecord::Requisition(inner) => self.apply(inner, action, actor, now),
            RequestRecord::Transfer(inner) => self.apply(inner, action, actor, now),
            RequestRecord::Termination(inner) => self.apply(inner, action, actor, now),
        }
    }

    pub fn apply_with_audit<S>(
        &self,
        record: &mut RequestRecord,
        action: &FlowAction,
        actor: &EmployeeId,
        now: DateTime<Utc>,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowError>
    where
        S: AuditSink,
    {
        let request_id = record.id().clone();
        let kind = record.kind();
        let result = self.apply_record(record, action, actor, now);
        match &result {
            Ok(outcome) => {
                let mut event = AuditEvent::new(
                    Some(request_id),
                    Some(kind),
                    audit.correlation_id.clone(),
                    "request.transition_applied",
                    AuditCategory::Request,
                    audit.actor.clone(),
                    AuditOutcome::Success,
                )
                .with_metadata("action", outcome.action)
                .with_metadata("from", outcome.from)
                .with_metadata("to", outcome.to)
                .with_metadata("version", outcome.version.to_string());
                if !outcome.next_approvers.is_empty() {
                    let next: Vec<&str> =
                        outcome.next_approvers.iter().map(|id| id.0.as_str()).collect();
                    event = event.with_metadata("next_approvers", next.join(","));
                }
                sink.emit(event);
            }
            Err(error) => {
                let (event_type, category, outcome) = match error {
                    FlowError::Routing(_) => {
                        ("request.transition_failed", AuditCategory::Routing, AuditOutcome::Failed)
                    }
                    FlowError::InvariantViolation { .. } => {
                        ("request.transition_failed", AuditCategory::Request, AuditOutcome::Failed)
                    }
                    _ => (
                        "request.transition_rejected",
                        AuditCategory::Request,
                        AuditOutcome::Rejected,
                    ),
                };
                sink.emit(
                    AuditEvent::new(
                        Some(request_id),
                        Some(kind),
                        audit.correlation_id.clone(),
                        event_type,
                        category,
                        audit.actor.clone(),
                        outcome,
                    )
                    .with_metadata("action", action.name())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}
