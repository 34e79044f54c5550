use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::org::{CargoId, EmployeeId, SectorId};
use crate::domain::requisition::Requisition;
use crate::domain::termination::Termination;
use crate::domain::transfer::Transfer;
use crate::flows::ApprovalFlow;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Requisition,
    Transfer,
    Termination,
}

impl RequestKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requisition => "requisition",
            Self::Transfer => "transfer",
            Self::Termination => "termination",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "requisition" => Some(Self::Requisition),
            "transfer" => Some(Self::Transfer),
            "termination" => Some(Self::Termination),
            _ => None,
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed a step and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp {
    pub by: EmployeeId,
    pub at: DateTime<Utc>,
}

impl Stamp {
    pub fn new(by: &EmployeeId, at: DateTime<Utc>) -> Self {
        Self { by: by.clone(), at }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub by: EmployeeId,
    pub at: DateTime<Utc>,
    pub reason: String,
}

/// Changes to the organization that must be committed together with a transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    DeactivateEmployee { employee: EmployeeId },
    ReassignEmployee { employee: EmployeeId, cargo: CargoId, sector: SectorId },
}

impl SideEffect {
    pub fn employee(&self) -> &EmployeeId {
        match self {
            Self::DeactivateEmployee { employee } | Self::ReassignEmployee { employee, .. } => {
                employee
            }
        }
    }
}

/// Storage envelope over the three request types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestRecord {
    Requisition(Requisition),
    Transfer(Transfer),
    Termination(Termination),
}

impl RequestRecord {
    pub fn id(&self) -> &RequestId {
        match self {
            Self::Requisition(record) => record.request_id(),
            Self::Transfer(record) => record.request_id(),
            Self::Termination(record) => record.request_id(),
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Requisition(_) => RequestKind::Requisition,
            Self::Transfer(_) => RequestKind::Transfer,
            Self::Termination(_) => RequestKind::Termination,
        }
    }

    pub fn status_str(&self) -> &'static str {
        match self {
            Self::Requisition(record) => record.status_str(),
            Self::Transfer(record) => record.status_str(),
            Self::Termination(record) => record.status_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Requisition(record) => record.is_terminal(),
            Self::Transfer(record) => record.is_terminal(),
            Self::Termination(record) => record.is_terminal(),
        }
    }

    pub fn version(&self) -> i64 {
        match self {
            Self::Requisition(record) => record.version,
            Self::Transfer(record) => record.version,
            Self::Termination(record) => record.version,
        }
    }

    pub fn requester(&self) -> &EmployeeId {
        match self {
            Self::Requisition(record) => &record.requester,
            Self::Transfer(record) => &record.requester,
            Self::Termination(record) => &record.requester,
        }
    }

    /// Employee the request is about; requisitions have none yet.
    pub fn subject(&self) -> Option<&EmployeeId> {
        match self {
            Self::Requisition(_) => None,
            Self::Transfer(record) => Some(&record.details.subject),
            Self::Termination(record) => Some(&record.details.subject),
        }
    }

    pub fn pending_approvers(&self) -> Vec<EmployeeId> {
        match self {
            Self::Requisition(record) => record.pending_approvers(),
            Self::Transfer(record) => record.pending_approvers(),
            Self::Termination(record) => record.pending_approvers(),
        }
    }

    pub fn participants(&self) -> BTreeSet<EmployeeId> {
        match self {
            Self::Requisition(record) => record.participants(),
            Self::Transfer(record) => record.participants(),
            Self::Termination(record) => record.participants(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Requisition(record) => record.created_at,
            Self::Transfer(record) => record.created_at,
            Self::Termination(record) => record.created_at,
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Self::Requisition(record) => record.updated_at,
            Self::Transfer(record) => record.updated_at,
            Self::Termination(record) => record.updated_at,
        }
    }

    pub fn as_requisition(&self) -> Option<&Requisition> {
        match self {
            Self::Requisition(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_transfer(&self) -> Option<&Transfer> {
        match self {
            Self::Transfer(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_termination(&self) -> Option<&Termination> {
        match self {
            Self::Termination(record) => Some(record),
            _ => None,
        }
    }
}

impl From<Requisition> for RequestRecord {
    fn from(value: Requisition) -> Self {
        Self::Requisition(value)
    }
}

impl From<Transfer> for RequestRecord {
    fn from(value: Transfer) -> Self {
        Self::Transfer(value)
    }
}

impl From<Termination> for RequestRecord {
    fn from(value: Termination) -> Self {
        Self::Termination(value)
    }
}

/// Conjunctive filter used by inbox, history and listing queries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub kind: Option<RequestKind>,
    pub requester: Option<EmployeeId>,
    pub pending_approver: Option<EmployeeId>,
    pub participant: Option<EmployeeId>,
    pub terminal: Option<bool>,
}

impl RequestFilter {
    pub fn pending_for(approver: &EmployeeId) -> Self {
        Self { pending_approver: Some(approver.clone()), terminal: Some(false), ..Self::default() }
    }

    pub fn requested_by(requester: &EmployeeId) -> Self {
        Self { requester: Some(requester.clone()), ..Self::default() }
    }

    pub fn finished() -> Self {
        Self { terminal: Some(true), ..Self::default() }
    }

    pub fn with_kind(mut self, kind: RequestKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn matches(&self, record: &RequestRecord) -> bool {
        if self.kind.is_some_and(|kind| kind != record.kind()) {
            return false;
        }
        if self.requester.as_ref().is_some_and(|requester| requester != record.requester()) {
            return false;
        }
        if self.terminal.is_some_and(|terminal| terminal != record.is_terminal()) {
            return false;
        }
        if let Some(approver) = &self.pending_approver {
            if !record.pending_approvers().contains(approver) {
                return false;
            }
        }
        if let Some(participant) = &self.participant {
            if !record.participants().contains(participant) {
                return false;
            }
        }
        true
    }
}
