use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::org::{CargoId, EmployeeId, SectorId};
use crate::domain::request::{Rejection, RequestId, Stamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationStatus {
    PendingManager,
    PendingHr,
    Approved,
    Rejected,
}

impl TerminationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingManager => "pending_manager",
            Self::PendingHr => "pending_rh",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationDetails {
    pub subject: EmployeeId,
    pub termination_type: String,
    pub reason: String,
    pub expected_date: Option<NaiveDate>,
    pub notice_type: Option<String>,
    pub replacement_planned: bool,
    pub justification: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Termination {
    pub id: RequestId,
    pub requester: EmployeeId,
    pub details: TerminationDetails,
    pub cargo: Option<CargoId>,
    pub sector: Option<SectorId>,
    pub admission_date: Option<NaiveDate>,
    pub status: TerminationStatus,
    pub current_approver: Option<EmployeeId>,
    pub manager_approval: Option<Stamp>,
    pub hr_approval: Option<Stamp>,
    pub rejection: Option<Rejection>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
