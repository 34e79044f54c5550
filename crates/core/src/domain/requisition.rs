use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::org::EmployeeId;
use crate::domain::request::{Rejection, RequestId, Stamp};
use crate::domain::vacancy::VacancyId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequisitionStatus {
    PendingManager,
    PendingHr,
    InReviewByManager,
    Approved,
    Rejected,
    Cancelled,
}

impl RequisitionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingManager => "pending_manager",
            Self::PendingHr => "pending_rh",
            Self::InReviewByManager => "in_review_by_manager",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Cancelled)
    }
}

/// Hiring data captured when the requisition is opened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionDetails {
    pub vacancy: VacancyId,
    pub vacancy_type: String,
    pub replaced_employee: Option<String>,
    pub replacement_reason: Option<String>,
    pub workplace: Option<String>,
    pub expected_start: Option<NaiveDate>,
    pub hiring_deadline: Option<NaiveDate>,
    pub working_hours: Option<String>,
    pub justification: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requisition {
    pub id: RequestId,
    pub requester: EmployeeId,
    pub details: RequisitionDetails,
    pub status: RequisitionStatus,
    pub current_approver: Option<EmployeeId>,
    pub manager_approval: Option<Stamp>,
    pub hr_approval: Option<Stamp>,
    pub returned: Option<Stamp>,
    /// Justification left by HR when sending the requisition back to a manager.
    pub hr_edit_note: Option<String>,
    pub rejection: Option<Rejection>,
    pub cancellation: Option<Stamp>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
