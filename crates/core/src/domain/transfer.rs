use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::org::{CargoId, EmployeeId, SectorId};
use crate::domain::request::{Rejection, RequestId, Stamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    PendingManagers,
    PendingHr,
    Approved,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PendingManagers => "pending_managers",
            Self::PendingHr => "pending_rh",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// One of the two gestor approvals a transfer collects in parallel.
///
/// A slot with no approver is approved from the start.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestorSlot {
    pub approver: Option<EmployeeId>,
    pub approved: bool,
    pub approval: Option<Stamp>,
}

impl GestorSlot {
    pub fn assigned(approver: Option<EmployeeId>) -> Self {
        let approved = approver.is_none();
        Self { approver, approved, approval: None }
    }

    pub fn waits_on(&self, actor: &EmployeeId) -> bool {
        !self.approved && self.approver.as_ref() == Some(actor)
    }

    pub fn pending_approver(&self) -> Option<&EmployeeId> {
        if self.approved {
            None
        } else {
            self.approver.as_ref()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDetails {
    pub subject: EmployeeId,
    pub proposed_cargo: CargoId,
    pub proposed_sector: SectorId,
    pub proposed_salary: Option<Decimal>,
    pub effective_date: Option<NaiveDate>,
    pub justification: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: RequestId,
    pub requester: EmployeeId,
    pub details: TransferDetails,
    /// Snapshot of the subject's placement when the request was opened.
    pub current_cargo: Option<CargoId>,
    pub current_sector: Option<SectorId>,
    pub status: TransferStatus,
    pub current_gestor: GestorSlot,
    pub proposed_gestor: GestorSlot,
    pub hr_approver: Option<EmployeeId>,
    pub hr_approval: Option<Stamp>,
    pub rejection: Option<Rejection>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transfer {
    pub fn both_gestors_approved(&self) -> bool {
        self.current_gestor.approved && self.proposed_gestor.approved
    }
}
