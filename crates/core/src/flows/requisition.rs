use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::domain::org::{Employee, EmployeeId};
use crate::domain::request::{Rejection, RequestId, RequestKind, SideEffect, Stamp};
use crate::domain::requisition::{Requisition, RequisitionDetails, RequisitionStatus};
use crate::flows::engine::{ApprovalFlow, FlowAction, FlowError, FlowStatus, TransitionContext};
use crate::org::locator::RoutePlan;

impl FlowStatus for RequisitionStatus {
    fn as_str(self) -> &'static str {
        RequisitionStatus::as_str(self)
    }

    fn is_terminal(self) -> bool {
        RequisitionStatus::is_terminal(self)
    }
}

impl Requisition {
    /// Starts with the requester's closest gestor or coordinator, else HR.
    pub(crate) fn open(
        id: RequestId,
        requester: &Employee,
        details: RequisitionDetails,
        context: &TransitionContext<'_>,
    ) -> Result<Self, FlowError> {
        let mut record = Self {
            id,
            requester: requester.id.clone(),
            details,
            status: RequisitionStatus::PendingManager,
            current_approver: None,
            manager_approval: None,
            hr_approval: None,
            returned: None,
            hr_edit_note: None,
            rejection: None,
            cancellation: None,
            version: 1,
            created_at: context.now,
            updated_at: context.now,
        };

        if !record.route_to_manager(RequisitionStatus::PendingManager, context) {
            record.route_to_hr(context)?;
        }
        Ok(record)
    }

    fn route_to_manager(
        &mut self,
        status: RequisitionStatus,
        context: &TransitionContext<'_>,
    ) -> bool {
        match context.locator.resolve(&RoutePlan::manager_of(&self.requester)) {
            Some(manager) => {
                self.status = status;
                self.current_approver = Some(manager.id.clone());
                true
            }
            None => false,
        }
    }

    fn route_to_hr(&mut self, context: &TransitionContext<'_>) -> Result<(), FlowError> {
        let hr = context.locator.require(&RoutePlan::human_resources())?;
        self.status = RequisitionStatus::PendingHr;
        self.current_approver = Some(hr.id.clone());
        Ok(())
    }

    fn close(&mut self, status: RequisitionStatus) {
        self.status = status;
        self.current_approver = None;
    }
}

impl ApprovalFlow for Requisition {
    const KIND: RequestKind = RequestKind::Requisition;
    type Status = RequisitionStatus;

    fn request_id(&self) -> &RequestId {
        &self.id
    }

    fn requester(&self) -> &EmployeeId {
        &self.requester
    }

    fn status(&self) -> RequisitionStatus {
        self.status
    }

    fn pending_approvers(&self) -> Vec<EmployeeId> {
        if self.status.is_terminal() {
            return Vec::new();
        }
        self.current_approver.iter().cloned().collect()
    }

    fn assigned_approvers(&self) -> Vec<EmployeeId> {
        self.current_approver.iter().cloned().collect()
    }

    fn participants(&self) -> BTreeSet<EmployeeId> {
        [&self.manager_approval, &self.hr_approval, &self.returned]
            .into_iter()
            .flatten()
            .map(|stamp| stamp.by.clone())
            .chain(self.rejection.iter().map(|rejection| rejection.by.clone()))
            .collect()
    }

    fn transition(
        &mut self,
        action: &FlowAction,
        actor: &EmployeeId,
        context: &TransitionContext<'_>,
    ) -> Result<Vec<SideEffect>, FlowError> {
        use RequisitionStatus::{
            Approved, Cancelled, InReviewByManager, PendingHr, PendingManager, Rejected,
        };

        let stamp = Stamp::new(actor, context.now);
        match (self.status, action) {
            (PendingManager | InReviewByManager, FlowAction::Approve) => {
                self.manager_approval = Some(stamp);
                self.hr_edit_note = None;
                self.route_to_hr(context)?;
            }
            (PendingHr, FlowAction::Approve) => {
                self.hr_approval = Some(stamp);
                self.close(Approved);
            }
            (PendingHr, FlowAction::ReturnToManager { justification }) => {
                self.hr_edit_note = Some(justification.trim().to_owned());
                self.returned = Some(stamp);
                if !self.route_to_manager(InReviewByManager, context) {
                    self.route_to_hr(context)?;
                }
            }
            (_, FlowAction::Reject { reason }) => {
                self.rejection =
                    Some(Rejection { by: actor.clone(), at: context.now, reason: reason.trim().to_owned() });
                self.close(Rejected);
            }
            (_, FlowAction::Cancel) => {
                self.cancellation = Some(stamp);
                self.close(Cancelled);
            }
            _ => return Err(FlowError::invalid(self, action)),
        }
        Ok(Vec::new())
    }

    fn revision(&self) -> i64 {
        self.version
    }

    fn stamp_revision(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}
