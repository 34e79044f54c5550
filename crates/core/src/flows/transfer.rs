use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::domain::org::{Employee, EmployeeId};
use crate::domain::request::{Rejection, RequestId, RequestKind, SideEffect, Stamp};
use crate::domain::transfer::{GestorSlot, Transfer, TransferDetails, TransferStatus};
use crate::flows::engine::{ApprovalFlow, FlowAction, FlowError, FlowStatus, TransitionContext};
use crate::org::locator::RoutePlan;

impl FlowStatus for TransferStatus {
    fn as_str(self) -> &'static str {
        TransferStatus::as_str(self)
    }

    fn is_terminal(self) -> bool {
        TransferStatus::is_terminal(self)
    }
}

impl Transfer {
    /// Assigns the gestors of the current and proposed sectors. Missing
    /// gestors pre-approve their slot and a gestor shared by both sectors
    /// approves once.
    pub(crate) fn open(
        id: RequestId,
        requester: &Employee,
        subject: &Employee,
        details: TransferDetails,
        context: &TransitionContext<'_>,
    ) -> Result<Self, FlowError> {
        let current_sector = subject.primary_sector.clone();
        let current = context
            .locator
            .resolve(&RoutePlan::gestor_of(current_sector.as_ref()))
            .map(|gestor| gestor.id.clone());
        let proposed = context
            .locator
            .resolve(&RoutePlan::gestor_of(Some(&details.proposed_sector)))
            .map(|gestor| gestor.id.clone());

        let proposed_gestor = if proposed.is_some() && proposed == current {
            GestorSlot::assigned(None)
        } else {
            GestorSlot::assigned(proposed)
        };

        let mut record = Self {
            id,
            requester: requester.id.clone(),
            details,
            current_cargo: subject.cargo.clone(),
            current_sector,
            status: TransferStatus::PendingManagers,
            current_gestor: GestorSlot::assigned(current),
            proposed_gestor,
            hr_approver: None,
            hr_approval: None,
            rejection: None,
            version: 1,
            created_at: context.now,
            updated_at: context.now,
        };

        if record.both_gestors_approved() {
            record.route_to_hr(context)?;
        }
        Ok(record)
    }

    fn route_to_hr(&mut self, context: &TransitionContext<'_>) -> Result<(), FlowError> {
        let hr = context.locator.require(&RoutePlan::human_resources())?;
        self.status = TransferStatus::PendingHr;
        self.hr_approver = Some(hr.id.clone());
        Ok(())
    }

    fn close(&mut self, status: TransferStatus) {
        self.status = status;
        self.current_gestor.approver = None;
        self.proposed_gestor.approver = None;
        self.hr_approver = None;
    }
}

impl ApprovalFlow for Transfer {
    const KIND: RequestKind = RequestKind::Transfer;
    type Status = TransferStatus;

    fn request_id(&self) -> &RequestId {
        &self.id
    }

    fn requester(&self) -> &EmployeeId {
        &self.requester
    }

    fn status(&self) -> TransferStatus {
        self.status
    }

    fn pending_approvers(&self) -> Vec<EmployeeId> {
        match self.status {
            TransferStatus::PendingManagers => {
                let mut pending: Vec<EmployeeId> = [&self.current_gestor, &self.proposed_gestor]
                    .into_iter()
                    .filter_map(GestorSlot::pending_approver)
                    .cloned()
                    .collect();
                pending.dedup();
                pending
            }
            TransferStatus::PendingHr => self.hr_approver.iter().cloned().collect(),
            TransferStatus::Approved | TransferStatus::Rejected => Vec::new(),
        }
    }

    fn assigned_approvers(&self) -> Vec<EmployeeId> {
        [&self.current_gestor.approver, &self.proposed_gestor.approver, &self.hr_approver]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    fn participants(&self) -> BTreeSet<EmployeeId> {
        [&self.current_gestor.approval, &self.proposed_gestor.approval, &self.hr_approval]
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
        let stamp = Stamp::new(actor, context.now);
        match (self.status, action) {
            (TransferStatus::PendingManagers, FlowAction::Approve) => {
                for slot in [&mut self.current_gestor, &mut self.proposed_gestor] {
                    if slot.waits_on(actor) {
                        slot.approved = true;
                        slot.approval = Some(stamp.clone());
                    }
                }
                if self.both_gestors_approved() {
                    self.route_to_hr(context)?;
                }
                Ok(Vec::new())
            }
            (TransferStatus::PendingHr, FlowAction::Approve) => {
                self.hr_approval = Some(stamp);
                self.close(TransferStatus::Approved);
                Ok(vec![SideEffect::ReassignEmployee {
                    employee: self.details.subject.clone(),
                    cargo: self.details.proposed_cargo.clone(),
                    sector: self.details.proposed_sector.clone(),
                }])
            }
            (_, FlowAction::Reject { reason }) => {
                self.rejection = Some(Rejection {
                    by: actor.clone(),
                    at: context.now,
                    reason: reason.trim().to_owned(),
                });
                self.close(TransferStatus::Rejected);
                Ok(Vec::new())
            }
            _ => Err(FlowError::invalid(self, action)),
        }
    }

    fn revision(&self) -> i64 {
        self.version
    }

    fn stamp_revision(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}
