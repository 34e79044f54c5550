use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::domain::org::{Employee, EmployeeId};
use crate::domain::request::{Rejection, RequestId, RequestKind, SideEffect, Stamp};
use crate::domain::termination::{Termination, TerminationDetails, TerminationStatus};
use crate::flows::engine::{ApprovalFlow, FlowAction, FlowError, FlowStatus, TransitionContext};
use crate::org::locator::RoutePlan;

impl FlowStatus for TerminationStatus {
    fn as_str(self) -> &'static str {
        TerminationStatus::as_str(self)
    }

    fn is_terminal(self) -> bool {
        TerminationStatus::is_terminal(self)
    }
}

impl Termination {
    /// Snapshots the subject's position and routes to the coordinator or
    /// gestor of the subject's sector, else straight to HR.
    pub(crate) fn open(
        id: RequestId,
        requester: &Employee,
        subject: &Employee,
        details: TerminationDetails,
        context: &TransitionContext<'_>,
    ) -> Result<Self, FlowError> {
        let mut record = Self {
            id,
            requester: requester.id.clone(),
            details,
            cargo: subject.cargo.clone(),
            sector: subject.primary_sector.clone(),
            admission_date: subject.admission_date,
            status: TerminationStatus::PendingManager,
            current_approver: None,
            manager_approval: None,
            hr_approval: None,
            rejection: None,
            version: 1,
            created_at: context.now,
            updated_at: context.now,
        };

        let plan = RoutePlan::immediate_manager(record.sector.as_ref(), &subject.id);
        match context.locator.resolve(&plan) {
            Some(manager) => record.current_approver = Some(manager.id.clone()),
            None => record.route_to_hr(context)?,
        }
        Ok(record)
    }

    fn route_to_hr(&mut self, context: &TransitionContext<'_>) -> Result<(), FlowError> {
        let hr = context.locator.require(&RoutePlan::human_resources())?;
        self.status = TerminationStatus::PendingHr;
        self.current_approver = Some(hr.id.clone());
        Ok(())
    }

    fn close(&mut self, status: TerminationStatus) {
        self.status = status;
        self.current_approver = None;
    }
}

impl ApprovalFlow for Termination {
    const KIND: RequestKind = RequestKind::Termination;
    type Status = TerminationStatus;

    fn request_id(&self) -> &RequestId {
        &self.id
    }

    fn requester(&self) -> &EmployeeId {
        &self.requester
    }

    fn status(&self) -> TerminationStatus {
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
        [&self.manager_approval, &self.hr_approval]
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
            (TerminationStatus::PendingManager, FlowAction::Approve) => {
                self.manager_approval = Some(stamp);
                self.route_to_hr(context)?;
                Ok(Vec::new())
            }
            (TerminationStatus::PendingHr, FlowAction::Approve) => {
                self.hr_approval = Some(stamp);
                self.close(TerminationStatus::Approved);
                Ok(vec![SideEffect::DeactivateEmployee { employee: self.details.subject.clone() }])
            }
            (_, FlowAction::Reject { reason }) => {
                self.rejection = Some(Rejection {
                    by: actor.clone(),
                    at: context.now,
                    reason: reason.trim().to_owned(),
                });
                self.close(TerminationStatus::Rejected);
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

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use crate::domain::org::{Cargo, Employee, ManagementLevel, Sector};
    use crate::domain::request::SideEffect;
    use crate::domain::termination::TerminationStatus;
    use crate::flows::engine::{ApprovalFlow, FlowAction, FlowEngine, FlowError};
    use crate::flows::testing::{cargo, id, sector, termination_details, Org};
    use crate::org::locator::RoutingPolicy;

    #[test]
    fn coordinator_of_subject_sector_approves_first() {
        let org = Org::standard();
        let policy = RoutingPolicy::default();
        let engine = FlowEngine::new(&org.snapshot, &policy);

        let record = engine
            .open_termination(&id("ger-log"), termination_details("ana-log"), Utc::now())
            .expect("termination opens");
        assert_eq!(record.status, TerminationStatus::PendingManager);
        assert_eq!(record.current_approver, Some(id("coo-log")));
        assert_eq!(record.cargo, Some(cargo("c-ana")));
        assert_eq!(record.sector, Some(sector("s-log")));
        assert_eq!(record.admission_date, NaiveDate::from_ymd_opt(2021, 3, 1));
    }

    #[test]
    fn subject_is_never_their_own_approver() {
        let org = Org::standard();
        let policy = RoutingPolicy::default();
        let engine = FlowEngine::new(&org.snapshot, &policy);

        let record = engine
            .open_termination(&id("ger-log"), termination_details("coo-log"), Utc::now())
            .expect("termination opens");
        assert_eq!(record.current_approver, Some(id("ger-log")));
    }

    #[test]
    fn hr_approval_deactivates_subject() {
        let org = Org::standard();
        let policy = RoutingPolicy::default();
        let engine = FlowEngine::new(&org.snapshot, &policy);
        let mut record = engine
            .open_termination(&id("ger-log"), termination_details("ana-log"), Utc::now())
            .expect("termination opens");

        let first = engine
            .apply(&mut record, &FlowAction::Approve, &id("coo-log"), Utc::now())
            .expect("manager approves");
        assert_eq!(first.to, "pending_rh");
        assert!(first.effects.is_empty());

        let last = engine
            .apply(&mut record, &FlowAction::Approve, &id("rh-coo"), Utc::now())
            .expect("hr approves");
        assert_eq!(record.status, TerminationStatus::Approved);
        assert_eq!(last.effects, vec![SideEffect::DeactivateEmployee { employee: id("ana-log") }]);
        assert_eq!(record.version, 3);
        assert_eq!(record.participants().len(), 2);
    }

    #[test]
    fn sector_without_coordinator_or_gestor_goes_straight_to_hr() {
        let analyst = Cargo::new("c-ana", "Analista", ManagementLevel::Analyst);
        let supervisor = Cargo::new("c-sup", "Supervisor", ManagementLevel::Supervisor);
        let fin = Sector::named("s-fin", "FINANCEIRO");
        let snapshot = Org::standard()
            .snapshot
            .with_employee(Employee::new("sup-fin", "Flavia").with_cargo(&supervisor).in_sector(&fin.id))
            .with_employee(Employee::new("ana-fin", "Fabio").with_cargo(&analyst).in_sector(&fin.id))
            .with_sector(fin);
        let policy = RoutingPolicy::default();
        let engine = FlowEngine::new(&snapshot, &policy);

        let record = engine
            .open_termination(&id("dir-1"), termination_details("ana-fin"), Utc::now())
            .expect("termination opens");
        assert_eq!(record.status, TerminationStatus::PendingHr);
        assert_eq!(record.current_approver, Some(id("rh-coo")));
        assert!(record.manager_approval.is_none());
        assert_eq!(record.version, 1);
    }

    #[test]
    fn reject_closes_with_reason_and_no_approver() {
        let org = Org::standard();
        let policy = RoutingPolicy::default();
        let engine = FlowEngine::new(&org.snapshot, &policy);
        let mut record = engine
            .open_termination(&id("ger-log"), termination_details("ana-log"), Utc::now())
            .expect("termination opens");

        let outcome = engine
            .apply(
                &mut record,
                &FlowAction::Reject { reason: "  headcount still needed ".to_owned() },
                &id("coo-log"),
                Utc::now(),
            )
            .expect("coordinator rejects");
        assert_eq!(outcome.to, "rejected");
        assert!(outcome.effects.is_empty());
        assert_eq!(record.status, TerminationStatus::Rejected);
        assert_eq!(record.current_approver, None);
        assert!(record.pending_approvers().is_empty());
        let rejection = record.rejection.as_ref().expect("rejection stored");
        assert_eq!(rejection.by, id("coo-log"));
        assert_eq!(rejection.reason, "headcount still needed");
        assert!(record.participants().contains(&id("coo-log")));
    }

    #[test]
    fn terminations_cannot_be_cancelled_or_returned() {
        let org = Org::standard();
        let policy = RoutingPolicy::default();
        let engine = FlowEngine::new(&org.snapshot, &policy);
        let mut record = engine
            .open_termination(&id("ger-log"), termination_details("ana-log"), Utc::now())
            .expect("termination opens");

        let cancel = engine.apply(&mut record, &FlowAction::Cancel, &id("ger-log"), Utc::now());
        assert!(matches!(cancel, Err(FlowError::InvalidTransition { action: "cancel", .. })));

        let returned = engine.apply(
            &mut record,
            &FlowAction::ReturnToManager { justification: "why".to_owned() },
            &id("coo-log"),
            Utc::now(),
        );
        assert!(matches!(returned, Err(FlowError::InvalidTransition { .. })));
        assert_eq!(record.status, TerminationStatus::PendingManager);
    }

    #[test]
    fn analyst_cannot_terminate_outside_own_sector() {
        let org = Org::standard();
        let policy = RoutingPolicy::default();
        let engine = FlowEngine::new(&org.snapshot, &policy);

        let result = engine.open_termination(&id("ana-log"), termination_details("ana-com"), Utc::now());
        assert!(matches!(result, Err(FlowError::SubjectOutOfScope { .. })));
    }
}
