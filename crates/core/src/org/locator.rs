use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::org::{Employee, EmployeeId, ManagementLevel, SectorId, SectorRole};
use crate::org::directory::{EmployeeOrder, EmployeeQuery, OrgDirectory};
use crate::org::graph::OrgGraph;

/// Approval stage a routing plan resolves an approver for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStage {
    Manager,
    Gestor,
    HumanResources,
}

impl fmt::Display for RouteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Manager => "manager",
            Self::Gestor => "gestor",
            Self::HumanResources => "human_resources",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RoutingError {
    #[error("no eligible approver for the {stage} stage")]
    NoEligibleApprover { stage: RouteStage },
}

/// One lookup tier of a routing plan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApproverQuery {
    /// Closest superior of the employee holding a gestor or coordinator cargo.
    ManagerAbove(EmployeeId),
    /// Gestor or coordinator covering the sector, gestors first.
    SectorGestor(SectorId),
    /// Coordinator covering the sector, then gestor, never the excluded employee.
    ImmediateManager { sector: SectorId, excluding: EmployeeId },
    HrDepartment,
    Director,
}

/// Ordered lookup tiers; the first tier that yields an employee wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutePlan {
    pub stage: RouteStage,
    pub steps: Vec<ApproverQuery>,
}

impl RoutePlan {
    pub fn human_resources() -> Self {
        Self {
            stage: RouteStage::HumanResources,
            steps: vec![ApproverQuery::HrDepartment, ApproverQuery::Director],
        }
    }

    pub fn manager_of(employee: &EmployeeId) -> Self {
        Self { stage: RouteStage::Manager, steps: vec![ApproverQuery::ManagerAbove(employee.clone())] }
    }

    pub fn gestor_of(sector: Option<&SectorId>) -> Self {
        Self {
            stage: RouteStage::Gestor,
            steps: sector.map(|sector| ApproverQuery::SectorGestor(sector.clone())).into_iter().collect(),
        }
    }

    pub fn immediate_manager(sector: Option<&SectorId>, subject: &EmployeeId) -> Self {
        Self {
            stage: RouteStage::Manager,
            steps: sector
                .map(|sector| ApproverQuery::ImmediateManager {
                    sector: sector.clone(),
                    excluding: subject.clone(),
                })
                .into_iter()
                .collect(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingPolicy {
    /// Last-resort approver for stages that must not be left unassigned.
    pub fallback_approver: Option<EmployeeId>,
}

/// Finds the approvers a request must be routed to.
#[derive(Clone, Copy)]
pub struct ApproverLocator<'a> {
    graph: OrgGraph<'a>,
    policy: &'a RoutingPolicy,
}

impl<'a> ApproverLocator<'a> {
    pub fn new(directory: &'a dyn OrgDirectory, policy: &'a RoutingPolicy) -> Self {
        Self { graph: OrgGraph::new(directory), policy }
    }

    pub fn graph(&self) -> OrgGraph<'a> {
        self.graph
    }

    /// Lowest-level active member of an HR sector, else any active director.
    pub fn find_hr_approver(&self) -> Option<&'a Employee> {
        let directory = self.graph.directory();
        let hr_sectors: Vec<SectorId> = directory
            .sectors_with_role(&SectorRole::HR_ROLES)
            .into_iter()
            .map(|sector| sector.id.clone())
            .collect();

        if !hr_sectors.is_empty() {
            let found = directory
                .find_employees(
                    &EmployeeQuery::And(vec![
                        EmployeeQuery::Active,
                        EmployeeQuery::PrimarySectorIn(hr_sectors),
                    ]),
                    EmployeeOrder::LevelThenName,
                )
                .into_iter()
                .next();
            if found.is_some() {
                return found;
            }
        }

        self.find_director()
    }

    /// Gestor (level 2, else level 3) whose primary or responsible sectors cover `sector`.
    pub fn find_gestor(&self, sector: Option<&SectorId>) -> Option<&'a Employee> {
        let sector = sector?;
        self.graph
            .directory()
            .find_employees(
                &EmployeeQuery::And(vec![
                    EmployeeQuery::Active,
                    EmployeeQuery::LevelIn(vec![
                        ManagementLevel::Manager,
                        ManagementLevel::Coordinator,
                    ]),
                    EmployeeQuery::covering(sector),
                ]),
                EmployeeOrder::LevelThenName,
            )
            .into_iter()
            .next()
    }

    /// Coordinator covering `sector`, else its gestor; `excluding` is never returned.
    pub fn find_immediate_manager(
        &self,
        sector: &SectorId,
        excluding: &EmployeeId,
    ) -> Option<&'a Employee> {
        [ManagementLevel::Coordinator, ManagementLevel::Manager].into_iter().find_map(|level| {
            self.graph
                .directory()
                .find_employees(
                    &EmployeeQuery::And(vec![
                        EmployeeQuery::Active,
                        EmployeeQuery::not(EmployeeQuery::Id(excluding.clone())),
                        EmployeeQuery::LevelIn(vec![level]),
                        EmployeeQuery::covering(sector),
                    ]),
                    EmployeeOrder::Name,
                )
                .into_iter()
                .next()
        })
    }

    /// Closest superior holding a level-2 or level-3 cargo.
    pub fn find_manager_above(&self, employee: &EmployeeId) -> Option<&'a Employee> {
        let employee = self.graph.directory().employee(employee)?;
        self.graph.superiors(employee).into_iter().find(|superior| {
            matches!(superior.level, Some(ManagementLevel::Manager | ManagementLevel::Coordinator))
        })
    }

    pub fn find_director(&self) -> Option<&'a Employee> {
        self.graph
            .directory()
            .find_employees(
                &EmployeeQuery::And(vec![
                    EmployeeQuery::Active,
                    EmployeeQuery::LevelIn(vec![ManagementLevel::Director]),
                ]),
                EmployeeOrder::Name,
            )
            .into_iter()
            .next()
    }

    pub fn lookup(&self, query: &ApproverQuery) -> Option<&'a Employee> {
        match query {
            ApproverQuery::ManagerAbove(employee) => self.find_manager_above(employee),
            ApproverQuery::SectorGestor(sector) => self.find_gestor(Some(sector)),
            ApproverQuery::ImmediateManager { sector, excluding } => {
                self.find_immediate_manager(sector, excluding)
            }
            ApproverQuery::HrDepartment => self.find_hr_approver(),
            ApproverQuery::Director => self.find_director(),
        }
    }

    /// First employee produced by the plan's tiers, if any.
    pub fn resolve(&self, plan: &RoutePlan) -> Option<&'a Employee> {
        plan.steps.iter().find_map(|step| self.lookup(step))
    }

    /// Like [`Self::resolve`], then the configured fallback approver, then an error.
    pub fn require(&self, plan: &RoutePlan) -> Result<&'a Employee, RoutingError> {
        self.resolve(plan)
            .or_else(|| self.fallback())
            .ok_or(RoutingError::NoEligibleApprover { stage: plan.stage })
    }

    fn fallback(&self) -> Option<&'a Employee> {
        let id = self.policy.fallback_approver.as_ref()?;
        self.graph.directory().employee(id).filter(|employee| employee.active)
    }
}

#[cfg(test)]
mod tests {
    use super::{ApproverLocator, RouteStage, RoutePlan, RoutingError, RoutingPolicy};
    use crate::domain::org::{
        Cargo, Employee, EmployeeId, ManagementLevel, Sector, SectorId, SectorRole,
    };
    use crate::org::directory::OrgSnapshot;

    fn cargos() -> [Cargo; 5] {
        [
            Cargo::new("c-dir", "Diretor", ManagementLevel::Director),
            Cargo::new("c-ger", "Gerente", ManagementLevel::Manager),
            Cargo::new("c-coo", "Coordenador", ManagementLevel::Coordinator),
            Cargo::new("c-sup", "Supervisor", ManagementLevel::Supervisor),
            Cargo::new("c-ana", "Analista", ManagementLevel::Analyst),
        ]
    }

    fn base() -> OrgSnapshot {
        let [director, manager, coordinator, supervisor, analyst] = cargos();
        let dir = Sector::named("s-dir", "DIRETORIA");
        let rh = Sector::named("s-rh", "Recursos Humanos");
        let log = Sector::named("s-log", "LOGISTICA");

        OrgSnapshot::new()
            .with_sector(dir.clone())
            .with_sector(rh.clone())
            .with_sector(log.clone())
            .with_employee(Employee::new("d1", "Diana").with_cargo(&director).in_sector(&dir.id))
            .with_employee(Employee::new("rh-a", "Rita").with_cargo(&analyst).in_sector(&rh.id))
            .with_employee(
                Employee::new("rh-s", "Silvio").with_cargo(&supervisor).in_sector(&rh.id),
            )
            .with_employee(Employee::new("m-log", "Marta").with_cargo(&manager).in_sector(&log.id))
            .with_employee(
                Employee::new("c-log", "Carlos").with_cargo(&coordinator).in_sector(&log.id),
            )
            .with_cargo(director)
            .with_cargo(manager)
            .with_cargo(coordinator)
            .with_cargo(supervisor)
            .with_cargo(analyst)
    }

    #[test]
    fn hr_approver_is_lowest_level_hr_member() {
        let org = base();
        let policy = RoutingPolicy::default();
        let locator = ApproverLocator::new(&org, &policy);

        let hr = locator.find_hr_approver().expect("hr approver");
        assert_eq!(hr.id.0, "rh-s");
    }

    #[test]
    fn hr_approver_falls_back_to_director_when_department_is_empty() {
        let mut org = base();
        org.apply_effect(&crate::domain::request::SideEffect::DeactivateEmployee {
            employee: EmployeeId("rh-a".to_owned()),
        });
        org.apply_effect(&crate::domain::request::SideEffect::DeactivateEmployee {
            employee: EmployeeId("rh-s".to_owned()),
        });
        let policy = RoutingPolicy::default();
        let locator = ApproverLocator::new(&org, &policy);

        assert_eq!(locator.find_hr_approver().map(|e| e.id.0.as_str()), Some("d1"));
    }

    #[test]
    fn personnel_department_counts_as_hr() {
        let [_, _, _, _, analyst] = cargos();
        let dp = Sector {
            id: SectorId("s-dp".to_owned()),
            name: "Folha".to_owned(),
            description: None,
            role: SectorRole::PersonnelDepartment,
        };
        let org = OrgSnapshot::new()
            .with_employee(Employee::new("dp-1", "Paulo").with_cargo(&analyst).in_sector(&dp.id))
            .with_sector(dp);
        let policy = RoutingPolicy::default();
        let locator = ApproverLocator::new(&org, &policy);

        assert_eq!(locator.find_hr_approver().map(|e| e.id.0.as_str()), Some("dp-1"));
    }

    #[test]
    fn gestor_prefers_level_two_and_honours_responsibility() {
        let [_, manager, ..] = cargos();
        let log = SectorId("s-log".to_owned());
        let ext = SectorId("s-ext".to_owned());
        let org = base().with_employee(
            Employee::new("m-ext", "Beto")
                .with_cargo(&manager)
                .in_sector(&SectorId("s-dir".to_owned()))
                .responsible_for(&ext),
        );
        let policy = RoutingPolicy::default();
        let locator = ApproverLocator::new(&org, &policy);

        assert_eq!(locator.find_gestor(Some(&log)).map(|e| e.id.0.as_str()), Some("m-log"));
        assert_eq!(locator.find_gestor(Some(&ext)).map(|e| e.id.0.as_str()), Some("m-ext"));
        assert!(locator.find_gestor(None).is_none());
        assert!(locator.find_gestor(Some(&SectorId("s-none".to_owned()))).is_none());
    }

    #[test]
    fn immediate_manager_prefers_coordinator_and_skips_subject() {
        let org = base();
        let policy = RoutingPolicy::default();
        let locator = ApproverLocator::new(&org, &policy);
        let log = SectorId("s-log".to_owned());

        let for_analyst = locator.find_immediate_manager(&log, &EmployeeId("x".to_owned()));
        assert_eq!(for_analyst.map(|e| e.id.0.as_str()), Some("c-log"));

        let for_coordinator = locator.find_immediate_manager(&log, &EmployeeId("c-log".to_owned()));
        assert_eq!(for_coordinator.map(|e| e.id.0.as_str()), Some("m-log"));
    }

    #[test]
    fn required_stage_uses_fallback_then_errors() {
        let org = OrgSnapshot::new().with_employee(Employee::new("ops", "Operador"));
        let unset = RoutingPolicy::default();
        let locator = ApproverLocator::new(&org, &unset);

        assert_eq!(
            locator.require(&RoutePlan::human_resources()).map(|e| e.id.clone()),
            Err(RoutingError::NoEligibleApprover { stage: RouteStage::HumanResources })
        );

        let configured = RoutingPolicy { fallback_approver: Some(EmployeeId("ops".to_owned())) };
        let locator = ApproverLocator::new(&org, &configured);
        assert_eq!(
            locator.require(&RoutePlan::human_resources()).map(|e| e.id.0.as_str()),
            Ok("ops")
        );
    }
}
