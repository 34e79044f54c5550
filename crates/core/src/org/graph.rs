use crate::domain::org::{Employee, ManagementLevel};
use crate::org::directory::{EmployeeOrder, EmployeeQuery, OrgDirectory};

/// Resolves hierarchy relationships from sector membership, delegated
/// sector responsibility and management level.
#[derive(Clone, Copy)]
pub struct OrgGraph<'a> {
    directory: &'a dyn OrgDirectory,
}

impl<'a> OrgGraph<'a> {
    pub fn new(directory: &'a dyn OrgDirectory) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &'a dyn OrgDirectory {
        self.directory
    }

    /// Active employees above `employee`, highest authority first.
    ///
    /// Directors are always included. Without a primary sector or a level only
    /// directors qualify. Responsibility for a sector never grants seniority
    /// without also outranking the employee.
    pub fn superiors(&self, employee: &Employee) -> Vec<&'a Employee> {
        let directors = EmployeeQuery::LevelIn(vec![ManagementLevel::Director]);
        let linked = match (&employee.primary_sector, employee.level) {
            (Some(sector), Some(level)) => EmployeeQuery::Or(vec![
                EmployeeQuery::And(vec![
                    EmployeeQuery::InPrimarySector(sector.clone()),
                    EmployeeQuery::LevelAbove(level),
                ]),
                EmployeeQuery::And(vec![
                    EmployeeQuery::ResponsibleFor(sector.clone()),
                    EmployeeQuery::LevelAbove(level),
                ]),
                directors,
            ]),
            _ => directors,
        };

        self.directory.find_employees(
            &EmployeeQuery::And(vec![
                EmployeeQuery::Active,
                EmployeeQuery::not(EmployeeQuery::Id(employee.id.clone())),
                linked,
            ]),
            EmployeeOrder::LevelThenName,
        )
    }

    /// Active employees below `employee` in its primary sector and, when
    /// `include_responsible` is set, in the sectors it is responsible for.
    pub fn subordinates(&self, employee: &Employee, include_responsible: bool) -> Vec<&'a Employee> {
        let Some(level) = employee.level else {
            return Vec::new();
        };

        let mut branches = Vec::new();
        if let Some(sector) = &employee.primary_sector {
            branches.push(EmployeeQuery::And(vec![
                EmployeeQuery::InPrimarySector(sector.clone()),
                EmployeeQuery::LevelBelow(level),
            ]));
        }
        if include_responsible && !employee.responsible_sectors.is_empty() {
            branches.push(EmployeeQuery::And(vec![
                EmployeeQuery::PrimarySectorIn(
                    employee.responsible_sectors.iter().cloned().collect(),
                ),
                EmployeeQuery::LevelBelow(level),
            ]));
        }
        if branches.is_empty() {
            return Vec::new();
        }

        self.directory.find_employees(
            &EmployeeQuery::And(vec![
                EmployeeQuery::Active,
                EmployeeQuery::not(EmployeeQuery::Id(employee.id.clone())),
                EmployeeQuery::Or(branches),
            ]),
            EmployeeOrder::SectorLevelName,
        )
    }

    /// Subordinates exactly one level below `employee`.
    pub fn direct_subordinates(&self, employee: &Employee) -> Vec<&'a Employee> {
        let Some(next) = employee.level.and_then(|level| ManagementLevel::from_rank(level.rank() + 1))
        else {
            return Vec::new();
        };

        self.subordinates(employee, true)
            .into_iter()
            .filter(|candidate| candidate.level == Some(next))
            .collect()
    }

    pub fn is_superior_of(&self, candidate: &Employee, employee: &Employee) -> bool {
        self.superiors(employee).iter().any(|superior| superior.id == candidate.id)
    }

    /// Employees `actor` may open a transfer or termination for, ordered by name.
    pub fn subjects_in_scope(&self, actor: &Employee) -> Vec<&'a Employee> {
        let scope = match actor.level {
            None => return Vec::new(),
            Some(ManagementLevel::Director) => EmployeeQuery::All,
            Some(ManagementLevel::Analyst) => match &actor.primary_sector {
                Some(sector) => EmployeeQuery::InPrimarySector(sector.clone()),
                None => return Vec::new(),
            },
            Some(_) => {
                let sectors: Vec<_> = actor
                    .primary_sector
                    .iter()
                    .chain(actor.responsible_sectors.iter())
                    .cloned()
                    .collect();
                if sectors.is_empty() {
                    return Vec::new();
                }
                EmployeeQuery::PrimarySectorIn(sectors)
            }
        };

        self.directory.find_employees(
            &EmployeeQuery::And(vec![
                EmployeeQuery::Active,
                EmployeeQuery::not(EmployeeQuery::Id(actor.id.clone())),
                scope,
            ]),
            EmployeeOrder::Name,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::OrgGraph;
    use crate::domain::org::{Cargo, Employee, EmployeeId, ManagementLevel, Sector};
    use crate::org::directory::{OrgDirectory, OrgSnapshot};

    fn org() -> OrgSnapshot {
        let dir = Sector::named("s-dir", "DIRETORIA");
        let log = Sector::named("s-log", "LOGISTICA");
        let com = Sector::named("s-com", "COMERCIAL");
        let director = Cargo::new("c-dir", "Diretor", ManagementLevel::Director);
        let manager = Cargo::new("c-ger", "Gerente", ManagementLevel::Manager);
        let coordinator = Cargo::new("c-coo", "Coordenador", ManagementLevel::Coordinator);
        let supervisor = Cargo::new("c-sup", "Supervisor", ManagementLevel::Supervisor);
        let analyst = Cargo::new("c-ana", "Analista", ManagementLevel::Analyst);

        OrgSnapshot::new()
            .with_sector(dir.clone())
            .with_sector(log.clone())
            .with_sector(com.clone())
            .with_cargo(director.clone())
            .with_cargo(manager.clone())
            .with_cargo(coordinator.clone())
            .with_cargo(supervisor.clone())
            .with_cargo(analyst.clone())
            .with_employee(Employee::new("d1", "Diana").with_cargo(&director).in_sector(&dir.id))
            .with_employee(Employee::new("d2", "Dario").with_cargo(&director).in_sector(&dir.id))
            .with_employee(
                Employee::new("m-log", "Marta").with_cargo(&manager).in_sector(&log.id),
            )
            .with_employee(
                Employee::new("c-com", "Celso")
                    .with_cargo(&coordinator)
                    .in_sector(&com.id)
                    .responsible_for(&log.id),
            )
            .with_employee(
                Employee::new("s-log", "Sara").with_cargo(&supervisor).in_sector(&log.id),
            )
            .with_employee(Employee::new("a-log", "Alan").with_cargo(&analyst).in_sector(&log.id))
            .with_employee(Employee::new("a-com", "Alice").with_cargo(&analyst).in_sector(&com.id))
            .with_employee(
                Employee::new("a-old", "Otto").with_cargo(&analyst).in_sector(&log.id).inactive(),
            )
            .with_employee(Employee::new("a-nos", "Nina").with_cargo(&analyst))
    }

    fn employee<'a>(org: &'a OrgSnapshot, id: &str) -> &'a Employee {
        org.employee(&EmployeeId(id.to_owned())).expect("employee should exist")
    }

    fn ids(found: &[&Employee]) -> Vec<String> {
        found.iter().map(|employee| employee.id.0.clone()).collect()
    }

    #[test]
    fn superiors_follow_sector_responsibility_and_directors() {
        let org = org();
        let graph = OrgGraph::new(&org);

        let superiors = graph.superiors(employee(&org, "s-log"));
        assert_eq!(ids(&superiors), vec!["d2", "d1", "m-log", "c-com"]);
    }

    #[test]
    fn superiors_never_include_self_and_keep_other_directors() {
        let org = org();
        let graph = OrgGraph::new(&org);

        for candidate in org.employees() {
            let superiors = graph.superiors(candidate);
            assert!(superiors.iter().all(|superior| superior.id != candidate.id));
            for director in org.employees().filter(|e| e.is_director() && e.active) {
                if director.id != candidate.id {
                    assert!(
                        superiors.iter().any(|superior| superior.id == director.id),
                        "{} should see director {}",
                        candidate.id,
                        director.id
                    );
                }
            }
        }
    }

    #[test]
    fn employee_without_sector_only_reports_to_directors() {
        let org = org();
        let graph = OrgGraph::new(&org);

        let superiors = graph.superiors(employee(&org, "a-nos"));
        assert_eq!(ids(&superiors), vec!["d2", "d1"]);
    }

    #[test]
    fn responsibility_without_seniority_is_not_hierarchy() {
        let org = org();
        let graph = OrgGraph::new(&org);

        // Celso is responsible for LOGISTICA but does not outrank its manager.
        let superiors = graph.superiors(employee(&org, "m-log"));
        assert!(superiors.iter().all(|superior| superior.id.0 != "c-com"));
    }

    #[test]
    fn subordinates_cover_primary_and_responsible_sectors() {
        let org = org();
        let graph = OrgGraph::new(&org);
        let celso = employee(&org, "c-com");

        assert_eq!(ids(&graph.subordinates(celso, true)), vec!["a-com", "s-log", "a-log"]);
        assert_eq!(ids(&graph.subordinates(celso, false)), vec!["a-com"]);
        assert_eq!(ids(&graph.direct_subordinates(celso)), vec!["s-log"]);
        assert!(graph.is_superior_of(celso, employee(&org, "a-log")));
    }

    #[test]
    fn subject_scope_depends_on_level() {
        let org = org();
        let graph = OrgGraph::new(&org);

        let director_scope = graph.subjects_in_scope(employee(&org, "d1"));
        assert_eq!(director_scope.len(), 7);
        assert!(director_scope.iter().all(|subject| subject.id.0 != "d1"));

        let coordinator_scope = graph.subjects_in_scope(employee(&org, "c-com"));
        assert_eq!(ids(&coordinator_scope), vec!["a-log", "a-com", "m-log", "s-log"]);

        let analyst_scope = graph.subjects_in_scope(employee(&org, "a-com"));
        assert_eq!(ids(&analyst_scope), vec!["c-com"]);

        assert!(graph.subjects_in_scope(employee(&org, "a-nos")).is_empty());
    }
}
