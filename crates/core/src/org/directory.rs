use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::org::{
    Cargo, CargoId, Employee, EmployeeId, ManagementLevel, Sector, SectorId, SectorRole,
};
use crate::domain::request::SideEffect;
use crate::domain::vacancy::{Vacancy, VacancyId};

/// Composable predicate over employees, evaluated by an [`OrgDirectory`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmployeeQuery {
    All,
    Active,
    Id(EmployeeId),
    InPrimarySector(SectorId),
    PrimarySectorIn(Vec<SectorId>),
    ResponsibleFor(SectorId),
    LevelIn(Vec<ManagementLevel>),
    /// Employees whose level outranks the given one.
    LevelAbove(ManagementLevel),
    /// Employees outranked by the given level.
    LevelBelow(ManagementLevel),
    Not(Box<EmployeeQuery>),
    And(Vec<EmployeeQuery>),
    Or(Vec<EmployeeQuery>),
}

impl EmployeeQuery {
    pub fn not(query: EmployeeQuery) -> Self {
        Self::Not(Box::new(query))
    }

    /// Primary sector or one of the delegated responsible sectors.
    pub fn covering(sector: &SectorId) -> Self {
        Self::Or(vec![Self::InPrimarySector(sector.clone()), Self::ResponsibleFor(sector.clone())])
    }

    pub fn matches(&self, employee: &Employee) -> bool {
        match self {
            Self::All => true,
            Self::Active => employee.active,
            Self::Id(id) => &employee.id == id,
            Self::InPrimarySector(sector) => employee.primary_sector.as_ref() == Some(sector),
            Self::PrimarySectorIn(sectors) => {
                employee.primary_sector.as_ref().is_some_and(|sector| sectors.contains(sector))
            }
            Self::ResponsibleFor(sector) => employee.responsible_sectors.contains(sector),
            Self::LevelIn(levels) => employee.level.is_some_and(|level| levels.contains(&level)),
            Self::LevelAbove(reference) => {
                employee.level.is_some_and(|level| level.outranks(*reference))
            }
            Self::LevelBelow(reference) => {
                employee.level.is_some_and(|level| reference.outranks(level))
            }
            Self::Not(inner) => !inner.matches(employee),
            Self::And(queries) => queries.iter().all(|query| query.matches(employee)),
            Self::Or(queries) => queries.iter().any(|query| query.matches(employee)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeOrder {
    /// Highest authority first, then by name.
    LevelThenName,
    /// Grouped by primary sector name, then level, then name.
    SectorLevelName,
    Name,
}

/// Read access to the organization structure.
pub trait OrgDirectory {
    fn employee(&self, id: &EmployeeId) -> Option<&Employee>;
    fn sector(&self, id: &SectorId) -> Option<&Sector>;
    fn cargo(&self, id: &CargoId) -> Option<&Cargo>;
    fn vacancy(&self, id: &VacancyId) -> Option<&Vacancy>;
    fn sectors_with_role(&self, roles: &[SectorRole]) -> Vec<&Sector>;
    fn find_employees(&self, query: &EmployeeQuery, order: EmployeeOrder) -> Vec<&Employee>;
}

/// Point-in-time copy of the organization, loaded from storage or built in tests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSnapshot {
    employees: BTreeMap<EmployeeId, Employee>,
    sectors: BTreeMap<SectorId, Sector>,
    cargos: BTreeMap<CargoId, Cargo>,
    vacancies: BTreeMap<VacancyId, Vacancy>,
}

impl OrgSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_sector(&mut self, sector: Sector) {
        self.sectors.insert(sector.id.clone(), sector);
    }

    /// Inserts a cargo and refreshes the mirrored level of every holder.
    pub fn insert_cargo(&mut self, cargo: Cargo) {
        for employee in self.employees.values_mut() {
            if employee.cargo.as_ref() == Some(&cargo.id) {
                employee.level = Some(cargo.level);
            }
        }
        self.cargos.insert(cargo.id.clone(), cargo);
    }

    pub fn insert_employee(&mut self, mut employee: Employee) {
        if let Some(cargo) = employee.cargo.as_ref().and_then(|id| self.cargos.get(id)) {
            employee.level = Some(cargo.level);
        }
        self.employees.insert(employee.id.clone(), employee);
    }

    pub fn insert_vacancy(&mut self, vacancy: Vacancy) {
        self.vacancies.insert(vacancy.id.clone(), vacancy);
    }

    pub fn with_sector(mut self, sector: Sector) -> Self {
        self.insert_sector(sector);
        self
    }

    pub fn with_cargo(mut self, cargo: Cargo) -> Self {
        self.insert_cargo(cargo);
        self
    }

    pub fn with_employee(mut self, employee: Employee) -> Self {
        self.insert_employee(employee);
        self
    }

    pub fn with_vacancy(mut self, vacancy: Vacancy) -> Self {
        self.insert_vacancy(vacancy);
        self
    }

    pub fn employees(&self) -> impl Iterator<Item = &Employee> {
        self.employees.values()
    }

    pub fn sectors(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.values()
    }

    pub fn cargos(&self) -> impl Iterator<Item = &Cargo> {
        self.cargos.values()
    }

    pub fn vacancies(&self) -> impl Iterator<Item = &Vacancy> {
        self.vacancies.values()
    }

    /// Applies a committed side effect so the snapshot matches storage.
    pub fn apply_effect(&mut self, effect: &SideEffect) {
        match effect {
            SideEffect::DeactivateEmployee { employee } => {
                if let Some(record) = self.employees.get_mut(employee) {
                    record.active = false;
                }
            }
            SideEffect::ReassignEmployee { employee, cargo, sector } => {
                let level = self.cargos.get(cargo).map(|cargo| cargo.level);
                if let Some(record) = self.employees.get_mut(employee) {
                    record.cargo = Some(cargo.clone());
                    record.level = level;
                    record.primary_sector = Some(sector.clone());
                }
            }
        }
    }

    fn sector_name(&self, employee: &Employee) -> &str {
        employee
            .primary_sector
            .as_ref()
            .and_then(|id| self.sectors.get(id))
            .map(|sector| sector.name.as_str())
            .unwrap_or_default()
    }
}

fn level_key(employee: &Employee) -> u8 {
    employee.level.map(ManagementLevel::rank).unwrap_or(u8::MAX)
}

impl OrgDirectory for OrgSnapshot {
    fn employee(&self, id: &EmployeeId) -> Option<&Employee> {
        self.employees.get(id)
    }

    fn sector(&self, id: &SectorId) -> Option<&Sector> {
        self.sectors.get(id)
    }

    fn cargo(&self, id: &CargoId) -> Option<&Cargo> {
        self.cargos.get(id)
    }

    fn vacancy(&self, id: &VacancyId) -> Option<&Vacancy> {
        self.vacancies.get(id)
    }

    fn sectors_with_role(&self, roles: &[SectorRole]) -> Vec<&Sector> {
        self.sectors.values().filter(|sector| roles.contains(&sector.role)).collect()
    }

    fn find_employees(&self, query: &EmployeeQuery, order: EmployeeOrder) -> Vec<&Employee> {
        let mut found: Vec<&Employee> =
            self.employees.values().filter(|employee| query.matches(employee)).collect();

        match order {
            EmployeeOrder::LevelThenName => found.sort_by(|a, b| {
                (level_key(a), &a.name, &a.id).cmp(&(level_key(b), &b.name, &b.id))
            }),
            EmployeeOrder::SectorLevelName => found.sort_by(|a, b| {
                (self.sector_name(a), level_key(a), &a.name, &a.id).cmp(&(
                    self.sector_name(b),
                    level_key(b),
                    &b.name,
                    &b.id,
                ))
            }),
            EmployeeOrder::Name => found.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id))),
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::{EmployeeOrder, EmployeeQuery, OrgDirectory, OrgSnapshot};
    use crate::domain::org::{Cargo, Employee, EmployeeId, ManagementLevel, Sector, SectorId};
    use crate::domain::request::SideEffect;

    fn snapshot() -> OrgSnapshot {
        let log = Sector::named("s-log", "LOGISTICA");
        let com = Sector::named("s-com", "COMERCIAL");
        let manager = Cargo::new("c-ger", "Gerente", ManagementLevel::Manager);
        let analyst = Cargo::new("c-ana", "Analista", ManagementLevel::Analyst);

        OrgSnapshot::new()
            .with_employee(
                Employee::new("e-bia", "Bia").with_cargo(&analyst).in_sector(&log.id),
            )
            .with_employee(
                Employee::new("e-ari", "Ari")
                    .with_cargo(&manager)
                    .in_sector(&com.id)
                    .responsible_for(&log.id),
            )
            .with_employee(
                Employee::new("e-caio", "Caio").with_cargo(&analyst).in_sector(&com.id).inactive(),
            )
            .with_sector(log)
            .with_sector(com)
            .with_cargo(manager)
            .with_cargo(analyst)
    }

    fn ids(found: Vec<&Employee>) -> Vec<&str> {
        found.into_iter().map(|employee| employee.id.0.as_str()).collect()
    }

    #[test]
    fn composed_queries_filter_and_order() {
        let org = snapshot();
        let log = SectorId("s-log".to_owned());

        let covering = org.find_employees(
            &EmployeeQuery::And(vec![EmployeeQuery::Active, EmployeeQuery::covering(&log)]),
            EmployeeOrder::LevelThenName,
        );
        assert_eq!(ids(covering), vec!["e-ari", "e-bia"]);

        let analysts = org.find_employees(
            &EmployeeQuery::LevelBelow(ManagementLevel::Manager),
            EmployeeOrder::Name,
        );
        assert_eq!(ids(analysts), vec!["e-bia", "e-caio"]);

        let by_sector = org.find_employees(&EmployeeQuery::All, EmployeeOrder::SectorLevelName);
        assert_eq!(ids(by_sector), vec!["e-ari", "e-caio", "e-bia"]);
    }

    #[test]
    fn cargo_inserted_after_employee_still_sets_level() {
        let org = snapshot();
        let bia = org.employee(&EmployeeId("e-bia".to_owned())).expect("bia exists");
        assert_eq!(bia.level, Some(ManagementLevel::Analyst));
    }

    #[test]
    fn reassignment_effect_updates_cargo_level_and_sector() {
        let mut org = snapshot();
        org.apply_effect(&SideEffect::ReassignEmployee {
            employee: EmployeeId("e-bia".to_owned()),
            cargo: crate::domain::org::CargoId("c-ger".to_owned()),
            sector: SectorId("s-com".to_owned()),
        });

        let bia = org.employee(&EmployeeId("e-bia".to_owned())).expect("bia exists");
        assert_eq!(bia.level, Some(ManagementLevel::Manager));
        assert_eq!(bia.primary_sector, Some(SectorId("s-com".to_owned())));

        org.apply_effect(&SideEffect::DeactivateEmployee {
            employee: EmployeeId("e-bia".to_owned()),
        });
        assert!(!org.employee(&EmployeeId("e-bia".to_owned())).expect("bia exists").active);
    }
}
