use chrono::NaiveDate;
use rust_decimal::Decimal;

use rhflow_core::domain::org::{Cargo, Employee, EmployeeId, ManagementLevel, Sector, SectorId};
use rhflow_core::domain::requisition::RequisitionDetails;
use rhflow_core::domain::termination::TerminationDetails;
use rhflow_core::domain::transfer::TransferDetails;
use rhflow_core::domain::vacancy::{Vacancy, VacancyId, VacancyStatus};
use rhflow_core::org::{ApproverLocator, OrgDirectory, RoutePlan, RoutingPolicy};

use crate::repositories::{OrgRepository, RepositoryError};

struct SeedEmployee {
    id: &'static str,
    name: &'static str,
    cargo: &'static str,
    sector: &'static str,
    admitted: (i32, u32, u32),
}

const SEED_SECTORS: &[(&str, &str)] = &[
    ("s-dir", "DIRETORIA"),
    ("s-rh", "RECURSOS HUMANOS"),
    ("s-dp", "DEPARTAMENTO DE PESSOAL"),
    ("s-log", "LOGISTICA"),
    ("s-com", "COMERCIAL"),
];

const SEED_CARGOS: &[(&str, &str, ManagementLevel)] = &[
    ("c-dir", "Diretor", ManagementLevel::Director),
    ("c-ger", "Gerente", ManagementLevel::Manager),
    ("c-coo", "Coordenador", ManagementLevel::Coordinator),
    ("c-sup", "Supervisor", ManagementLevel::Supervisor),
    ("c-ana", "Analista", ManagementLevel::Analyst),
];

const SEED_EMPLOYEES: &[SeedEmployee] = &[
    SeedEmployee { id: "dir-1", name: "Diana Prado", cargo: "c-dir", sector: "s-dir", admitted: (2012, 1, 9) },
    SeedEmployee { id: "rh-coo", name: "Renata Lima", cargo: "c-coo", sector: "s-rh", admitted: (2016, 4, 4) },
    SeedEmployee { id: "rh-ana", name: "Rui Campos", cargo: "c-ana", sector: "s-rh", admitted: (2020, 2, 17) },
    SeedEmployee { id: "dp-ana", name: "Debora Reis", cargo: "c-ana", sector: "s-dp", admitted: (2022, 8, 1) },
    SeedEmployee { id: "ger-log", name: "Gustavo Nunes", cargo: "c-ger", sector: "s-log", admitted: (2014, 6, 2) },
    SeedEmployee { id: "coo-log", name: "Clara Souza", cargo: "c-coo", sector: "s-log", admitted: (2017, 9, 11) },
    SeedEmployee { id: "sup-log", name: "Sonia Alves", cargo: "c-sup", sector: "s-log", admitted: (2019, 3, 25) },
    SeedEmployee { id: "ana-log", name: "Andre Costa", cargo: "c-ana", sector: "s-log", admitted: (2021, 3, 1) },
    SeedEmployee { id: "ger-com", name: "Gabriel Rocha", cargo: "c-ger", sector: "s-com", admitted: (2015, 10, 5) },
    SeedEmployee { id: "ana-com", name: "Amanda Dias", cargo: "c-ana", sector: "s-com", admitted: (2023, 1, 16) },
];

const SEED_VACANCIES: &[(&str, &str, &str, &str, VacancyStatus)] = &[
    ("v-log-ana", "Analista de Logistica", "c-ana", "s-log", VacancyStatus::Open),
    ("v-com-sup", "Supervisor Comercial", "c-sup", "s-com", VacancyStatus::Open),
    ("v-log-sup", "Supervisor de Logistica", "c-sup", "s-log", VacancyStatus::Filled),
];

/// Deterministic demo organization used by `rhflow seed` and integration tests.
pub struct DemoOrganization {
    pub sectors: Vec<Sector>,
    pub cargos: Vec<Cargo>,
    pub employees: Vec<Employee>,
    pub vacancies: Vec<Vacancy>,
}

impl DemoOrganization {
    pub fn standard() -> Self {
        let sectors: Vec<Sector> =
            SEED_SECTORS.iter().map(|(id, name)| Sector::named(*id, *name)).collect();
        let cargos: Vec<Cargo> =
            SEED_CARGOS.iter().map(|(id, name, level)| Cargo::new(*id, *name, *level)).collect();

        let employees = SEED_EMPLOYEES
            .iter()
            .map(|seed| {
                let mut employee = Employee::new(seed.id, seed.name);
                if let Some(cargo) = cargos.iter().find(|cargo| cargo.id.0 == seed.cargo) {
                    employee = employee.with_cargo(cargo);
                }
                employee = employee.in_sector(&SectorId(seed.sector.to_owned()));
                employee.login = Some(seed.id.replace('-', "."));
                let (year, month, day) = seed.admitted;
                employee.admission_date = NaiveDate::from_ymd_opt(year, month, day);
                employee
            })
            .collect();

        let vacancies = SEED_VACANCIES
            .iter()
            .map(|(id, title, cargo, sector, status)| Vacancy {
                id: VacancyId((*id).to_owned()),
                title: (*title).to_owned(),
                cargo: rhflow_core::domain::org::CargoId((*cargo).to_owned()),
                sector: SectorId((*sector).to_owned()),
                status: *status,
            })
            .collect();

        Self { sectors, cargos, employees, vacancies }
    }

    /// Upserts the whole organization; safe to run repeatedly.
    pub async fn load<R>(&self, repo: &R) -> Result<SeedResult, RepositoryError>
    where
        R: OrgRepository + ?Sized,
    {
        for sector in &self.sectors {
            repo.save_sector(sector.clone()).await?;
        }
        for cargo in &self.cargos {
            repo.save_cargo(cargo.clone()).await?;
        }
        for employee in &self.employees {
            repo.save_employee(employee.clone()).await?;
        }
        for vacancy in &self.vacancies {
            repo.save_vacancy(vacancy.clone()).await?;
        }

        Ok(SeedResult {
            sectors: self.sectors.len(),
            cargos: self.cargos.len(),
            employees: self.employees.len(),
            vacancies: self.vacancies.len(),
        })
    }

    /// Checks that the stored organization still contains the demo records
    /// and that every routing stage resolves.
    pub async fn verify<R>(&self, repo: &R) -> Result<VerificationResult, RepositoryError>
    where
        R: OrgRepository + ?Sized,
    {
        let snapshot = repo.load_snapshot().await?;
        let mut checks = Vec::new();

        for employee in &self.employees {
            let present = snapshot
                .employee(&employee.id)
                .is_some_and(|stored| stored.cargo == employee.cargo);
            checks.push((format!("employee:{}", employee.id), present));
        }
        for vacancy in &self.vacancies {
            checks.push((format!("vacancy:{}", vacancy.id), snapshot.vacancy(&vacancy.id).is_some()));
        }

        let policy = RoutingPolicy::default();
        let locator = ApproverLocator::new(&snapshot, &policy);
        checks.push(("route:human_resources".to_owned(), locator.resolve(&RoutePlan::human_resources()).is_some()));
        checks.push(("route:director".to_owned(), locator.find_director().is_some()));
        for sector in ["s-log", "s-com"] {
            let sector = SectorId(sector.to_owned());
            checks.push((
                format!("route:gestor:{sector}"),
                locator.resolve(&RoutePlan::gestor_of(Some(&sector))).is_some(),
            ));
        }

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    pub fn requisition(vacancy: &str) -> RequisitionDetails {
        RequisitionDetails {
            vacancy: VacancyId(vacancy.to_owned()),
            vacancy_type: "aumento_quadro".to_owned(),
            replaced_employee: None,
            replacement_reason: None,
            workplace: Some("CD Norte".to_owned()),
            expected_start: NaiveDate::from_ymd_opt(2026, 11, 3),
            hiring_deadline: NaiveDate::from_ymd_opt(2026, 12, 15),
            working_hours: Some("08:00-17:48".to_owned()),
            justification: "peak season volume".to_owned(),
        }
    }

    pub fn transfer(subject: &str, proposed_cargo: &str, proposed_sector: &str) -> TransferDetails {
        TransferDetails {
            subject: EmployeeId(subject.to_owned()),
            proposed_cargo: rhflow_core::domain::org::CargoId(proposed_cargo.to_owned()),
            proposed_sector: SectorId(proposed_sector.to_owned()),
            proposed_salary: Some(Decimal::new(4_800_00, 2)),
            effective_date: NaiveDate::from_ymd_opt(2026, 12, 1),
            justification: "route expansion".to_owned(),
        }
    }

    pub fn termination(subject: &str) -> TerminationDetails {
        TerminationDetails {
            subject: EmployeeId(subject.to_owned()),
            termination_type: "sem_justa_causa".to_owned(),
            reason: "restructuring".to_owned(),
            expected_date: NaiveDate::from_ymd_opt(2026, 11, 30),
            notice_type: Some("indenizado".to_owned()),
            replacement_planned: false,
            justification: "position eliminated".to_owned(),
        }
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub sectors: usize,
    pub cargos: usize,
    pub employees: usize,
    pub vacancies: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
