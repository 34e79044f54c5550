//! Shared organization fixtures for flow tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::domain::org::{Cargo, CargoId, Employee, EmployeeId, ManagementLevel, Sector, SectorId};
use crate::domain::requisition::RequisitionDetails;
use crate::domain::termination::TerminationDetails;
use crate::domain::transfer::TransferDetails;
use crate::domain::vacancy::{Vacancy, VacancyId, VacancyStatus};
use crate::org::directory::OrgSnapshot;

pub fn id(value: &str) -> EmployeeId {
    EmployeeId(value.to_owned())
}

pub fn sector(value: &str) -> SectorId {
    SectorId(value.to_owned())
}

pub fn cargo(value: &str) -> CargoId {
    CargoId(value.to_owned())
}

pub struct Org {
    pub snapshot: OrgSnapshot,
}

fn cargos() -> [Cargo; 5] {
    [
        Cargo::new("c-dir", "Diretor", ManagementLevel::Director),
        Cargo::new("c-ger", "Gerente", ManagementLevel::Manager),
        Cargo::new("c-coo", "Coordenador", ManagementLevel::Coordinator),
        Cargo::new("c-sup", "Supervisor", ManagementLevel::Supervisor),
        Cargo::new("c-ana", "Analista", ManagementLevel::Analyst),
    ]
}

fn vacancies() -> [Vacancy; 2] {
    [
        Vacancy {
            id: VacancyId("v-open".to_owned()),
            title: "Analista de Logistica".to_owned(),
            cargo: cargo("c-ana"),
            sector: sector("s-log"),
            status: VacancyStatus::Open,
        },
        Vacancy {
            id: VacancyId("v-filled".to_owned()),
            title: "Supervisor de Logistica".to_owned(),
            cargo: cargo("c-sup"),
            sector: sector("s-log"),
            status: VacancyStatus::Filled,
        },
    ]
}

impl Org {
    /// DIRETORIA, RECURSOS HUMANOS, LOGISTICA and COMERCIAL with one
    /// employee per interesting level.
    pub fn standard() -> Self {
        let [director, manager, coordinator, supervisor, analyst] = cargos();
        let dir = Sector::named("s-dir", "DIRETORIA");
        let rh = Sector::named("s-rh", "RECURSOS HUMANOS");
        let log = Sector::named("s-log", "LOGISTICA");
        let com = Sector::named("s-com", "COMERCIAL");
        let [open, filled] = vacancies();

        let snapshot = OrgSnapshot::new()
            .with_employee(Employee::new("dir-1", "Diana").with_cargo(&director).in_sector(&dir.id))
            .with_employee(Employee::new("rh-coo", "Renata").with_cargo(&coordinator).in_sector(&rh.id))
            .with_employee(Employee::new("rh-ana", "Rui").with_cargo(&analyst).in_sector(&rh.id))
            .with_employee(Employee::new("ger-log", "Gustavo").with_cargo(&manager).in_sector(&log.id))
            .with_employee(Employee::new("coo-log", "Clara").with_cargo(&coordinator).in_sector(&log.id))
            .with_employee(Employee::new("sup-log", "Sonia").with_cargo(&supervisor).in_sector(&log.id))
            .with_employee(
                Employee::new("ana-log", "Andre")
                    .with_cargo(&analyst)
                    .in_sector(&log.id)
                    .admitted(NaiveDate::from_ymd_opt(2021, 3, 1).expect("valid date")),
            )
            .with_employee(Employee::new("ger-com", "Gabriel").with_cargo(&manager).in_sector(&com.id))
            .with_employee(Employee::new("ana-com", "Amanda").with_cargo(&analyst).in_sector(&com.id))
            .with_sector(dir)
            .with_sector(rh)
            .with_sector(log)
            .with_sector(com)
            .with_cargo(director)
            .with_cargo(manager)
            .with_cargo(coordinator)
            .with_cargo(supervisor)
            .with_cargo(analyst)
            .with_vacancy(open)
            .with_vacancy(filled);

        Self { snapshot }
    }

    /// Two sectors with gestors only: no HR department and no directors.
    pub fn without_hr_or_directors() -> Self {
        let [_, manager, _, _, analyst] = cargos();
        let log = Sector::named("s-log", "LOGISTICA");
        let com = Sector::named("s-com", "COMERCIAL");
        let [open, _] = vacancies();

        let snapshot = OrgSnapshot::new()
            .with_employee(Employee::new("ger-log", "Gustavo").with_cargo(&manager).in_sector(&log.id))
            .with_employee(Employee::new("ger-com", "Gabriel").with_cargo(&manager).in_sector(&com.id))
            .with_employee(Employee::new("ana-log", "Andre").with_cargo(&analyst).in_sector(&log.id))
            .with_sector(log)
            .with_sector(com)
            .with_cargo(manager)
            .with_cargo(analyst)
            .with_vacancy(open);

        Self { snapshot }
    }
}

pub fn requisition_details(vacancy: &str) -> RequisitionDetails {
    RequisitionDetails {
        vacancy: VacancyId(vacancy.to_owned()),
        vacancy_type: "aumento_quadro".to_owned(),
        replaced_employee: None,
        replacement_reason: None,
        workplace: Some("CD Norte".to_owned()),
        expected_start: NaiveDate::from_ymd_opt(2026, 11, 3),
        hiring_deadline: None,
        working_hours: Some("08:00-17:48".to_owned()),
        justification: "seasonal volume".to_owned(),
    }
}

pub fn transfer_details(subject: &str, proposed_cargo: &str, proposed_sector: &str) -> TransferDetails {
    TransferDetails {
        subject: id(subject),
        proposed_cargo: cargo(proposed_cargo),
        proposed_sector: sector(proposed_sector),
        proposed_salary: Some(Decimal::new(5_250_00, 2)),
        effective_date: NaiveDate::from_ymd_opt(2026, 12, 1),
        justification: "covers the new route".to_owned(),
    }
}

pub fn termination_details(subject: &str) -> TerminationDetails {
    TerminationDetails {
        subject: id(subject),
        termination_type: "sem_justa_causa".to_owned(),
        reason: "restructuring".to_owned(),
        expected_date: NaiveDate::from_ymd_opt(2026, 11, 30),
        notice_type: Some("indenizado".to_owned()),
        replacement_planned: false,
        justification: "position eliminated".to_owned(),
    }
}
