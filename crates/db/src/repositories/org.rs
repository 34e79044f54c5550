use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use sqlx::Row;

use rhflow_core::domain::org::{
    Cargo, CargoId, Employee, EmployeeId, ManagementLevel, Sector, SectorId, SectorRole,
};
use rhflow_core::domain::vacancy::{Vacancy, VacancyId, VacancyStatus};
use rhflow_core::org::OrgSnapshot;

use super::{OrgRepository, RepositoryError};
use crate::DbPool;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqlOrgRepository {
    pool: DbPool,
}

impl SqlOrgRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn responsible_sectors(
        &self,
    ) -> Result<HashMap<String, BTreeSet<SectorId>>, RepositoryError> {
        let rows = sqlx::query("SELECT employee_id, sector_id FROM employee_responsible_sector")
            .fetch_all(&self.pool)
            .await?;

        let mut by_employee: HashMap<String, BTreeSet<SectorId>> = HashMap::new();
        for row in rows {
            let employee: String = row.try_get("employee_id").map_err(RepositoryError::decode)?;
            let sector: String = row.try_get("sector_id").map_err(RepositoryError::decode)?;
            by_employee.entry(employee).or_default().insert(SectorId(sector));
        }
        Ok(by_employee)
    }
}

fn row_to_sector(row: &sqlx::sqlite::SqliteRow) -> Result<Sector, RepositoryError> {
    let id: String = row.try_get("id").map_err(RepositoryError::decode)?;
    let name: String = row.try_get("name").map_err(RepositoryError::decode)?;
    let description: Option<String> = row.try_get("description").map_err(RepositoryError::decode)?;
    let role: String = row.try_get("role").map_err(RepositoryError::decode)?;
    let role = SectorRole::parse(&role)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown sector role `{role}`")))?;

    Ok(Sector { id: SectorId(id), name, description, role })
}

fn row_to_cargo(row: &sqlx::sqlite::SqliteRow) -> Result<Cargo, RepositoryError> {
    let id: String = row.try_get("id").map_err(RepositoryError::decode)?;
    let name: String = row.try_get("name").map_err(RepositoryError::decode)?;
    let description: Option<String> = row.try_get("description").map_err(RepositoryError::decode)?;
    let level: i64 = row.try_get("level").map_err(RepositoryError::decode)?;
    let level = u8::try_from(level)
        .ok()
        .and_then(ManagementLevel::from_rank)
        .ok_or_else(|| RepositoryError::Decode(format!("cargo `{id}` has invalid level {level}")))?;

    Ok(Cargo { id: CargoId(id), name, level, description })
}

fn row_to_employee(
    row: &sqlx::sqlite::SqliteRow,
    responsible: &mut HashMap<String, BTreeSet<SectorId>>,
) -> Result<Employee, RepositoryError> {
    let id: String = row.try_get("id").map_err(RepositoryError::decode)?;
    let name: String = row.try_get("name").map_err(RepositoryError::decode)?;
    let active: i64 = row.try_get("active").map_err(RepositoryError::decode)?;
    let cargo: Option<String> = row.try_get("cargo_id").map_err(RepositoryError::decode)?;
    let level: Option<i64> = row.try_get("level").map_err(RepositoryError::decode)?;
    let primary_sector: Option<String> =
        row.try_get("primary_sector_id").map_err(RepositoryError::decode)?;
    let login: Option<String> = row.try_get("login").map_err(RepositoryError::decode)?;
    let admission_date: Option<String> =
        row.try_get("admission_date").map_err(RepositoryError::decode)?;
    let admission_date = admission_date
        .map(|raw| NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(RepositoryError::decode))
        .transpose()?;

    Ok(Employee {
        responsible_sectors: responsible.remove(&id).unwrap_or_default(),
        id: EmployeeId(id),
        name,
        active: active != 0,
        cargo: cargo.map(CargoId),
        level: level.and_then(|level| u8::try_from(level).ok()).and_then(ManagementLevel::from_rank),
        primary_sector: primary_sector.map(SectorId),
        login,
        admission_date,
    })
}

fn row_to_vacancy(row: &sqlx::sqlite::SqliteRow) -> Result<Vacancy, RepositoryError> {
    let id: String = row.try_get("id").map_err(RepositoryError::decode)?;
    let title: String = row.try_get("title").map_err(RepositoryError::decode)?;
    let cargo: String = row.try_get("cargo_id").map_err(RepositoryError::decode)?;
    let sector: String = row.try_get("sector_id").map_err(RepositoryError::decode)?;
    let status: String = row.try_get("status").map_err(RepositoryError::decode)?;
    let status = VacancyStatus::parse(&status)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown vacancy status `{status}`")))?;

    Ok(Vacancy {
        id: VacancyId(id),
        title,
        cargo: CargoId(cargo),
        sector: SectorId(sector),
        status,
    })
}

const EMPLOYEE_COLUMNS: &str = "SELECT e.id, e.name, e.active, e.cargo_id, c.level,
            e.primary_sector_id, e.login, e.admission_date
     FROM employee e LEFT JOIN cargo c ON c.id = e.cargo_id";

#[async_trait::async_trait]
impl OrgRepository for SqlOrgRepository {
    async fn load_snapshot(&self) -> Result<OrgSnapshot, RepositoryError> {
        let mut snapshot = OrgSnapshot::new();

        let sectors = sqlx::query("SELECT id, name, description, role FROM sector")
            .fetch_all(&self.pool)
            .await?;
        for row in &sectors {
            snapshot.insert_sector(row_to_sector(row)?);
        }

        let cargos = sqlx::query("SELECT id, name, level, description FROM cargo")
            .fetch_all(&self.pool)
            .await?;
        for row in &cargos {
            snapshot.insert_cargo(row_to_cargo(row)?);
        }

        let mut responsible = self.responsible_sectors().await?;
        let employees = sqlx::query(EMPLOYEE_COLUMNS).fetch_all(&self.pool).await?;
        for row in &employees {
            snapshot.insert_employee(row_to_employee(row, &mut responsible)?);
        }

        let vacancies = sqlx::query("SELECT id, title, cargo_id, sector_id, status FROM vacancy")
            .fetch_all(&self.pool)
            .await?;
        for row in &vacancies {
            snapshot.insert_vacancy(row_to_vacancy(row)?);
        }

        Ok(snapshot)
    }

    async fn find_employee(&self, id: &EmployeeId) -> Result<Option<Employee>, RepositoryError> {
        let sql = format!("{EMPLOYEE_COLUMNS} WHERE e.id = ?");
        let row = sqlx::query(&sql)
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let sectors: Vec<String> = sqlx::query_scalar(
            "SELECT sector_id FROM employee_responsible_sector WHERE employee_id = ?",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;
        let mut responsible = HashMap::from([(
            id.0.clone(),
            sectors.into_iter().map(SectorId).collect::<BTreeSet<_>>(),
        )]);

        Ok(Some(row_to_employee(&row, &mut responsible)?))
    }

    async fn save_sector(&self, sector: Sector) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sector (id, name, description, role)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 description = excluded.description,
                 role = excluded.role",
        )
        .bind(&sector.id.0)
        .bind(&sector.name)
        .bind(&sector.description)
        .bind(sector.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| RepositoryError::unique_name("sector", &sector.name, error))?;

        Ok(())
    }

    async fn save_cargo(&self, cargo: Cargo) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cargo (id, name, level, description)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 level = excluded.level,
                 description = excluded.description",
        )
        .bind(&cargo.id.0)
        .bind(&cargo.name)
        .bind(i64::from(cargo.level.rank()))
        .bind(&cargo.description)
        .execute(&self.pool)
        .await
        .map_err(|error| RepositoryError::unique_name("cargo", &cargo.name, error))?;

        Ok(())
    }

    async fn save_employee(&self, employee: Employee) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO employee (id, name, active, cargo_id, primary_sector_id, login, admission_date)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 active = excluded.active,
                 cargo_id = excluded.cargo_id,
                 primary_sector_id = excluded.primary_sector_id,
                 login = excluded.login,
                 admission_date = excluded.admission_date",
        )
        .bind(&employee.id.0)
        .bind(&employee.name)
        .bind(i64::from(employee.active))
        .bind(employee.cargo.as_ref().map(|cargo| cargo.0.as_str()))
        .bind(employee.primary_sector.as_ref().map(|sector| sector.0.as_str()))
        .bind(&employee.login)
        .bind(employee.admission_date.map(|date| date.format(DATE_FORMAT).to_string()))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM employee_responsible_sector WHERE employee_id = ?")
            .bind(&employee.id.0)
            .execute(&mut *tx)
            .await?;
        for sector in &employee.responsible_sectors {
            sqlx::query(
                "INSERT INTO employee_responsible_sector (employee_id, sector_id) VALUES (?, ?)",
            )
            .bind(&employee.id.0)
            .bind(&sector.0)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn save_vacancy(&self, vacancy: Vacancy) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO vacancy (id, title, cargo_id, sector_id, status)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 cargo_id = excluded.cargo_id,
                 sector_id = excluded.sector_id,
                 status = excluded.status",
        )
        .bind(&vacancy.id.0)
        .bind(&vacancy.title)
        .bind(&vacancy.cargo.0)
        .bind(&vacancy.sector.0)
        .bind(vacancy.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use rhflow_core::domain::org::{
        Cargo, Employee, EmployeeId, ManagementLevel, Sector, SectorId, SectorRole,
    };
    use rhflow_core::domain::vacancy::{Vacancy, VacancyId, VacancyStatus};
    use rhflow_core::org::OrgDirectory;

    use super::SqlOrgRepository;
    use crate::repositories::{OrgRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> SqlOrgRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlOrgRepository::new(pool)
    }

    #[tokio::test]
    async fn snapshot_round_trips_structure_and_responsibilities() {
        let repo = setup().await;
        let rh = Sector::named("s-rh", "Recursos Humanos");
        let log = Sector::named("s-log", "LOGISTICA");
        let coordinator = Cargo::new("c-coo", "Coordenador", ManagementLevel::Coordinator);
        repo.save_sector(rh.clone()).await.expect("save rh");
        repo.save_sector(log.clone()).await.expect("save log");
        repo.save_cargo(coordinator.clone()).await.expect("save cargo");
        repo.save_employee(
            Employee::new("rh-coo", "Renata")
                .with_cargo(&coordinator)
                .in_sector(&rh.id)
                .responsible_for(&log.id)
                .admitted(NaiveDate::from_ymd_opt(2019, 5, 2).expect("date")),
        )
        .await
        .expect("save employee");
        repo.save_vacancy(Vacancy {
            id: VacancyId("v-1".to_owned()),
            title: "Coordenador".to_owned(),
            cargo: coordinator.id.clone(),
            sector: log.id.clone(),
            status: VacancyStatus::Open,
        })
        .await
        .expect("save vacancy");

        let snapshot = repo.load_snapshot().await.expect("snapshot");
        let employee =
            snapshot.employee(&EmployeeId("rh-coo".to_owned())).expect("employee loaded");
        assert_eq!(employee.level, Some(ManagementLevel::Coordinator));
        assert!(employee.covers_sector(&SectorId("s-log".to_owned())));
        assert_eq!(employee.admission_date, NaiveDate::from_ymd_opt(2019, 5, 2));
        assert_eq!(snapshot.sectors_with_role(&SectorRole::HR_ROLES).len(), 1);
        assert!(snapshot.vacancy(&VacancyId("v-1".to_owned())).is_some_and(Vacancy::is_open));
    }

    #[tokio::test]
    async fn sector_and_cargo_names_are_unique() {
        let repo = setup().await;
        repo.save_sector(Sector::named("s-1", "LOGISTICA")).await.expect("first sector");
        let duplicate = repo.save_sector(Sector::named("s-2", "LOGISTICA")).await;
        assert!(matches!(
            duplicate,
            Err(RepositoryError::Duplicate { entity: "sector", ref name }) if name == "LOGISTICA"
        ));
        repo.save_sector(Sector::named("s-1", "LOGISTICA")).await.expect("resave same id");

        let manager = Cargo::new("c-1", "Gerente", ManagementLevel::Manager);
        repo.save_cargo(manager).await.expect("first cargo");
        let duplicate =
            repo.save_cargo(Cargo::new("c-2", "Gerente", ManagementLevel::Coordinator)).await;
        assert!(matches!(duplicate, Err(RepositoryError::Duplicate { entity: "cargo", .. })));

        let snapshot = repo.load_snapshot().await.expect("snapshot");
        assert_eq!(snapshot.sectors().count(), 1);
        assert_eq!(snapshot.cargos().count(), 1);
    }

    #[tokio::test]
    async fn save_employee_replaces_responsibilities() {
        let repo = setup().await;
        let log = Sector::named("s-log", "LOGISTICA");
        let com = Sector::named("s-com", "COMERCIAL");
        repo.save_sector(log.clone()).await.expect("save log");
        repo.save_sector(com.clone()).await.expect("save com");

        let employee = Employee::new("e-1", "Ana").in_sector(&log.id).responsible_for(&com.id);
        repo.save_employee(employee.clone()).await.expect("first save");
        let mut updated = employee;
        updated.responsible_sectors.clear();
        updated.active = false;
        repo.save_employee(updated).await.expect("second save");

        let found = repo
            .find_employee(&EmployeeId("e-1".to_owned()))
            .await
            .expect("find")
            .expect("present");
        assert!(found.responsible_sectors.is_empty());
        assert!(!found.active);
        assert_eq!(found.level, None);
        assert!(repo.find_employee(&EmployeeId("nobody".to_owned())).await.expect("find").is_none());
    }
}
