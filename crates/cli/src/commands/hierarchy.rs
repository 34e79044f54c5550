use rhflow_core::domain::org::{Employee, EmployeeId};
use rhflow_core::org::{ApproverLocator, OrgDirectory, OrgSnapshot, RoutePlan};
use rhflow_db::{OrgRepository, SqlOrgRepository};
use serde::Serialize;

use crate::commands::{
    load_config, open_database, runtime, CommandResult, Setup, EXIT_DATABASE, EXIT_REQUEST,
};

#[derive(Debug, Serialize)]
struct EmployeeSummary {
    id: String,
    name: String,
    cargo: Option<String>,
    level: Option<u8>,
    sector: Option<String>,
}

impl From<&Employee> for EmployeeSummary {
    fn from(employee: &Employee) -> Self {
        Self {
            id: employee.id.0.clone(),
            name: employee.name.clone(),
            cargo: employee.cargo.as_ref().map(|cargo| cargo.0.clone()),
            level: employee.level.map(|level| level.rank()),
            sector: employee.primary_sector.as_ref().map(|sector| sector.0.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
struct Routing {
    manager_above: Option<String>,
    sector_gestor: Option<String>,
    immediate_manager: Option<String>,
    human_resources: Option<String>,
}

#[derive(Debug, Serialize)]
struct HierarchyView {
    employee: EmployeeSummary,
    superiors: Vec<EmployeeSummary>,
    direct_subordinates: Vec<EmployeeSummary>,
    subordinates: Vec<EmployeeSummary>,
    subjects_in_scope: Vec<String>,
    routing: Routing,
}

pub fn run(employee: &str) -> CommandResult {
    let config = match load_config("hierarchy") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(setup) => return CommandResult::from_setup("hierarchy", setup),
    };

    let snapshot = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let snapshot = SqlOrgRepository::new(pool.clone())
            .load_snapshot()
            .await
            .map_err(|error| ("persistence", error.to_string(), EXIT_DATABASE))?;
        pool.close().await;
        Ok::<_, Setup>(snapshot)
    });
    let snapshot = match snapshot {
        Ok(snapshot) => snapshot,
        Err(setup) => return CommandResult::from_setup("hierarchy", setup),
    };

    let policy = config.workflow.routing_policy();
    match describe(&snapshot, &ApproverLocator::new(&snapshot, &policy), &EmployeeId(employee.to_owned())) {
        Some(view) => {
            let message = format!(
                "{} has {} superiors and {} subordinates",
                view.employee.name,
                view.superiors.len(),
                view.subordinates.len()
            );
            CommandResult::success_with("hierarchy", message, serde_json::to_value(view).ok())
        }
        None => CommandResult::failure(
            "hierarchy",
            "not_found",
            format!("employee `{employee}` not found"),
            EXIT_REQUEST,
        ),
    }
}

fn describe(
    snapshot: &OrgSnapshot,
    locator: &ApproverLocator<'_>,
    id: &EmployeeId,
) -> Option<HierarchyView> {
    let employee = snapshot.employee(id)?;
    let graph = locator.graph();
    let id_of = |found: Option<&Employee>| found.map(|employee| employee.id.0.clone());

    Some(HierarchyView {
        employee: employee.into(),
        superiors: graph.superiors(employee).into_iter().map(EmployeeSummary::from).collect(),
        direct_subordinates: graph
            .direct_subordinates(employee)
            .into_iter()
            .map(EmployeeSummary::from)
            .collect(),
        subordinates: graph
            .subordinates(employee, true)
            .into_iter()
            .map(EmployeeSummary::from)
            .collect(),
        subjects_in_scope: graph
            .subjects_in_scope(employee)
            .into_iter()
            .map(|subject| subject.id.0.clone())
            .collect(),
        routing: Routing {
            manager_above: id_of(locator.resolve(&RoutePlan::manager_of(id))),
            sector_gestor: id_of(
                locator.resolve(&RoutePlan::gestor_of(employee.primary_sector.as_ref())),
            ),
            immediate_manager: id_of(
                locator.resolve(&RoutePlan::immediate_manager(employee.primary_sector.as_ref(), id)),
            ),
            human_resources: id_of(locator.resolve(&RoutePlan::human_resources())),
        },
    })
}
