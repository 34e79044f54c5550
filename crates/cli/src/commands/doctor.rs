use rhflow_core::config::{AppConfig, LoadOptions};
use rhflow_core::domain::org::EmployeeId;
use rhflow_core::org::{ApproverLocator, OrgDirectory, OrgSnapshot, RoutePlan};
use rhflow_db::migrations::{self, MIGRATOR};
use rhflow_db::{connect_with_config, OrgRepository, SqlOrgRepository};
use serde::Serialize;

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn pass(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Pass, details: details.into() }
    }

    fn fail(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, details: details.into() }
    }

    fn skipped(name: &'static str, details: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Skipped, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

const DATA_CHECKS: [&str; 4] =
    ["schema_migrations", "active_director", "hr_approver", "fallback_approver"];

/// Exit code reported when any readiness check fails.
pub const EXIT_UNHEALTHY: u8 = 1;

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { EXIT_UNHEALTHY };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::pass("config_validation", "configuration loaded and validated"));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::fail("config_validation", error.to_string()));
            checks.push(DoctorCheck::skipped(
                "database_connectivity",
                "skipped because configuration did not load",
            ));
            for name in DATA_CHECKS {
                checks.push(DoctorCheck::skipped(name, "skipped because configuration did not load"));
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            let mut checks = vec![DoctorCheck::fail(
                "database_connectivity",
                format!("failed to initialize async runtime: {error}"),
            )];
            checks.extend(DATA_CHECKS.map(|name| DoctorCheck::skipped(name, "runtime unavailable")));
            return checks;
        }
    };

    runtime.block_on(async {
        let pool = match connect_with_config(&config.database).await {
            Ok(pool) => pool,
            Err(error) => {
                let mut checks = vec![DoctorCheck::fail(
                    "database_connectivity",
                    format!("failed to connect to database: {error}"),
                )];
                checks.extend(
                    DATA_CHECKS.map(|name| DoctorCheck::skipped(name, "database unavailable")),
                );
                return checks;
            }
        };

        let mut checks = vec![DoctorCheck::pass(
            "database_connectivity",
            format!("connected using `{}`", config.database.url),
        )];

        let expected =
            MIGRATOR.iter().filter(|migration| migration.migration_type.is_up_migration()).count()
                as i64;
        let applied = migrations::applied_count(&pool).await.unwrap_or(0);
        if applied < expected {
            checks.push(DoctorCheck::fail(
                "schema_migrations",
                format!("{applied} of {expected} migrations applied; run `rhflow migrate`"),
            ));
            checks.extend(
                DATA_CHECKS[1..].iter().map(|name| DoctorCheck::skipped(*name, "schema not migrated")),
            );
            pool.close().await;
            return checks;
        }
        checks.push(DoctorCheck::pass("schema_migrations", format!("{applied} migrations applied")));

        match SqlOrgRepository::new(pool.clone()).load_snapshot().await {
            Ok(snapshot) => checks.extend(check_routing(&snapshot, config)),
            Err(error) => {
                for name in &DATA_CHECKS[1..] {
                    checks.push(DoctorCheck::fail(*name, format!("could not load organization: {error}")));
                }
            }
        }
        pool.close().await;
        checks
    })
}

fn check_routing(snapshot: &OrgSnapshot, config: &AppConfig) -> Vec<DoctorCheck> {
    let policy = config.workflow.routing_policy();
    let locator = ApproverLocator::new(snapshot, &policy);
    let mut checks = Vec::new();

    checks.push(match locator.find_director() {
        Some(director) => {
            DoctorCheck::pass("active_director", format!("{} ({})", director.name, director.id))
        }
        None => DoctorCheck::fail(
            "active_director",
            "no active director; requests with no other approver cannot be routed",
        ),
    });

    checks.push(match locator.require(&RoutePlan::human_resources()) {
        Ok(approver) => {
            DoctorCheck::pass("hr_approver", format!("{} ({})", approver.name, approver.id))
        }
        Err(error) => DoctorCheck::fail("hr_approver", error.to_string()),
    });

    checks.push(match &config.workflow.fallback_approver {
        None => DoctorCheck::skipped("fallback_approver", "no fallback approver configured"),
        Some(id) => match snapshot.employee(&EmployeeId(id.clone())) {
            Some(employee) if employee.active => {
                DoctorCheck::pass("fallback_approver", format!("{} ({})", employee.name, employee.id))
            }
            Some(_) => DoctorCheck::fail("fallback_approver", format!("employee `{id}` is inactive")),
            None => DoctorCheck::fail("fallback_approver", format!("employee `{id}` does not exist")),
        },
    });

    checks
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
