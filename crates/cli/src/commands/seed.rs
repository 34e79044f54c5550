use rhflow_db::{DemoOrganization, SqlOrgRepository};
use serde_json::json;

use crate::commands::{load_config, open_database, runtime, CommandResult, Setup, EXIT_REQUEST, EXIT_SCHEMA};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(setup) => return CommandResult::from_setup("seed", setup),
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let org = SqlOrgRepository::new(pool.clone());
        let demo = DemoOrganization::standard();

        let seeded = demo
            .load(&org)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_SCHEMA))?;
        let verification = demo
            .verify(&org)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), EXIT_REQUEST))?;
        pool.close().await;

        if !verification.all_present {
            let failed = failed_checks(&verification.checks);
            return Err(("seed_verification", verification_message(&failed), EXIT_REQUEST));
        }
        Ok::<_, Setup>(seeded)
    });

    match result {
        Ok(seeded) => CommandResult::success_with(
            "seed",
            format!(
                "demo organization loaded: {} sectors, {} cargos, {} employees, {} vacancies",
                seeded.sectors, seeded.cargos, seeded.employees, seeded.vacancies
            ),
            Some(json!({
                "sectors": seeded.sectors,
                "cargos": seeded.cargos,
                "employees": seeded.employees,
                "vacancies": seeded.vacancies,
            })),
        ),
        Err(setup) => CommandResult::from_setup("seed", setup),
    }
}

fn failed_checks(checks: &[(String, bool)]) -> Vec<&str> {
    checks.iter().filter_map(|(check, passed)| (!passed).then_some(check.as_str())).collect()
}

fn verification_message(failed: &[&str]) -> String {
    if failed.is_empty() {
        "Some seed data failed to load".to_string()
    } else {
        format!("Seed verification failed for checks: {}", failed.join(", "))
    }
}
