use rhflow_db::migrations;

use crate::commands::{load_config, open_database, runtime, CommandResult, Setup, EXIT_DATABASE};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(setup) => return CommandResult::from_setup("migrate", setup),
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let applied = migrations::applied_count(&pool)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DATABASE))?;
        pool.close().await;
        Ok::<_, Setup>(applied)
    });

    match result {
        Ok(applied) => {
            tracing::info!(
                event_name = "cli.migrate.completed",
                correlation_id = "cli",
                applied,
                "schema is up to date"
            );
            CommandResult::success("migrate", format!("schema up to date ({applied} migrations applied)"))
        }
        Err(setup) => CommandResult::from_setup("migrate", setup),
    }
}
