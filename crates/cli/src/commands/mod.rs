pub mod actions;
pub mod config;
pub mod doctor;
pub mod hierarchy;
pub mod migrate;
pub mod open;
pub mod pending;
pub mod seed;

use rhflow_core::config::{AppConfig, LoadOptions};
use rhflow_core::errors::ApplicationError;
use rhflow_db::{connect_with_config, migrations, DbPool};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DATABASE: u8 = 4;
pub const EXIT_SCHEMA: u8 = 5;
pub const EXIT_REQUEST: u8 = 6;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with(command, message, None)
    }

    pub fn success_with(command: &str, message: impl Into<String>, data: Option<Value>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            user_message: None,
            correlation_id: None,
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            user_message: None,
            correlation_id: None,
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_setup(command: &str, (error_class, message, exit_code): Setup) -> Self {
        Self::failure(command, error_class, message, exit_code)
    }

    /// Reports a service error with its class and a fresh correlation id.
    pub fn from_application(command: &str, error: ApplicationError) -> Self {
        let error_class = error.class();
        let exit_code = match &error {
            ApplicationError::Persistence(_) => EXIT_DATABASE,
            ApplicationError::Configuration(_) => EXIT_CONFIG,
            _ => EXIT_REQUEST,
        };
        let message = error.to_string();
        let interface = error.into_interface(format!("cli-{command}-{}", uuid::Uuid::new_v4()));
        tracing::warn!(
            event_name = "cli.command.failed",
            command,
            error_class,
            correlation_id = interface.correlation_id(),
            error = %message,
            "command failed"
        );

        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message,
            user_message: Some(interface.user_message().to_string()),
            correlation_id: Some(interface.correlation_id().to_string()),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

/// Failure raised while preparing a command: class, message and exit code.
pub type Setup = (&'static str, String, u8);

/// Loads the effective config, reporting failures as a ready-made outcome.
pub fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default())
        .map_err(|error| CommandResult::from_application(command, ApplicationError::from(error)))
}

pub fn runtime() -> Result<Runtime, Setup> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        ("runtime_init", format!("failed to initialize async runtime: {error}"), EXIT_RUNTIME)
    })
}

/// Connects and brings the schema up to date.
pub async fn open_database(config: &AppConfig) -> Result<DbPool, Setup> {
    let pool = connect_with_config(&config.database)
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DATABASE))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), EXIT_SCHEMA))?;
    Ok(pool)
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use rhflow_core::domain::request::RequestId;
    use rhflow_core::errors::ApplicationError;
    use serde_json::Value;

    use rhflow_core::config::ConfigError;

    use super::{CommandResult, EXIT_CONFIG, EXIT_DATABASE, EXIT_REQUEST};

    #[test]
    fn application_errors_carry_class_and_correlation() {
        let result = CommandResult::from_application(
            "approve",
            ApplicationError::NotFound { entity: "request", id: "r-1".to_owned() },
        );
        assert_eq!(result.exit_code, EXIT_REQUEST);

        let payload: Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(payload["error_class"], "not_found");
        assert!(payload["correlation_id"].as_str().is_some_and(|id| id.starts_with("cli-approve-")));
        assert_eq!(
            payload["user_message"],
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn config_errors_use_config_exit_code() {
        let result = CommandResult::from_application(
            "migrate",
            ApplicationError::from(ConfigError::Validation("database.url must be sqlite".to_owned())),
        );
        assert_eq!(result.exit_code, EXIT_CONFIG);

        let payload: Value = serde_json::from_str(&result.output).expect("json");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().is_some_and(|message| message.contains("database.url")));
    }

    #[test]
    fn persistence_errors_use_database_exit_code() {
        let result = CommandResult::from_application(
            "approve",
            ApplicationError::Persistence("disk I/O error".to_owned()),
        );
        assert_eq!(result.exit_code, EXIT_DATABASE);

        let conflict = CommandResult::from_application(
            "approve",
            ApplicationError::Conflict { request: RequestId("r-1".to_owned()), attempts: 4 },
        );
        let payload: Value = serde_json::from_str(&conflict.output).expect("json");
        assert_eq!(payload["error_class"], "conflict");
        assert!(payload.get("data").is_none());
    }
}
