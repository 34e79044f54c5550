use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rhflow_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let fallback = config.workflow.fallback_approver.as_deref().unwrap_or("<unset>");
    let lines = [
        "effective config (source precedence: env > file > default):".to_string(),
        render_line(
            "database.url",
            &config.database.url,
            source("database.url", &["RHFLOW_DATABASE_URL"]),
        ),
        render_line(
            "database.max_connections",
            &config.database.max_connections.to_string(),
            source("database.max_connections", &["RHFLOW_DATABASE_MAX_CONNECTIONS"]),
        ),
        render_line(
            "database.timeout_secs",
            &config.database.timeout_secs.to_string(),
            source("database.timeout_secs", &["RHFLOW_DATABASE_TIMEOUT_SECS"]),
        ),
        render_line(
            "workflow.fallback_approver",
            fallback,
            source("workflow.fallback_approver", &["RHFLOW_WORKFLOW_FALLBACK_APPROVER"]),
        ),
        render_line(
            "workflow.conflict_retries",
            &config.workflow.conflict_retries.to_string(),
            source("workflow.conflict_retries", &["RHFLOW_WORKFLOW_CONFLICT_RETRIES"]),
        ),
        render_line(
            "logging.level",
            &config.logging.level,
            source("logging.level", &["RHFLOW_LOGGING_LEVEL", "RHFLOW_LOG_LEVEL"]),
        ),
        render_line(
            "logging.format",
            config.logging.format.as_str(),
            source("logging.format", &["RHFLOW_LOGGING_FORMAT", "RHFLOW_LOG_FORMAT"]),
        ),
    ];

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), Path::new("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
