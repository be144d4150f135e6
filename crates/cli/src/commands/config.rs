use customer_api_core::config::{AppConfig, ConfigSources, LoadOptions};
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_RUNTIME};

const PRECEDENCE: &str = "effective config (source precedence: env > file > default)";

#[derive(Debug, Serialize)]
struct ConfigReport {
    command: &'static str,
    status: &'static str,
    error_class: Option<&'static str>,
    message: &'static str,
    settings: Vec<SettingLine>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct SettingLine {
    key: &'static str,
    value: String,
    source: String,
}

pub fn run() -> CommandResult {
    let (config, sources) = match AppConfig::load_with_sources(LoadOptions::default()) {
        Ok(loaded) => loaded,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let report = ConfigReport {
        command: "config",
        status: "ok",
        error_class: None,
        message: PRECEDENCE,
        settings: settings(&config, &sources),
    };

    match serde_json::to_string(&report) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure(
            "config",
            "serialization",
            format!("failed to render configuration: {error}"),
            EXIT_RUNTIME,
        ),
    }
}

fn settings(config: &AppConfig, sources: &ConfigSources) -> Vec<SettingLine> {
    config
        .entries()
        .map(|(key, value)| SettingLine { key, value, source: sources.get(key).to_string() })
        .collect()
}
