use super::types::*;
use crate::config::{env_var_pattern, expand_env_vars};
use axum::http::HeaderName;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml_string = fs::read_to_string(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    parse_config(&yaml_string).map_err(|e| match e {
        ConfigError::YamlParse(e) => ConfigError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("in file '{}': {}", path.display(), e),
        )),
        other => other,
    })
}

/// Expand environment variables, parse and validate a YAML config.
pub fn parse_config(yaml: &str) -> Result<Config, ConfigError> {
    let yaml_string = expand_env_vars(yaml);
    check_unexpanded_vars(&yaml_string)?;

    let config: Config = serde_yaml::from_str(&yaml_string)?;
    validate_config(&config)?;

    Ok(config)
}

/// Checks for unexpanded environment variables and returns a helpful error
fn check_unexpanded_vars(yaml_string: &str) -> Result<(), ConfigError> {
    let mut unexpanded_vars: Vec<String> = env_var_pattern()
        .captures_iter(yaml_string)
        .map(|cap| cap[1].to_string())
        .collect();

    if unexpanded_vars.is_empty() {
        return Ok(());
    }

    unexpanded_vars.sort();
    unexpanded_vars.dedup();

    let error_msg = if unexpanded_vars.len() == 1 {
        format!(
            "Environment variable $env{{{0}}} is not set.\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variable: export {0}=...\n\
             2. Replace $env{{{0}}} in the config file with an actual value",
            unexpanded_vars[0]
        )
    } else {
        format!(
            "Environment variables are not set: {}\n\
             \n\
             To fix this, either:\n\
             1. Set the environment variables\n\
             2. Replace the variables in the config file with actual values",
            unexpanded_vars.join(", ")
        )
    };

    Err(ConfigError::Validation(error_msg))
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    validate_ingestion(&config.ingestion, &mut errors);
    validate_stream("request", &config.streams.request, &mut errors);
    validate_stream("application", &config.streams.application, &mut errors);

    if !config.streams.request.log_name.is_empty()
        && config.streams.request.log_name == config.streams.application.log_name
    {
        errors.push(format!(
            "streams.request and streams.application must use different log names (both are '{}')",
            config.streams.request.log_name
        ));
    }

    if config.resource.resource_type.trim().is_empty() {
        errors.push("resource.type must not be empty".to_string());
    }

    if config.labels.keys().any(|key| key.trim().is_empty()) {
        errors.push("labels: label keys must not be empty".to_string());
    }

    if let Some(header) = &config.trace_header {
        if HeaderName::from_bytes(header.as_bytes()).is_err() {
            errors.push(format!("trace_header: '{}' is not a valid header name", header));
        }
    }

    if let Err(e) = config.web.listen.parse::<SocketAddr>() {
        errors.push(format!(
            "web.listen: invalid address '{}': {}",
            config.web.listen, e
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}

fn validate_ingestion(ingestion: &IngestionConfig, errors: &mut Vec<String>) {
    if ingestion.backend != BackendType::Http {
        return;
    }

    if !(ingestion.endpoint.starts_with("http://") || ingestion.endpoint.starts_with("https://")) {
        errors.push(format!(
            "ingestion.endpoint: '{}' must be an http:// or https:// URL",
            ingestion.endpoint
        ));
    }

    match &ingestion.project_id {
        Some(project) if !project.trim().is_empty() => {}
        _ => errors.push("ingestion.project_id is required for the http backend".to_string()),
    }

    if ingestion.timeout.is_zero() {
        errors.push("ingestion.timeout must be greater than zero".to_string());
    }
}

fn validate_stream(name: &str, stream: &StreamConfig, errors: &mut Vec<String>) {
    if stream.log_name.trim().is_empty() {
        errors.push(format!("streams.{}.log_name must not be empty", name));
    }
    if stream.max_batch_size == 0 {
        errors.push(format!("streams.{}.max_batch_size must be at least 1", name));
    }
}
