//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check plugin kinds against the factory table
//! - Validate value ranges (capacities > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ReplayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ReplayConfig;
use crate::http::client::Target;
use crate::observability::logging::LOG_LEVELS;
use crate::plugins::registry::{self, Role};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no inputs configured")]
    NoInputs,

    #[error("no outputs configured")]
    NoOutputs,

    #[error("unknown {role} kind '{kind}'")]
    UnknownPlugin { role: Role, kind: String },

    #[error("{role} '{kind}' requires an address")]
    MissingAddress { role: Role, kind: String },

    #[error("invalid replay target '{address}': {reason}")]
    InvalidTarget { address: String, reason: String },

    #[error("http_output.{0} must be greater than zero")]
    ZeroCapacity(&'static str),

    #[error("invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("invalid metrics address '{0}'")]
    InvalidMetricsAddress(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ReplayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.inputs.is_empty() {
        errors.push(ValidationError::NoInputs);
    }
    if config.outputs.is_empty() {
        errors.push(ValidationError::NoOutputs);
    }

    let plugins = config
        .inputs
        .iter()
        .map(|p| (Role::Input, p))
        .chain(config.outputs.iter().map(|p| (Role::Output, p)));

    for (role, plugin) in plugins {
        let Some(factory) = registry::find(role, &plugin.kind) else {
            errors.push(ValidationError::UnknownPlugin {
                role,
                kind: plugin.kind.clone(),
            });
            continue;
        };

        if factory.needs_address && plugin.address.trim().is_empty() {
            errors.push(ValidationError::MissingAddress {
                role,
                kind: plugin.kind.clone(),
            });
        } else if factory.kind == "http" {
            if let Err(e) = Target::parse(&plugin.address) {
                errors.push(ValidationError::InvalidTarget {
                    address: plugin.address.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if config.http_output.queue_capacity == 0 {
        errors.push(ValidationError::ZeroCapacity("queue_capacity"));
    }
    if config.http_output.response_capacity == 0 {
        errors.push(ValidationError::ZeroCapacity("response_capacity"));
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::PluginConfig;

    fn minimal() -> ReplayConfig {
        let mut config = ReplayConfig::default();
        config.inputs.push(PluginConfig::new("dummy", ""));
        config.outputs.push(PluginConfig::new("http", "127.0.0.1:8080"));
        config
    }

    #[test]
    fn minimal_config_is_valid() {
        assert_eq!(validate_config(&minimal()), Ok(()));
    }

    #[test]
    fn empty_config_lacks_plugins() {
        let errors = validate_config(&ReplayConfig::default()).unwrap_err();
        assert!(errors.contains(&ValidationError::NoInputs));
        assert!(errors.contains(&ValidationError::NoOutputs));
    }

    #[test]
    fn collects_every_problem() {
        let mut config = minimal();
        config.outputs.push(PluginConfig::new("http", ""));
        config.outputs.push(PluginConfig::new("kafka", "broker:9092"));
        config.http_output.queue_capacity = 0;
        config.observability.log_level = "loud".into();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ValidationError::MissingAddress {
            role: Role::Output,
            kind: "http".into()
        }));
        assert!(errors.contains(&ValidationError::UnknownPlugin {
            role: Role::Output,
            kind: "kafka".into()
        }));
        assert!(errors.contains(&ValidationError::ZeroCapacity("queue_capacity")));
    }

    #[test]
    fn rejects_bad_target() {
        let mut config = minimal();
        config.outputs[0].address = "ftp://files".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidTarget { .. }));
    }
}
