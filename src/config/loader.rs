//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ReplayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ReplayConfig, ConfigError> {
    let config: ReplayConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ReplayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_file() {
        let config = parse_config(
            r#"
            [emitter]
            split_output = true

            [[inputs]]
            kind = "dummy"

            [[outputs]]
            kind = "http"
            address = "http://staging:8080"

            [[outputs]]
            kind = "stdout"

            [http_output]
            workers = 4
            redirect_limit = 2
            track_responses = true
            timeout_ms = 250
            "#,
        )
        .unwrap();

        assert!(config.emitter.split_output);
        assert_eq!(config.inputs.len(), 1);
        assert_eq!(config.outputs[0].address, "http://staging:8080");
        assert_eq!(config.http_output.workers, 4);
        assert_eq!(config.http_output.queue_capacity, 1000);
        assert_eq!(config.http_output.client_config().follow_redirects, 2);
        assert_eq!(config.http_output.client_config().timeout.as_millis(), 250);
    }

    #[test]
    fn reports_validation_errors() {
        let err = parse_config(
            r#"
            [[inputs]]
            kind = "carrier-pigeon"
            "#,
        )
        .unwrap_err();

        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn reports_parse_errors() {
        assert!(matches!(parse_config("[emitter"), Err(ConfigError::Parse(_))));
    }
}
