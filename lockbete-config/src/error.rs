//! Configuration loading and validation errors.

use std::path::PathBuf;

use thiserror::Error;
use validator::ValidationErrors;

/// Everything that can go wrong between a config source and a validated
/// `LockbeteConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    /// One line per failed field, so a bad deployment config names every
    /// offending key at once.
    #[error("invalid config:\n{}", render_field_errors(.0))]
    Validation(#[source] ValidationErrors),

    #[error("could not parse config: {0}")]
    Parsing(#[from] figment::Error),
}

fn render_field_errors(errors: &ValidationErrors) -> String {
    let mut lines = Vec::new();
    for (field, errors) in errors.field_errors() {
        for error in errors.iter() {
            let reason = error
                .message
                .as_deref()
                .map(str::to_string)
                .unwrap_or_else(|| error.code.to_string());
            lines.push(format!("  {field}: {reason}"));
        }
    }
    lines.join("\n")
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServerConfig;
    use validator::Validate;

    #[test]
    fn validation_errors_name_field_and_reason() {
        let config = ServerConfig {
            liveness_timeout_secs: 0,
            ..ServerConfig::default()
        };
        let err = ConfigError::from(config.validate().unwrap_err());
        let text = err.to_string();
        assert!(text.contains("liveness_timeout_secs"));
        assert!(text.contains("range"));
    }
}
