//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Schema { name: String, source: std::io::Error },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Schema { name, source } => {
                write!(f, "Failed to read schema '{}': {}", name, source)
            }
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
///
/// Schema files are read relative to the config file's directory and
/// inlined, so the returned config only carries `source`s.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: ProxyConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    inline_schemas(&mut config, base)?;

    Ok(config)
}

fn inline_schemas(config: &mut ProxyConfig, base: &Path) -> Result<(), ConfigError> {
    let mut empty = Vec::new();
    for schema in &mut config.schemas {
        let Some(file) = schema.path.take() else { continue };
        let source = fs::read_to_string(base.join(&file)).map_err(|source| ConfigError::Schema {
            name: schema.name.clone(),
            source,
        })?;
        if source.trim().is_empty() {
            empty.push(ValidationError::EmptySchema(schema.name.clone()));
        }
        tracing::debug!(schema = %schema.name, file = ?file, bytes = source.len(), "Schema loaded");
        schema.source = Some(source);
    }

    if empty.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Validation(empty))
    }
}
