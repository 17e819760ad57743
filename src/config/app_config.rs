use std::env;
use std::path::PathBuf;

use thiserror::Error;

use super::model::CheckerConfig;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub struct AppConfig {
    pub checker: CheckerConfig,
    pub max_label_width: usize,
}

/// Load the application configuration from the YAML file named by the
/// `CONFIG_FILE` environment variable, `config.yml` when unset.
pub fn load_config() -> Result<AppConfig, LoadError> {
    let path = PathBuf::from(env::var("CONFIG_FILE").unwrap_or_else(|_| "config.yml".to_string()));
    log::info!("Using configuration file: {}", path.display());

    let config_str = std::fs::read_to_string(&path).map_err(|source| LoadError::Read {
        path: path.clone(),
        source,
    })?;

    parse_config(&config_str).map_err(|source| LoadError::Yaml { path, source })
}

pub fn parse_config(config_str: &str) -> Result<AppConfig, serde_yaml::Error> {
    let checker: CheckerConfig = serde_yaml::from_str(config_str)?;

    let max_label_width = checker
        .targets
        .iter()
        .map(|target| target.label().len())
        .max()
        .unwrap_or(10);

    Ok(AppConfig {
        checker,
        max_label_width,
    })
}
