//! `erm.toml` loading (spec §6 "Config"), matching the teacher's
//! `cli/src/config.rs` convention: an explicit `--config` path, else a
//! fixed default file name in the current directory.

use crate::error::CliError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "erm.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub dir: PathBuf,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        SchemaConfig { dir: PathBuf::from("schema") }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationsConfig {
    pub dir: PathBuf,
    pub snapshot_path: PathBuf,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        MigrationsConfig {
            dir: PathBuf::from("migrations"),
            snapshot_path: PathBuf::from("migrations/schema.snapshot.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    pub orm_out: PathBuf,
    pub graphql_out: PathBuf,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        CodegenConfig {
            orm_out: PathBuf::from("generated/orm"),
            graphql_out: PathBuf::from("generated/graphql"),
        }
    }
}

/// The resolved config struct spec §6 says the core consumes — `erm-cli`'s
/// job is only to deserialize `erm.toml` into this shape and hand the
/// `database`/`observability`/`extensions` sections straight to
/// `erm-runtime` untranslated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema: SchemaConfig,
    pub migrations: MigrationsConfig,
    pub codegen: CodegenConfig,
    pub database: erm_runtime::DatabaseConfig,
    pub observability: erm_runtime::ObservabilityConfig,
    pub extensions: erm_runtime::ExtensionsConfig,
}

pub fn load(explicit_path: Option<&Path>) -> Result<Config, CliError> {
    let path = match explicit_path {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    };

    if !path.exists() {
        if explicit_path.is_some() {
            return Err(CliError::Config {
                path: path.display().to_string(),
                message: "file not found".to_string(),
            });
        }
        return Ok(Config::default());
    }

    let text = std::fs::read_to_string(&path)?;
    toml::from_str(&text).map_err(|e| CliError::Config {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_default_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let config = load(None);
        std::env::set_current_dir(original).unwrap();
        let config = config.unwrap();
        assert_eq!(config.schema.dir, PathBuf::from("schema"));
    }

    #[test]
    fn explicit_missing_path_is_a_config_error() {
        let err = load(Some(Path::new("/nonexistent/erm.toml"))).unwrap_err();
        assert!(matches!(err, CliError::Config { .. }));
    }

    #[test]
    fn parses_database_url_and_replica_list() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("erm.toml");
        std::fs::write(
            &config_path,
            r#"
            [database]
            url = "postgres://localhost/erm"

            [[database.replicas]]
            name = "east"
            url = "postgres://east/erm"
            "#,
        )
        .unwrap();

        let config = load(Some(&config_path)).unwrap();
        assert_eq!(config.database.url, "postgres://localhost/erm");
        assert_eq!(config.database.replicas.len(), 1);
        assert_eq!(config.database.replicas[0].name, "east");
    }
}
