//! Directory discovery of forward/down migration file pairs.

use crate::version::parse_version;
use erm_core::ErmError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: String,
    pub forward_path: PathBuf,
    pub down_path: Option<PathBuf>,
}

impl Migration {
    pub fn read_forward_sql(&self) -> Result<String, ErmError> {
        std::fs::read_to_string(&self.forward_path).map_err(ErmError::Io)
    }

    pub fn read_down_sql(&self) -> Result<String, ErmError> {
        let path = self.down_path.as_ref().ok_or_else(|| {
            ErmError::MissingDownFile { version: self.version.clone() }
        })?;
        std::fs::read_to_string(path).map_err(ErmError::Io)
    }
}

/// Discover migrations under `dir`, ordered ascending by version.
/// A duplicate forward version is an error.
pub fn discover(dir: &Path) -> Result<Vec<Migration>, ErmError> {
    let mut forwards: HashMap<String, PathBuf> = HashMap::new();
    let mut downs: HashMap<String, PathBuf> = HashMap::new();

    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    for path in entries {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        let (stem, is_down) = if let Some(stripped) = file_name.strip_suffix(".down.sql") {
            (stripped, true)
        } else if let Some(stripped) = file_name.strip_suffix("_down.sql") {
            (stripped, true)
        } else if let Some(stripped) = file_name.strip_suffix("-down.sql") {
            (stripped, true)
        } else if let Some(stripped) = file_name.strip_suffix(".rollback.sql") {
            (stripped, true)
        } else if let Some(stripped) = file_name.strip_suffix(".sql") {
            (stripped, false)
        } else {
            continue;
        };

        let version = parse_version(stem)?;

        if is_down {
            downs.insert(version, path);
        } else if let Some(existing) = forwards.insert(version.clone(), path) {
            return Err(ErmError::DuplicateVersion { version: format!("{version} (already found at {})", existing.display()) });
        }
    }

    let mut migrations: Vec<Migration> = forwards
        .into_iter()
        .map(|(version, forward_path)| {
            let down_path = downs.get(&version).cloned();
            Migration { version, forward_path, down_path }
        })
        .collect();
    migrations.sort_by(|a, b| a.version.cmp(&b.version));

    Ok(migrations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn touch(dir: &Path, name: &str) {
        std::fs::File::create(dir.join(name)).unwrap().write_all(b"select 1;").unwrap();
    }

    #[test]
    fn discovers_and_orders_migrations_by_version() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0002_add_posts.sql");
        touch(dir.path(), "0001_create_users.sql");
        touch(dir.path(), "0001_create_users.down.sql");

        let migrations = discover(dir.path()).unwrap();
        assert_eq!(migrations.len(), 2);
        assert_eq!(migrations[0].version, "0001");
        assert!(migrations[0].down_path.is_some());
        assert_eq!(migrations[1].version, "0002");
        assert!(migrations[1].down_path.is_none());
    }

    #[test]
    fn rejects_duplicate_forward_versions() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "0001_create_users.sql");
        touch(dir.path(), "0001-create-orgs.sql");
        assert!(discover(dir.path()).is_err());
    }

    #[test]
    fn recognizes_every_down_file_naming_convention() {
        for down_suffix in ["_down.sql", "-down.sql", ".rollback.sql"] {
            let dir = tempfile::tempdir().unwrap();
            touch(dir.path(), "0001_create_users.sql");
            touch(dir.path(), &format!("0001_create_users{down_suffix}"));

            let migrations = discover(dir.path()).unwrap();
            assert_eq!(migrations.len(), 1, "suffix {down_suffix} produced a spurious duplicate");
            assert!(migrations[0].down_path.is_some(), "suffix {down_suffix} wasn't recognized as a down file");
        }
    }
}
