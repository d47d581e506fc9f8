//! Reads environment and service definitions from a definitions root

use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::definitions::error::{DefinitionError, Result};
use crate::types::{Environment, Service};

pub const RESOURCES_FILE: &str = "resources.yaml";

const ENVIRONMENT_REQUIRED: &[&str] = &["context", "region", "state_store"];
const SERVICE_REQUIRED: &[&str] = &["name", "runtime", "spec"];

/// All definitions of one root, as read at the start of a run.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    pub environments: Vec<Environment>,
    pub services: Vec<Service>,
}

/// `<root>/environments/<env>/resources.yaml` and `<root>/services/**/*.y{a,}ml`
#[derive(Debug, Clone)]
pub struct DefinitionReader {
    root: PathBuf,
}

impl DefinitionReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn environments_dir(&self) -> PathBuf {
        self.root.join("environments")
    }

    pub fn services_dir(&self) -> PathBuf {
        self.root.join("services")
    }

    pub fn resources_file(&self, env: &str) -> PathBuf {
        self.environments_dir().join(env).join(RESOURCES_FILE)
    }

    pub fn read(&self) -> Result<Definitions> {
        if !self.root.is_dir() {
            return Err(DefinitionError::RootNotFound {
                path: self.root.display().to_string(),
            });
        }
        Ok(Definitions {
            environments: self.read_environments()?,
            services: self.read_services()?,
        })
    }

    /// One environment per directory under `environments/`, named after the directory.
    pub fn read_environments(&self) -> Result<Vec<Environment>> {
        let dir = self.environments_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&dir).map_err(|e| io_error(&dir, e))?;
        let mut env_dirs = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error(&dir, e))?.path();
            if path.is_dir() {
                env_dirs.push(path);
            }
        }
        env_dirs.sort();

        let mut environments = Vec::new();
        for env_dir in env_dirs {
            let file = env_dir.join(RESOURCES_FILE);
            if !file.is_file() {
                warn!("Skipping {} without {}", env_dir.display(), RESOURCES_FILE);
                continue;
            }
            let mut environment: Environment = read_definition(&file, ENVIRONMENT_REQUIRED)?;
            environment.name = env_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            debug!("Read environment {} from {}", environment.name, file.display());
            environments.push(environment);
        }
        Ok(environments)
    }

    /// Every YAML file under `services/`, in path order. Names must be unique.
    pub fn read_services(&self) -> Result<Vec<Service>> {
        let dir = self.services_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut services = Vec::new();
        let mut names = BTreeSet::new();
        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry.map_err(|e| DefinitionError::Io {
                path: dir.display().to_string(),
                source: e.into(),
            })?;
            let path = entry.path();
            if !entry.file_type().is_file() || !is_yaml(path) {
                continue;
            }
            let service: Service = read_definition(path, SERVICE_REQUIRED)?;
            if !names.insert(service.name.clone()) {
                return Err(DefinitionError::Duplicate {
                    kind: "service".to_string(),
                    name: service.name,
                    file: path.display().to_string(),
                });
            }
            debug!("Read service {} from {}", service.name, path.display());
            services.push(service);
        }
        Ok(services)
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

fn read_definition<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<T> {
    let file = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| DefinitionError::Invalid {
            file: file.clone(),
            reason: e.to_string(),
        })?;

    for field in required {
        let present = match value.get(*field) {
            None | Some(serde_yaml::Value::Null) => false,
            Some(serde_yaml::Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(DefinitionError::MissingField {
                file,
                field: field.to_string(),
            });
        }
    }

    serde_yaml::from_value(value).map_err(|e| DefinitionError::Invalid {
        file,
        reason: e.to_string(),
    })
}

fn io_error(path: &Path, source: std::io::Error) -> DefinitionError {
    DefinitionError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_environment_named_after_directory() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "environments/prod/resources.yaml",
            "context: acme-prod\nregion: europe-west6\nstate_store: bucket\nresources:\n  postgres:\n    tier: small\nenv:\n  vars:\n    LOG: info\n",
        );

        let envs = DefinitionReader::new(dir.path()).read_environments().unwrap();
        assert_eq!(envs.len(), 1);
        assert_eq!(envs[0].name, "prod");
        assert_eq!(envs[0].region, "europe-west6");
        assert!(envs[0].resources.contains_key("postgres"));
        assert_eq!(envs[0].env.var("LOG"), Some("info"));
    }

    #[test]
    fn test_missing_required_field() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "environments/prod/resources.yaml",
            "context: acme-prod\nstate_store: bucket\n",
        );

        let err = DefinitionReader::new(dir.path())
            .read_environments()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::MissingField { ref field, .. } if field == "region"));
    }

    #[test]
    fn test_services_are_read_recursively_and_must_be_unique() {
        let dir = TempDir::new().unwrap();
        let service = |name: &str| format!("name: {name}\nruntime: container\nspec:\n  image: app\n");
        write(dir.path(), "services/a.yaml", &service("api"));
        write(dir.path(), "services/nested/b.yml", &service("worker"));
        write(dir.path(), "services/README.md", "not a definition");

        let reader = DefinitionReader::new(dir.path());
        let names: Vec<_> = reader
            .read_services()
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["api", "worker"]);

        write(dir.path(), "services/nested/c.yaml", &service("api"));
        assert!(matches!(
            reader.read_services(),
            Err(DefinitionError::Duplicate { .. })
        ));
    }

    #[test]
    fn test_missing_root() {
        let reader = DefinitionReader::new("/definitely/not/here");
        assert!(matches!(
            reader.read(),
            Err(DefinitionError::RootNotFound { .. })
        ));
    }
}
