use crate::types::env_vars::EnvVars;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// A deployment target: one cloud context and region with its shared resources.
#[derive(Clone, Serialize, Deserialize)]
pub struct Environment {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_base: Option<String>,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub state_store: String,
    /// Resource type to environment-level configuration for that type.
    #[serde(default)]
    pub resources: BTreeMap<String, serde_yaml::Value>,
    #[serde(default)]
    pub env: EnvVars,
    #[serde(skip)]
    pub resolver: Option<Arc<dyn VersionResolver>>,
}

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: String::new(),
            repo_base: None,
            region: String::new(),
            state_store: String::new(),
            resources: BTreeMap::new(),
            env: EnvVars::default(),
            resolver: None,
        }
    }

    /// Snapshot handed to runtimes and service loaders.
    pub fn context(&self) -> EnvContext {
        EnvContext {
            context: self.context.clone(),
            repo_base: self.repo_base.clone(),
            region: self.region.clone(),
            state_store: self.state_store.clone(),
            env_name: self.name.clone(),
            resolver: self.resolver.clone(),
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.name)
            .field("context", &self.context)
            .field("region", &self.region)
            .field("state_store", &self.state_store)
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("env", &self.env)
            .finish()
    }
}

/// Read-only view of the selected environment.
#[derive(Clone)]
pub struct EnvContext {
    pub context: String,
    pub repo_base: Option<String>,
    pub region: String,
    pub state_store: String,
    pub env_name: String,
    resolver: Option<Arc<dyn VersionResolver>>,
}

impl EnvContext {
    /// Version of `service` to deploy in this run.
    pub fn version(&self, service: &str) -> Result<String, VersionError> {
        match &self.resolver {
            Some(resolver) => resolver.version(service),
            None => Err(VersionError::NoResolver {
                env: self.env_name.clone(),
            }),
        }
    }
}

impl fmt::Debug for EnvContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvContext")
            .field("context", &self.context)
            .field("region", &self.region)
            .field("state_store", &self.state_store)
            .field("env_name", &self.env_name)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("No version resolver configured for environment {env}")]
    NoResolver { env: String },

    #[error("No version recorded for service {service} in {path}")]
    MissingVersion { service: String, path: String },

    #[error("Failed to read versions file {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Selects the target environment and answers which version of each service to deploy.
pub trait VersionResolver: Send + Sync {
    fn env(&self) -> &str;
    fn version(&self, service: &str) -> Result<String, VersionError>;
}

/// Every service is deployed at the same, explicitly given version.
#[derive(Debug, Clone)]
pub struct FixedVersion {
    pub env: String,
    pub version: String,
}

impl FixedVersion {
    pub fn new(env: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            version: version.into(),
        }
    }
}

impl VersionResolver for FixedVersion {
    fn env(&self) -> &str {
        &self.env
    }

    fn version(&self, _service: &str) -> Result<String, VersionError> {
        Ok(self.version.clone())
    }
}

/// Versions come from `environments/<env>/versions.yaml`.
#[derive(Debug, Clone)]
pub struct FileVersions {
    pub env: String,
    pub root: PathBuf,
}

impl FileVersions {
    pub fn new(env: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            env: env.into(),
            root: root.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.root
            .join("environments")
            .join(&self.env)
            .join("versions.yaml")
    }
}

impl VersionResolver for FileVersions {
    fn env(&self) -> &str {
        &self.env
    }

    fn version(&self, service: &str) -> Result<String, VersionError> {
        let path = self.path();
        let unreadable = |reason: String| VersionError::Unreadable {
            path: path.display().to_string(),
            reason,
        };
        let content = std::fs::read_to_string(&path).map_err(|e| unreadable(e.to_string()))?;
        let versions: BTreeMap<String, String> =
            serde_yaml::from_str(&content).map_err(|e| unreadable(e.to_string()))?;

        versions
            .get(service)
            .cloned()
            .ok_or_else(|| VersionError::MissingVersion {
                service: service.to_string(),
                path: path.display().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fixed_version_applies_to_every_service() {
        let resolver = FixedVersion::new("prod", "v1");
        assert_eq!(resolver.env(), "prod");
        assert_eq!(resolver.version("api").unwrap(), "v1");
        assert_eq!(resolver.version("worker").unwrap(), "v1");
    }

    #[test]
    fn test_file_versions_reads_per_service_entries() {
        let dir = TempDir::new().unwrap();
        let env_dir = dir.path().join("environments").join("prod");
        std::fs::create_dir_all(&env_dir).unwrap();
        std::fs::write(env_dir.join("versions.yaml"), "api: v7\nworker: v2\n").unwrap();

        let resolver = FileVersions::new("prod", dir.path());
        assert_eq!(resolver.version("api").unwrap(), "v7");
        assert!(matches!(
            resolver.version("billing"),
            Err(VersionError::MissingVersion { .. })
        ));
    }

    #[test]
    fn test_context_without_resolver_fails() {
        let env = Environment::new("prod");
        assert!(matches!(
            env.context().version("api"),
            Err(VersionError::NoResolver { .. })
        ));
    }
}
