//! Shared fixtures: an in-process runtime with a container service loader and
//! a postgres resource loader, operator keys and definition trees.

#![allow(dead_code)]

use async_trait::async_trait;
use infralink::runtime::{
    DependencyVisitor, Loaded, Migrate, ProviderError, ProviderResult, Resource, ResourceLoader,
    Runtime, ServiceLoader, Visit,
};
use infralink::secrets::{KeyOptions, PrivateKeyFile, SecretBackend, SecretError};
use infralink::types::{
    DependencyBinding, DeploymentContext, EnvContext, EnvVars, Privileges, ResourceDefinition,
    ResourceIdentity, Secret, SecretRef, SecretType, Service,
};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::any::Any;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const TEST_KEY_OPTIONS: KeyOptions = KeyOptions {
    bits: 1024,
    kdf_iterations: 1_000,
};

pub const PASSPHRASE: &str = "correct horse battery staple";

pub static ALICE: Lazy<PrivateKeyFile> = Lazy::new(|| operator_key("Alice Doe <alice@doe.com>"));
pub static BOB: Lazy<PrivateKeyFile> = Lazy::new(|| operator_key("Bob Doe <bob@doe.com>"));
pub static MALLORY: Lazy<PrivateKeyFile> =
    Lazy::new(|| operator_key("Mallory <mallory@example.com>"));

fn operator_key(identity: &str) -> PrivateKeyFile {
    PrivateKeyFile::generate(identity, PASSPHRASE, TEST_KEY_OPTIONS)
        .unwrap()
        .0
}

/// Ordered record of what the runtime was asked to do.
pub type Events = Arc<Mutex<Vec<String>>>;

pub struct FakeRuntime {
    name: String,
    service_runtime: String,
    events: Events,
    migrations: Arc<AtomicUsize>,
    fail_on_configure: Option<String>,
    fail_on_migrate: Option<String>,
}

impl FakeRuntime {
    pub fn new(name: &str, service_runtime: &str) -> Self {
        Self {
            name: name.to_string(),
            service_runtime: service_runtime.to_string(),
            events: Events::default(),
            migrations: Arc::new(AtomicUsize::new(0)),
            fail_on_configure: None,
            fail_on_migrate: None,
        }
    }

    /// Databases with this name fail in `configure`.
    pub fn failing_on_configure(mut self, database: &str) -> Self {
        self.fail_on_configure = Some(database.to_string());
        self
    }

    /// Databases with this name fail in `migrate`.
    pub fn failing_on_migrate(mut self, database: &str) -> Self {
        self.fail_on_migrate = Some(database.to_string());
        self
    }

    pub fn events(&self) -> Events {
        self.events.clone()
    }

    pub fn migrations(&self) -> Arc<AtomicUsize> {
        self.migrations.clone()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl Runtime for FakeRuntime {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init_environment(&self, env: &str, context: &str, region: &str) -> ProviderResult<()> {
        self.record(format!("init_environment {env} {context} {region}"));
        Ok(())
    }

    fn init(&self, ctx: &EnvContext) -> ProviderResult<()> {
        self.record(format!("init {}", ctx.env_name));
        Ok(())
    }

    fn init_secrets(&self, _ctx: &EnvContext, secrets: &[Secret]) -> ProviderResult<()> {
        let mut names: Vec<_> = secrets.iter().map(|s| s.name.as_str()).collect();
        names.sort();
        self.record(format!("init_secrets {}", names.join(",")));
        Ok(())
    }

    fn resource_loaders(&self) -> Vec<Arc<dyn ResourceLoader>> {
        vec![
            Arc::new(PostgresLoader {
                migrations: self.migrations.clone(),
                fail_on_configure: self.fail_on_configure.clone(),
                fail_on_migrate: self.fail_on_migrate.clone(),
            }),
            Arc::new(CacheLoader),
        ]
    }

    fn service_loaders(&self) -> Vec<Arc<dyn ServiceLoader>> {
        vec![Arc::new(ContainerLoader {
            name: self.service_runtime.clone(),
        })]
    }

    async fn plan(&self) -> ProviderResult<()> {
        self.record("plan".to_string());
        Ok(())
    }

    async fn apply(&self) -> ProviderResult<()> {
        self.record("apply".to_string());
        Ok(())
    }

    async fn delete(&self) -> ProviderResult<()> {
        self.record("delete".to_string());
        Ok(())
    }

    async fn export(&self) -> ProviderResult<()> {
        self.record("export".to_string());
        Ok(())
    }
}

/// A service resource; bindings inject refs and secrets into its env.
#[derive(Debug)]
pub struct ContainerService {
    pub identity: ResourceIdentity,
    pub env: EnvVars,
    pub version: Option<String>,
    pub runtime_config: Option<serde_yaml::Value>,
    /// Snapshot of `env` taken by `configure`.
    pub configured_env: Option<EnvVars>,
}

impl Resource for ContainerService {
    fn identity(&self) -> ResourceIdentity {
        self.identity.clone()
    }

    fn configure(&mut self) -> ProviderResult<()> {
        self.configured_env = Some(self.env.clone());
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct ContainerLoader {
    name: String,
}

impl ServiceLoader for ContainerLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(
        &self,
        ctx: &EnvContext,
        service: &Service,
        deployment: &DeploymentContext,
    ) -> ProviderResult<Box<dyn Resource>> {
        Ok(Box::new(ContainerService {
            identity: service.identity(),
            env: deployment.env.clone(),
            version: ctx.version(&service.name).ok(),
            runtime_config: deployment.resources.clone(),
            configured_env: None,
        }))
    }
}

#[derive(Debug)]
pub struct PostgresDatabase {
    pub name: String,
    pub tier: Option<String>,
    pub configured: bool,
    fail_on_configure: bool,
    fail_on_migrate: bool,
    migrations: Arc<AtomicUsize>,
}

impl PostgresDatabase {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tier: None,
            configured: false,
            fail_on_configure: false,
            fail_on_migrate: false,
            migrations: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Resource for PostgresDatabase {
    fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new("postgres", &self.name)
    }

    fn configure(&mut self) -> ProviderResult<()> {
        if self.fail_on_configure {
            return Err(ProviderError::Constraint {
                resource: self.name.clone(),
                reason: "refusing to configure".to_string(),
            });
        }
        self.configured = true;
        Ok(())
    }

    fn as_migrate(&mut self) -> Option<&mut dyn Migrate> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[async_trait]
impl Migrate for PostgresDatabase {
    async fn migrate(&mut self) -> ProviderResult<()> {
        if self.fail_on_migrate {
            return Err(ProviderError::Constraint {
                resource: self.name.clone(),
                reason: "schema migration failed".to_string(),
            });
        }
        self.migrations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Deserialize)]
struct NamedDependency {
    name: String,
}

#[derive(Deserialize)]
struct PostgresEnvironment {
    tier: Option<String>,
}

struct PostgresLoader {
    migrations: Arc<AtomicUsize>,
    fail_on_configure: Option<String>,
    fail_on_migrate: Option<String>,
}

impl ResourceLoader for PostgresLoader {
    fn name(&self) -> &str {
        "postgres"
    }

    fn load(&self, definition: &ResourceDefinition) -> ProviderResult<Loaded> {
        let dependency: NamedDependency = definition.service_config()?;
        let environment: Option<PostgresEnvironment> = definition.resource_config()?;

        let database = PostgresDatabase {
            tier: environment.and_then(|e| e.tier),
            configured: false,
            fail_on_configure: self.fail_on_configure.as_deref() == Some(dependency.name.as_str()),
            fail_on_migrate: self.fail_on_migrate.as_deref() == Some(dependency.name.as_str()),
            migrations: self.migrations.clone(),
            name: dependency.name,
        };
        let identity = database.identity();
        let binding = DependencyBinding::new(
            definition.depended_on_by.clone(),
            Privileges::ReadWrite,
            identity.clone(),
        )
        .with_visitor(Arc::new(PostgresVisitor {
            identity: identity.clone(),
        }))
        .with_secret(SecretRef::new("PASSWORD", SecretType::RandomString))
        .with_secret(SecretRef::new("USER", SecretType::RandomString));

        Ok(Loaded::new().resource(database).binding(binding))
    }
}

/// Injects host and credentials into container services; nothing else.
pub struct PostgresVisitor {
    pub identity: ResourceIdentity,
}

impl DependencyVisitor for PostgresVisitor {
    fn configure_resource(&self, resource: &mut dyn Resource) -> ProviderResult<Visit> {
        let Some(service) = resource.downcast_mut::<ContainerService>() else {
            return Ok(Visit::NotApplicable);
        };
        let prefix = format!("DB_{}", self.identity.id.to_uppercase().replace('-', "_"));
        service
            .env
            .insert_ref(format!("{prefix}_HOST"), format!("{}.host", self.identity));
        for field in ["PASSWORD", "USER"] {
            service
                .env
                .insert_secret(format!("{prefix}_{field}"), format!("{}_{field}", self.identity));
        }
        Ok(Visit::Applied)
    }
}

/// A cache instance; its loader yields no bindings.
#[derive(Debug)]
pub struct CacheInstance {
    pub name: String,
    pub configured: bool,
}

impl Resource for CacheInstance {
    fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new("cache", &self.name)
    }

    fn configure(&mut self) -> ProviderResult<()> {
        self.configured = true;
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct CacheLoader;

impl ResourceLoader for CacheLoader {
    fn name(&self) -> &str {
        "cache"
    }

    fn load(&self, definition: &ResourceDefinition) -> ProviderResult<Loaded> {
        let dependency: NamedDependency = definition.service_config()?;
        Ok(Loaded::new().resource(CacheInstance {
            name: dependency.name,
            configured: false,
        }))
    }
}

/// Secrets kept in memory, counting decrypt-all calls.
#[derive(Debug, Default)]
pub struct MemorySecrets {
    pub secrets: Vec<Secret>,
    pub written: Vec<String>,
    pub decrypt_calls: usize,
}

impl MemorySecrets {
    pub fn with(names: &[&str]) -> Self {
        Self {
            secrets: names.iter().map(|n| Secret::new(*n, "existing-value")).collect(),
            ..Self::default()
        }
    }
}

impl SecretBackend for MemorySecrets {
    fn decrypt_all(&mut self, _env: &str) -> Result<Vec<Secret>, SecretError> {
        self.decrypt_calls += 1;
        Ok(self.secrets.clone())
    }

    fn write(&mut self, _env: &str, secret: &Secret) -> Result<(), SecretError> {
        self.written.push(secret.name.clone());
        self.secrets.push(secret.clone());
        Ok(())
    }
}

pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// `prod` with a postgres tier and a container config, plus `api` and
/// `worker` both depending on the database `my-pg-db`.
pub fn write_shared_database_tree(root: &Path) {
    write_file(
        root,
        "environments/prod/resources.yaml",
        r#"context: acme-prod
region: europe-west6
state_store: infralink-state-acme-prod-abc123
resources:
  postgres:
    tier: db-f1-micro
  container:
    min_instances: 1
  dns:
    zone: acme.example
env:
  vars:
    LOG_LEVEL: info
"#,
    );
    write_file(
        root,
        "services/api.yaml",
        r#"name: api
runtime: container
spec:
  image: registry.example/api
depends_on:
  postgres:
    name: my-pg-db
env:
  vars:
    LOG_LEVEL: debug
    PORT: "8080"
"#,
    );
    write_file(
        root,
        "services/worker.yaml",
        r#"name: worker
runtime: container
spec:
  image: registry.example/worker
depends_on:
  postgres:
    name: my-pg-db
env:
  vars:
    QUEUE: jobs
"#,
    );
}

/// `prod` plus `api` on database `alpha` and `worker` on database `beta`.
pub fn write_two_database_tree(root: &Path) {
    write_file(
        root,
        "environments/prod/resources.yaml",
        "context: acme-prod\nregion: europe-west6\nstate_store: infralink-state-acme-prod-abc123\n",
    );
    for (service, database) in [("api", "alpha"), ("worker", "beta")] {
        write_file(
            root,
            &format!("services/{service}.yaml"),
            &format!(
                "name: {service}\nruntime: container\nspec:\n  image: app\ndepends_on:\n  postgres:\n    name: {database}\n"
            ),
        );
    }
}
