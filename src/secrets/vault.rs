use crate::secrets::error::Result;
use crate::secrets::session::KeySession;
use crate::secrets::store::SecretStore;
use crate::types::Secret;

/// Secret persistence as seen by the resolution engine.
pub trait SecretBackend {
    /// Every secret of `env`, decrypted.
    fn decrypt_all(&mut self, env: &str) -> Result<Vec<Secret>>;

    /// Persist `secret` for the current recipients of `env`.
    fn write(&mut self, env: &str, secret: &Secret) -> Result<()>;
}

/// Encrypted files on disk, opened with the operator's session key.
pub struct SecretVault<'a> {
    store: SecretStore,
    session: &'a mut KeySession,
}

impl<'a> SecretVault<'a> {
    pub fn new(store: SecretStore, session: &'a mut KeySession) -> Self {
        Self { store, session }
    }

    pub fn store(&self) -> &SecretStore {
        &self.store
    }

    /// Re-encrypt every secret of `env` for its current recipients.
    pub fn refresh(&mut self, env: &str) -> Result<usize> {
        let key = self.session.unlock()?;
        self.store.refresh(env, key)
    }
}

impl SecretBackend for SecretVault<'_> {
    fn decrypt_all(&mut self, env: &str) -> Result<Vec<Secret>> {
        if self.store.list_secret_names(env)?.is_empty() {
            return Ok(Vec::new());
        }
        let key = self.session.unlock()?;
        self.store.read_all(env, key)
    }

    fn write(&mut self, env: &str, secret: &Secret) -> Result<()> {
        self.store.write_secret(env, &secret.name, &secret.value)
    }
}
