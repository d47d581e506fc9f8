//! On-disk secret files and registered recipients of each environment

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::fs::write_private;
use crate::secrets::envelope;
use crate::secrets::error::{Result, SecretError};
use crate::secrets::keys::{identity_file_name, OperatorKey, RecipientKey};
use crate::types::Secret;

const SECRET_EXTENSION: &str = "asc";

/// `<root>/environments/<env>/{secrets,pubkeys}/*.asc`
#[derive(Debug, Clone)]
pub struct SecretStore {
    root: PathBuf,
}

impl SecretStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn env_dir(&self, env: &str) -> PathBuf {
        self.root.join("environments").join(env)
    }

    pub fn secrets_dir(&self, env: &str) -> PathBuf {
        self.env_dir(env).join("secrets")
    }

    pub fn pubkeys_dir(&self, env: &str) -> PathBuf {
        self.env_dir(env).join("pubkeys")
    }

    pub fn secret_path(&self, env: &str, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self
            .secrets_dir(env)
            .join(format!("{name}.{SECRET_EXTENSION}")))
    }

    /// Create the secrets directory and register the operator as a recipient.
    pub fn init_environment(&self, env: &str, key: &OperatorKey) -> Result<PathBuf> {
        let secrets = self.secrets_dir(env);
        std::fs::create_dir_all(&secrets).map_err(|e| SecretError::io(&secrets, e))?;
        let path = self.register_recipient(env, key.recipient())?;
        info!("Registered {} for environment {}", key.identity(), env);
        Ok(path)
    }

    /// Write `recipient` under `pubkeys/`, replacing a previous key of the same identity.
    pub fn register_recipient(&self, env: &str, recipient: &RecipientKey) -> Result<PathBuf> {
        let path = self.pubkeys_dir(env).join(recipient.file_name());
        write_private(&path, recipient.to_armored()?.as_bytes())
            .map_err(|e| SecretError::io(&path, e))?;
        Ok(path)
    }

    pub fn remove_recipient(&self, env: &str, identity: &str) -> Result<()> {
        let path = self.pubkeys_dir(env).join(identity_file_name(identity));
        if !path.exists() {
            return Err(SecretError::UnknownRecipient {
                env: env.to_string(),
                identity: identity.to_string(),
            });
        }
        std::fs::remove_file(&path).map_err(|e| SecretError::io(&path, e))?;
        info!("Removed {} from environment {}", identity, env);
        Ok(())
    }

    /// Every registered public key of `env`, in file name order.
    pub fn recipients(&self, env: &str) -> Result<Vec<RecipientKey>> {
        let dir = self.pubkeys_dir(env);
        let mut recipients = Vec::new();
        for path in asc_files(&dir)? {
            let armored = std::fs::read_to_string(&path).map_err(|e| SecretError::io(&path, e))?;
            recipients.push(RecipientKey::from_armored(
                &path.display().to_string(),
                &armored,
            )?);
        }
        if recipients.is_empty() {
            return Err(SecretError::NoRecipients {
                env: env.to_string(),
            });
        }
        Ok(recipients)
    }

    pub fn secret_exists(&self, env: &str, name: &str) -> Result<bool> {
        Ok(self.secret_path(env, name)?.exists())
    }

    /// Names of the persisted secrets of `env`; nothing is decrypted.
    pub fn list_secret_names(&self, env: &str) -> Result<Vec<String>> {
        Ok(asc_files(&self.secrets_dir(env))?
            .iter()
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect())
    }

    /// Identities a persisted secret is currently encrypted for; nothing is decrypted.
    pub fn sealed_for(&self, env: &str, name: &str) -> Result<Vec<String>> {
        let path = self.secret_path(env, name)?;
        let armored = std::fs::read_to_string(&path).map_err(|e| SecretError::io(&path, e))?;
        envelope::recipients(name, &armored)
    }

    /// Encrypt `value` for the current recipient set of `env`, replacing any previous file.
    pub fn write_secret(&self, env: &str, name: &str, value: &str) -> Result<()> {
        let path = self.secret_path(env, name)?;
        let recipients = self.recipients(env)?;
        let message = envelope::seal(name, value.as_bytes(), &recipients)?;
        write_private(&path, message.as_bytes()).map_err(|e| SecretError::io(&path, e))?;
        debug!(
            "Wrote secret {}/{} for {} recipients",
            env,
            name,
            recipients.len()
        );
        Ok(())
    }

    /// Like [`write_secret`](Self::write_secret), refusing to replace an existing
    /// secret unless `overwrite` is set.
    pub fn add_secret(&self, env: &str, name: &str, value: &str, overwrite: bool) -> Result<()> {
        if !overwrite && self.secret_exists(env, name)? {
            return Err(SecretError::AlreadyExists {
                env: env.to_string(),
                name: name.to_string(),
            });
        }
        self.write_secret(env, name, value)
    }

    pub fn read_secret(&self, env: &str, name: &str, key: &OperatorKey) -> Result<Secret> {
        let path = self.secret_path(env, name)?;
        if !path.exists() {
            return Err(SecretError::NotFound {
                env: env.to_string(),
                name: name.to_string(),
            });
        }
        let armored = std::fs::read_to_string(&path).map_err(|e| SecretError::io(&path, e))?;
        let plaintext = envelope::open(name, &armored, key)?;
        let value = std::str::from_utf8(&plaintext).map_err(|e| SecretError::MalformedMessage {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Secret::new(name, value))
    }

    /// Decrypt every secret of `env` with `key`.
    pub fn read_all(&self, env: &str, key: &OperatorKey) -> Result<Vec<Secret>> {
        self.list_secret_names(env)?
            .iter()
            .map(|name| self.read_secret(env, name, key))
            .collect()
    }

    /// Re-encrypt every secret of `env` for the current recipient set.
    pub fn refresh(&self, env: &str, key: &OperatorKey) -> Result<usize> {
        let secrets = self.read_all(env, key)?;
        for secret in &secrets {
            self.write_secret(env, &secret.name, &secret.value)?;
        }
        info!("Refreshed {} secrets of environment {}", secrets.len(), env);
        Ok(secrets.len())
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(SecretError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };
    if name.is_empty() {
        return invalid("name is empty");
    }
    if name.starts_with('.') {
        return invalid("name starts with a dot");
    }
    if name.chars().any(|c| c == '/' || c == '\\' || c.is_whitespace()) {
        return invalid("name contains a path separator or whitespace");
    }
    Ok(())
}

fn asc_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let entries = std::fs::read_dir(dir).map_err(|e| SecretError::io(dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| SecretError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == SECRET_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_names_are_validated() {
        let store = SecretStore::new("/config");
        assert!(store.secret_path("prod", "postgres-db_USER").is_ok());
        for bad in ["", ".hidden", "../escape", "with space"] {
            assert!(
                matches!(store.secret_path("prod", bad), Err(SecretError::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_layout() {
        let store = SecretStore::new("/config");
        assert_eq!(
            store.secret_path("prod", "token").unwrap(),
            PathBuf::from("/config/environments/prod/secrets/token.asc")
        );
        assert_eq!(
            store.pubkeys_dir("prod"),
            PathBuf::from("/config/environments/prod/pubkeys")
        );
    }

    #[test]
    fn test_missing_directories_list_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = SecretStore::new(dir.path());
        assert!(store.list_secret_names("prod").unwrap().is_empty());
        assert!(matches!(
            store.recipients("prod"),
            Err(SecretError::NoRecipients { .. })
        ));
    }
}
