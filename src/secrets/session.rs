//! Scoped access to the operator's unlocked private key

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::fs::write_private;
use crate::secrets::error::{Result, SecretError};
use crate::secrets::keys::{KeyOptions, OperatorKey, Passphrase, PrivateKeyFile};

/// Where the armored private key comes from.
#[derive(Clone)]
pub enum PrivateKeySource {
    File(PathBuf),
    /// Key content supplied out of band, e.g. from `INFRALINK_PRIVATE_KEY`.
    Armored(Zeroizing<String>),
}

impl std::fmt::Debug for PrivateKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrivateKeySource::File(path) => f.debug_tuple("File").field(path).finish(),
            PrivateKeySource::Armored(_) => f.write_str("Armored(<redacted>)"),
        }
    }
}

/// Where the passphrase comes from.
#[derive(Clone)]
pub enum PassphraseSource {
    Prompt,
    Fixed(Passphrase),
}

impl std::fmt::Debug for PassphraseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PassphraseSource::Prompt => f.write_str("Prompt"),
            PassphraseSource::Fixed(_) => f.write_str("Fixed(<redacted>)"),
        }
    }
}

/// Holds the passphrase and the unlocked key for one invocation.
///
/// Both are acquired lazily on first use and wiped when the session is
/// cleared or dropped.
pub struct KeySession {
    key_source: PrivateKeySource,
    passphrase_source: PassphraseSource,
    passphrase: Option<Passphrase>,
    key: Option<OperatorKey>,
}

impl KeySession {
    pub fn new(key_source: PrivateKeySource, passphrase_source: PassphraseSource) -> Self {
        Self {
            key_source,
            passphrase_source,
            passphrase: None,
            key: None,
        }
    }

    pub fn key_source(&self) -> &PrivateKeySource {
        &self.key_source
    }

    /// Parse the stored key file without unlocking it.
    pub fn key_file(&self) -> Result<PrivateKeyFile> {
        match &self.key_source {
            PrivateKeySource::File(path) => {
                if !path.exists() {
                    return Err(SecretError::PrivateKeyNotFound {
                        path: path.display().to_string(),
                    });
                }
                let armored = Zeroizing::new(
                    std::fs::read_to_string(path).map_err(|e| SecretError::io(path, e))?,
                );
                PrivateKeyFile::from_armored(&armored)
            }
            PrivateKeySource::Armored(armored) => PrivateKeyFile::from_armored(armored),
        }
    }

    /// The unlocked operator key, prompting for the passphrase on first use.
    pub fn unlock(&mut self) -> Result<&OperatorKey> {
        if self.key.is_none() {
            let file = self.key_file()?;
            let passphrase = self.passphrase(&file.identity)?;
            match file.unlock(&passphrase) {
                Ok(key) => {
                    debug!("Unlocked private key of {}", key.identity());
                    self.key = Some(key);
                }
                Err(e) => {
                    self.passphrase = None;
                    return Err(e);
                }
            }
        }
        self.key.as_ref().ok_or_else(|| SecretError::InvalidPrivateKey {
            reason: "key was not unlocked".to_string(),
        })
    }

    fn passphrase(&mut self, identity: &str) -> Result<Passphrase> {
        if let Some(passphrase) = &self.passphrase {
            return Ok(passphrase.clone());
        }
        let passphrase = match &self.passphrase_source {
            PassphraseSource::Fixed(passphrase) => passphrase.clone(),
            PassphraseSource::Prompt => prompt_passphrase(&format!("Passphrase for {identity}:"))?,
        };
        self.passphrase = Some(passphrase.clone());
        Ok(passphrase)
    }

    /// Drop the cached passphrase and key.
    pub fn clear(&mut self) {
        self.passphrase = None;
        self.key = None;
    }
}

impl std::fmt::Debug for KeySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySession")
            .field("key_source", &self.key_source)
            .field("passphrase_source", &self.passphrase_source)
            .field("unlocked", &self.key.is_some())
            .finish()
    }
}

impl Drop for KeySession {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Ask for a passphrase on the terminal.
pub fn prompt_passphrase(message: &str) -> Result<Passphrase> {
    let passphrase = inquire::Password::new(message)
        .without_confirmation()
        .prompt()
        .map_err(|e| SecretError::PassphrasePrompt {
            reason: e.to_string(),
        })?;
    Ok(Zeroizing::new(passphrase))
}

/// Create the operator key at `path` unless one exists. Returns the new key,
/// or `None` when a key was already present.
pub fn init_operator_key(
    path: &Path,
    identity: &str,
    passphrase: &str,
    options: KeyOptions,
) -> Result<Option<OperatorKey>> {
    if path.exists() {
        debug!("Private key {} already exists", path.display());
        return Ok(None);
    }
    let (file, key) = PrivateKeyFile::generate(identity, passphrase, options)?;
    write_private(path, file.to_armored()?.as_bytes()).map_err(|e| SecretError::io(path, e))?;
    info!("Created private key for {} at {}", identity, path.display());
    Ok(Some(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const OPTIONS: KeyOptions = KeyOptions {
        bits: 1024,
        kdf_iterations: 1_000,
    };

    #[test]
    fn test_missing_key_file() {
        let dir = TempDir::new().unwrap();
        let mut session = KeySession::new(
            PrivateKeySource::File(dir.path().join("private-key.asc")),
            PassphraseSource::Fixed(Zeroizing::new("x".to_string())),
        );
        assert!(matches!(
            session.unlock(),
            Err(SecretError::PrivateKeyNotFound { .. })
        ));
    }

    #[test]
    fn test_init_then_unlock_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".infralink/private-key.asc");

        let created = init_operator_key(&path, "Jane <jane@doe.com>", "pw", OPTIONS).unwrap();
        assert!(created.is_some());
        assert!(init_operator_key(&path, "Jane <jane@doe.com>", "pw", OPTIONS)
            .unwrap()
            .is_none());

        let mut session = KeySession::new(
            PrivateKeySource::File(path),
            PassphraseSource::Fixed(Zeroizing::new("pw".to_string())),
        );
        assert_eq!(session.unlock().unwrap().identity(), "Jane <jane@doe.com>");
        session.clear();
        assert!(session.key.is_none());
        assert!(session.passphrase.is_none());
    }

    #[test]
    fn test_wrong_passphrase_is_not_cached() {
        let (file, _) = PrivateKeyFile::generate("Jane <jane@doe.com>", "pw", OPTIONS).unwrap();
        let mut session = KeySession::new(
            PrivateKeySource::Armored(Zeroizing::new(file.to_armored().unwrap())),
            PassphraseSource::Fixed(Zeroizing::new("nope".to_string())),
        );
        assert!(matches!(
            session.unlock(),
            Err(SecretError::WrongPassphrase { .. })
        ));
        assert!(session.passphrase.is_none());
    }
}
