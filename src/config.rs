//! Run settings: where definitions live and where the operator key comes from

use std::path::{Path, PathBuf};
use zeroize::Zeroizing;

use crate::definitions::DefinitionReader;
use crate::deploy::{DeployError, Result};
use crate::secrets::{KeyOptions, KeySession, PassphraseSource, PrivateKeySource, SecretStore};

pub const PRIVATE_KEY_ENV: &str = "INFRALINK_PRIVATE_KEY";
pub const PASSPHRASE_ENV: &str = "INFRALINK_PASSPHRASE";
pub const DEFAULT_ROOT: &str = ".infralink/config";
pub const KEY_DIR: &str = ".infralink";
pub const KEY_FILE: &str = "private-key.asc";

#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub home: PathBuf,
    pub private_key: PrivateKeySource,
    pub passphrase: PassphraseSource,
    pub key_options: KeyOptions,
}

impl Settings {
    /// Key read from `<home>/.infralink/private-key.asc`, passphrase prompted.
    pub fn new(root: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        Self {
            root: root.into(),
            private_key: PrivateKeySource::File(private_key_path(&home)),
            home,
            passphrase: PassphraseSource::Prompt,
            key_options: KeyOptions::default(),
        }
    }

    /// Settings for an interactive or automated run: the home directory comes
    /// from the platform, key material from the environment when present.
    pub fn from_env(root: Option<PathBuf>) -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            DeployError::Configuration("could not determine the home directory".to_string())
        })?;
        let mut settings = Settings::new(root.unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT)), home);

        if let Ok(armored) = std::env::var(PRIVATE_KEY_ENV) {
            if !armored.trim().is_empty() {
                settings.private_key = PrivateKeySource::Armored(Zeroizing::new(armored));
            }
        }
        if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
            if !passphrase.is_empty() {
                settings.passphrase = PassphraseSource::Fixed(Zeroizing::new(passphrase));
            }
        }
        Ok(settings)
    }

    pub fn with_private_key(mut self, source: PrivateKeySource) -> Self {
        self.private_key = source;
        self
    }

    pub fn with_passphrase(mut self, source: PassphraseSource) -> Self {
        self.passphrase = source;
        self
    }

    pub fn with_key_options(mut self, options: KeyOptions) -> Self {
        self.key_options = options;
        self
    }

    pub fn private_key_path(&self) -> PathBuf {
        private_key_path(&self.home)
    }

    /// A fresh session; the unlocked key lives as long as it does.
    pub fn key_session(&self) -> KeySession {
        KeySession::new(self.private_key.clone(), self.passphrase.clone())
    }

    pub fn secret_store(&self) -> SecretStore {
        SecretStore::new(&self.root)
    }

    pub fn reader(&self) -> DefinitionReader {
        DefinitionReader::new(&self.root)
    }
}

fn private_key_path(home: &Path) -> PathBuf {
    home.join(KEY_DIR).join(KEY_FILE)
}
