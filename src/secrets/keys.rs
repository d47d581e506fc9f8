//! Operator key pairs and registered recipient keys

use pkcs5::pbes2;
use pkcs8::{
    DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding,
    PrivateKeyInfo,
};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

use crate::secrets::error::{Result, SecretError};

const ENCRYPTED_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// Parameters for generating an operator key.
#[derive(Debug, Clone, Copy)]
pub struct KeyOptions {
    pub bits: usize,
    pub kdf_iterations: u32,
}

impl Default for KeyOptions {
    fn default() -> Self {
        Self {
            bits: 4096,
            kdf_iterations: 100_000,
        }
    }
}

/// `Name <email>`, the identity string carried by every key.
pub fn format_identity(name: &str, email: &str) -> String {
    format!("{} <{}>", name.trim(), email.trim())
}

/// Registered key file name for an identity: `John Doe <john@doe.com>` becomes
/// `john-doe-john@doe.com.asc`.
pub fn identity_file_name(identity: &str) -> String {
    let normalized = identity
        .replace(['<', '>'], "")
        .replace(' ', "-")
        .to_lowercase();
    format!("{normalized}.asc")
}

/// A recipient's public key as registered for an environment.
#[derive(Clone, PartialEq, Eq)]
pub struct RecipientKey {
    pub identity: String,
    public_key: RsaPublicKey,
}

#[derive(Serialize, Deserialize)]
struct RecipientFile {
    identity: String,
    public_key: String,
}

impl RecipientKey {
    pub fn new(identity: impl Into<String>, public_key: RsaPublicKey) -> Self {
        Self {
            identity: identity.into(),
            public_key,
        }
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Hex SHA-256 of the DER-encoded public key.
    pub fn fingerprint(&self) -> Result<String> {
        fingerprint(&self.public_key)
    }

    pub fn file_name(&self) -> String {
        identity_file_name(&self.identity)
    }

    pub fn to_armored(&self) -> Result<String> {
        let public_key = self
            .public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SecretError::KeyGeneration {
                reason: e.to_string(),
            })?;
        Ok(serde_yaml::to_string(&RecipientFile {
            identity: self.identity.clone(),
            public_key,
        })?)
    }

    pub fn from_armored(path: &str, armored: &str) -> Result<Self> {
        let invalid = |reason: String| SecretError::InvalidPublicKey {
            path: path.to_string(),
            reason,
        };
        let file: RecipientFile =
            serde_yaml::from_str(armored).map_err(|e| invalid(e.to_string()))?;
        let public_key =
            RsaPublicKey::from_public_key_pem(&file.public_key).map_err(|e| invalid(e.to_string()))?;
        Ok(Self::new(file.identity, public_key))
    }
}

impl fmt::Debug for RecipientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecipientKey")
            .field("identity", &self.identity)
            .finish()
    }
}

/// An operator's passphrase-protected private key as stored on disk.
#[derive(Clone, Serialize, Deserialize)]
pub struct PrivateKeyFile {
    pub identity: String,
    encrypted_key: String,
}

impl PrivateKeyFile {
    /// Generate a fresh key pair and seal the private half with `passphrase`.
    pub fn generate(
        identity: impl Into<String>,
        passphrase: &str,
        options: KeyOptions,
    ) -> Result<(PrivateKeyFile, OperatorKey)> {
        if passphrase.is_empty() {
            return Err(SecretError::EmptyPassphrase);
        }
        let identity = identity.into();
        let keygen = |reason: String| SecretError::KeyGeneration { reason };

        let private_key =
            RsaPrivateKey::new(&mut OsRng, options.bits).map_err(|e| keygen(e.to_string()))?;
        let der = private_key
            .to_pkcs8_der()
            .map_err(|e| keygen(e.to_string()))?;
        let info = PrivateKeyInfo::try_from(der.as_bytes()).map_err(|e| keygen(e.to_string()))?;

        let mut salt = [0u8; 16];
        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);
        let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(options.kdf_iterations, &salt, &iv)
            .map_err(|e| keygen(e.to_string()))?;
        let sealed = info
            .encrypt_with_params(params, passphrase.as_bytes())
            .map_err(|e| keygen(e.to_string()))?;
        let pem = sealed
            .to_pem(ENCRYPTED_KEY_LABEL, LineEnding::LF)
            .map_err(|e| keygen(e.to_string()))?;

        let file = PrivateKeyFile {
            identity: identity.clone(),
            encrypted_key: pem.to_string(),
        };
        let key = OperatorKey::new(identity, private_key);
        Ok((file, key))
    }

    /// Decrypt the private key with `passphrase`.
    pub fn unlock(&self, passphrase: &str) -> Result<OperatorKey> {
        if !self.encrypted_key.contains(ENCRYPTED_KEY_LABEL) {
            return Err(SecretError::InvalidPrivateKey {
                reason: "key is not a passphrase-protected PKCS#8 document".to_string(),
            });
        }
        let private_key = RsaPrivateKey::from_pkcs8_encrypted_pem(
            &self.encrypted_key,
            passphrase.as_bytes(),
        )
        .map_err(|_| SecretError::WrongPassphrase {
            identity: self.identity.clone(),
        })?;
        Ok(OperatorKey::new(self.identity.clone(), private_key))
    }

    pub fn to_armored(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_armored(armored: &str) -> Result<Self> {
        serde_yaml::from_str(armored).map_err(|e| SecretError::InvalidPrivateKey {
            reason: e.to_string(),
        })
    }
}

impl fmt::Debug for PrivateKeyFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyFile")
            .field("identity", &self.identity)
            .finish()
    }
}

/// An unlocked private key, held only for the duration of a session.
pub struct OperatorKey {
    identity: String,
    private_key: RsaPrivateKey,
    recipient: RecipientKey,
}

impl OperatorKey {
    fn new(identity: String, private_key: RsaPrivateKey) -> Self {
        let recipient = RecipientKey::new(identity.clone(), private_key.to_public_key());
        Self {
            identity,
            private_key,
            recipient,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// The public half, ready to register as a recipient.
    pub fn recipient(&self) -> &RecipientKey {
        &self.recipient
    }
}

impl fmt::Debug for OperatorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorKey")
            .field("identity", &self.identity)
            .finish()
    }
}

pub(crate) fn fingerprint(public_key: &RsaPublicKey) -> Result<String> {
    let der = public_key
        .to_public_key_der()
        .map_err(|e| SecretError::KeyGeneration {
            reason: e.to_string(),
        })?;
    let digest = Sha256::digest(der.as_bytes());
    Ok(digest.iter().map(|b| format!("{b:02x}")).collect())
}

/// Passphrase text that is wiped from memory when dropped.
pub type Passphrase = Zeroizing<String>;

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_options() -> KeyOptions {
        KeyOptions {
            bits: 1024,
            kdf_iterations: 1_000,
        }
    }

    #[test]
    fn test_identity_file_name_normalization() {
        assert_eq!(
            identity_file_name("John Doe <john@doe.com>"),
            "john-doe-john@doe.com.asc"
        );
        assert_eq!(
            identity_file_name(&format_identity(" Steve Doe ", "Steve@doe.com")),
            "steve-doe-steve@doe.com.asc"
        );
    }

    #[test]
    fn test_private_key_unlocks_with_its_passphrase_only() {
        let (file, key) =
            PrivateKeyFile::generate("Jane Doe <jane@doe.com>", "LongSecret", fast_options())
                .unwrap();
        let armored = file.to_armored().unwrap();
        let reloaded = PrivateKeyFile::from_armored(&armored).unwrap();

        let unlocked = reloaded.unlock("LongSecret").unwrap();
        assert_eq!(unlocked.recipient(), key.recipient());
        assert!(matches!(
            reloaded.unlock("not-it"),
            Err(SecretError::WrongPassphrase { .. })
        ));
    }

    #[test]
    fn test_empty_passphrase_is_rejected() {
        assert!(matches!(
            PrivateKeyFile::generate("A <a@b.c>", "", fast_options()),
            Err(SecretError::EmptyPassphrase)
        ));
    }

    #[test]
    fn test_recipient_round_trips_through_armor() {
        let (_, key) =
            PrivateKeyFile::generate("John Doe <john@doe.com>", "pass", fast_options()).unwrap();
        let armored = key.recipient().to_armored().unwrap();
        let parsed = RecipientKey::from_armored("john.asc", &armored).unwrap();

        assert_eq!(parsed.identity, "John Doe <john@doe.com>");
        assert_eq!(
            parsed.fingerprint().unwrap(),
            key.recipient().fingerprint().unwrap()
        );
        assert_eq!(parsed.file_name(), "john-doe-john@doe.com.asc");
    }
}
