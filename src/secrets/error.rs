use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("No private key found at {path}")]
    PrivateKeyNotFound { path: String },

    #[error("Private key could not be parsed: {reason}")]
    InvalidPrivateKey { reason: String },

    #[error("Could not unlock private key for {identity}, did you enter the correct passphrase?")]
    WrongPassphrase { identity: String },

    #[error("Passphrase prompt failed: {reason}")]
    PassphrasePrompt { reason: String },

    #[error("Passphrase must not be empty")]
    EmptyPassphrase,

    #[error("No public keys registered for environment {env}")]
    NoRecipients { env: String },

    #[error("No public key registered for {identity} in environment {env}")]
    UnknownRecipient { env: String, identity: String },

    #[error("Public key {path} could not be parsed: {reason}")]
    InvalidPublicKey { path: String, reason: String },

    #[error("Secret {name} is not encrypted for {identity}")]
    NotARecipient { name: String, identity: String },

    #[error("Decryption of secret {name} failed: {reason}")]
    DecryptionFailed { name: String, reason: String },

    #[error("Encryption of secret {name} failed: {reason}")]
    EncryptionFailed { name: String, reason: String },

    #[error("Malformed secret message {name}: {reason}")]
    MalformedMessage { name: String, reason: String },

    #[error("Secret {env}/{name} already exists")]
    AlreadyExists { env: String, name: String },

    #[error("Secret {env}/{name} does not exist")]
    NotFound { env: String, name: String },

    #[error("Invalid secret name {name}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Key generation failed: {reason}")]
    KeyGeneration { reason: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SecretError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        SecretError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Remediation advice for the operator, if this failure has one.
    pub fn hint(&self) -> Option<String> {
        match self {
            SecretError::PrivateKeyNotFound { .. } => Some(
                "Run `infralink secret init -e <environment>` to create your key and register it. \
                 If secrets already exist, ask a colleague with access to run `infralink secret refresh`."
                    .to_string(),
            ),
            SecretError::WrongPassphrase { .. } => Some(
                "Re-enter the passphrase of your private key, or check INFRALINK_PASSPHRASE."
                    .to_string(),
            ),
            SecretError::NotARecipient { .. } => Some(
                "Your public key was not registered when this secret was written. Commit your key \
                 under pubkeys/ and ask a colleague with access to run `infralink secret refresh`."
                    .to_string(),
            ),
            SecretError::NoRecipients { env } => Some(format!(
                "Register at least one public key with `infralink secret init -e {env}`."
            )),
            SecretError::AlreadyExists { env, name } => Some(format!(
                "Pass --overwrite to replace {env}/{name}."
            )),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SecretError>;
