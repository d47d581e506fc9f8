//! Hybrid multi-recipient secret messages
//!
//! The payload is sealed with AES-256-GCM under a fresh session key. The session
//! key is wrapped with RSA-OAEP once per recipient, and the whole envelope is
//! JSON, base64-encoded between armor lines.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::Oaep;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::secrets::error::{Result, SecretError};
use crate::secrets::keys::{OperatorKey, RecipientKey};

const ARMOR_BEGIN: &str = "-----BEGIN INFRALINK SECRET-----";
const ARMOR_END: &str = "-----END INFRALINK SECRET-----";
const ENVELOPE_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const LINE_WIDTH: usize = 64;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u8,
    recipients: Vec<WrappedKey>,
    nonce: String,
    ciphertext: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WrappedKey {
    identity: String,
    fingerprint: String,
    key: String,
}

/// Encrypt `plaintext` so that every key in `recipients` can open it.
pub fn seal(name: &str, plaintext: &[u8], recipients: &[RecipientKey]) -> Result<String> {
    let failed = |reason: String| SecretError::EncryptionFailed {
        name: name.to_string(),
        reason,
    };
    if recipients.is_empty() {
        return Err(failed("no recipients".to_string()));
    }

    let mut session_key = Zeroizing::new([0u8; 32]);
    OsRng.fill_bytes(&mut session_key[..]);
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new_from_slice(&session_key[..]).map_err(|e| failed(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| failed(e.to_string()))?;

    let mut wrapped = Vec::with_capacity(recipients.len());
    for recipient in recipients {
        let key = recipient
            .public_key()
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &session_key[..])
            .map_err(|e| failed(format!("wrapping key for {}: {e}", recipient.identity)))?;
        wrapped.push(WrappedKey {
            identity: recipient.identity.clone(),
            fingerprint: recipient.fingerprint()?,
            key: STANDARD.encode(key),
        });
    }

    let envelope = Envelope {
        version: ENVELOPE_VERSION,
        recipients: wrapped,
        nonce: STANDARD.encode(nonce),
        ciphertext: STANDARD.encode(ciphertext),
    };
    Ok(armor(&serde_json::to_vec(&envelope)?))
}

/// Decrypt a message produced by [`seal`] with an unlocked operator key.
pub fn open(name: &str, armored: &str, key: &OperatorKey) -> Result<Zeroizing<Vec<u8>>> {
    let malformed = |reason: String| SecretError::MalformedMessage {
        name: name.to_string(),
        reason,
    };
    let failed = |reason: String| SecretError::DecryptionFailed {
        name: name.to_string(),
        reason,
    };

    let body = dearmor(armored).ok_or_else(|| malformed("missing armor lines".to_string()))?;
    let json = STANDARD.decode(body).map_err(|e| malformed(e.to_string()))?;
    let envelope: Envelope = serde_json::from_slice(&json).map_err(|e| malformed(e.to_string()))?;
    if envelope.version != ENVELOPE_VERSION {
        return Err(malformed(format!("unsupported version {}", envelope.version)));
    }

    let fingerprint = key.recipient().fingerprint()?;
    let entry = envelope
        .recipients
        .iter()
        .find(|r| r.fingerprint == fingerprint)
        .ok_or_else(|| SecretError::NotARecipient {
            name: name.to_string(),
            identity: key.identity().to_string(),
        })?;

    let wrapped = STANDARD.decode(&entry.key).map_err(|e| malformed(e.to_string()))?;
    let session_key = Zeroizing::new(
        key.private_key()
            .decrypt(Oaep::new::<Sha256>(), &wrapped)
            .map_err(|e| failed(e.to_string()))?,
    );

    let nonce = STANDARD.decode(&envelope.nonce).map_err(|e| malformed(e.to_string()))?;
    if nonce.len() != NONCE_LEN {
        return Err(malformed(format!("nonce is {} bytes", nonce.len())));
    }
    let ciphertext = STANDARD
        .decode(&envelope.ciphertext)
        .map_err(|e| malformed(e.to_string()))?;

    let cipher = Aes256Gcm::new_from_slice(&session_key).map_err(|e| failed(e.to_string()))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
        .map_err(|e| failed(e.to_string()))?;
    Ok(Zeroizing::new(plaintext))
}

/// Identities a message was sealed for, read without decrypting it.
pub fn recipients(name: &str, armored: &str) -> Result<Vec<String>> {
    let malformed = |reason: String| SecretError::MalformedMessage {
        name: name.to_string(),
        reason,
    };
    let body = dearmor(armored).ok_or_else(|| malformed("missing armor lines".to_string()))?;
    let json = STANDARD.decode(body).map_err(|e| malformed(e.to_string()))?;
    let envelope: Envelope = serde_json::from_slice(&json).map_err(|e| malformed(e.to_string()))?;
    Ok(envelope.recipients.into_iter().map(|r| r.identity).collect())
}

fn armor(payload: &[u8]) -> String {
    let encoded = STANDARD.encode(payload);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / LINE_WIDTH + 80);
    out.push_str(ARMOR_BEGIN);
    out.push('\n');
    // base64 output is ASCII, so byte chunks are valid UTF-8
    for line in encoded.as_bytes().chunks(LINE_WIDTH) {
        out.push_str(&String::from_utf8_lossy(line));
        out.push('\n');
    }
    out.push_str(ARMOR_END);
    out.push('\n');
    out
}

fn dearmor(armored: &str) -> Option<String> {
    let start = armored.find(ARMOR_BEGIN)? + ARMOR_BEGIN.len();
    let end = armored[start..].find(ARMOR_END)? + start;
    Some(
        armored[start..end]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::keys::{KeyOptions, PrivateKeyFile};

    fn key(identity: &str) -> OperatorKey {
        let options = KeyOptions {
            bits: 1024,
            kdf_iterations: 1_000,
        };
        PrivateKeyFile::generate(identity, "pass", options).unwrap().1
    }

    #[test]
    fn test_every_recipient_can_open() {
        let alice = key("Alice <alice@example.com>");
        let bob = key("Bob <bob@example.com>");
        let recipients = vec![alice.recipient().clone(), bob.recipient().clone()];

        let message = seal("db_PASSWORD", b"hunter2hunter2", &recipients).unwrap();
        assert!(message.starts_with(ARMOR_BEGIN));
        assert!(message.trim_end().ends_with(ARMOR_END));

        assert_eq!(open("db_PASSWORD", &message, &alice).unwrap().as_slice(), b"hunter2hunter2");
        assert_eq!(open("db_PASSWORD", &message, &bob).unwrap().as_slice(), b"hunter2hunter2");
        assert_eq!(
            recipients_of(&message),
            vec!["Alice <alice@example.com>", "Bob <bob@example.com>"]
        );
    }

    fn recipients_of(message: &str) -> Vec<String> {
        recipients("x", message).unwrap()
    }

    #[test]
    fn test_outsider_is_not_a_recipient() {
        let alice = key("Alice <alice@example.com>");
        let mallory = key("Mallory <mallory@example.com>");
        let message = seal("token", b"value", &[alice.recipient().clone()]).unwrap();

        assert!(matches!(
            open("token", &message, &mallory),
            Err(SecretError::NotARecipient { .. })
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let alice = key("Alice <alice@example.com>");
        let message = seal("token", b"value", &[alice.recipient().clone()]).unwrap();
        let body = dearmor(&message).unwrap();
        let json = STANDARD.decode(body).unwrap();
        let mut envelope: Envelope = serde_json::from_slice(&json).unwrap();
        envelope.ciphertext = STANDARD.encode(b"definitely not the ciphertext");
        let tampered = armor(&serde_json::to_vec(&envelope).unwrap());

        assert!(matches!(
            open("token", &tampered, &alice),
            Err(SecretError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let alice = key("Alice <alice@example.com>");
        assert!(matches!(
            open("token", "not a message", &alice),
            Err(SecretError::MalformedMessage { .. })
        ));
    }

    #[test]
    fn test_seal_requires_recipients() {
        assert!(matches!(
            seal("token", b"value", &[]),
            Err(SecretError::EncryptionFailed { .. })
        ));
    }
}
