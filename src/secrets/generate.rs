use rand::rngs::OsRng;
use rand::Rng;

use crate::types::{ResourceIdentity, Secret, SecretRef, SecretType};

const SECRET_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";
const LOWER_ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub const MIN_SECRET_LEN: usize = 10;
pub const MAX_SECRET_LEN: usize = 30;

/// Random secret value of 10 to 30 characters from `[A-Za-z0-9_-]`.
pub fn generate_value() -> String {
    let len = OsRng.gen_range(MIN_SECRET_LEN..=MAX_SECRET_LEN);
    random_string(len)
}

/// `len` characters from `[A-Za-z0-9_-]`.
pub fn random_string(len: usize) -> String {
    random_from(SECRET_ALPHABET, len)
}

/// `len` characters from `[a-z0-9]`, safe for bucket and project names.
pub fn random_lowercase(len: usize) -> String {
    random_from(LOWER_ALPHANUMERIC, len)
}

fn random_from(alphabet: &[u8], len: usize) -> String {
    let mut rng = OsRng;
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
        .collect()
}

impl SecretRef {
    /// Produce the secret this reference asks for, stored under the owner's namespace.
    pub fn generate(&self, owner: &ResourceIdentity) -> Secret {
        let value = match self.secret_type {
            SecretType::RandomString => generate_value(),
        };
        Secret::new(self.namespaced(owner), value)
    }
}
