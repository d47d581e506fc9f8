use crate::types::resource::ResourceIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecretType {
    RandomString,
}

/// Secret material a dependency binding needs before provisioning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,
    pub secret_type: SecretType,
}

impl SecretRef {
    pub fn new(name: impl Into<String>, secret_type: SecretType) -> Self {
        Self {
            name: name.into(),
            secret_type,
        }
    }

    /// `{type}-{id}_{name}`: the stored name of this secret for `owner`.
    pub fn namespaced(&self, owner: &ResourceIdentity) -> String {
        format!("{owner}_{}", self.name)
    }
}

/// A decrypted or freshly generated secret.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret {
    pub name: String,
    pub value: String,
}

impl Secret {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}
