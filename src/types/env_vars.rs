use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type VarMap = BTreeMap<String, String>;

/// Environment variables in three independent namespaces.
///
/// `vars` are literal values, `refs` are symbolic references the provider
/// resolves when it renders its artifacts, and `secrets` map a variable name to
/// the name of a secret. A namespace that was never declared is `None`, which
/// is distinct from a declared but empty map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVars {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars: Option<VarMap>,
    #[serde(skip)]
    pub refs: Option<VarMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets: Option<VarMap>,
}

impl EnvVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars
            .get_or_insert_with(VarMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_ref(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.refs
            .get_or_insert_with(VarMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets
            .get_or_insert_with(VarMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Insert a symbolic reference, creating the namespace if needed.
    pub fn insert_ref(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.refs
            .get_or_insert_with(VarMap::new)
            .insert(key.into(), value.into());
    }

    /// Insert a secret reference, creating the namespace if needed.
    pub fn insert_secret(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.secrets
            .get_or_insert_with(VarMap::new)
            .insert(key.into(), value.into());
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        lookup(&self.vars, key)
    }

    pub fn reference(&self, key: &str) -> Option<&str> {
        lookup(&self.refs, key)
    }

    pub fn secret(&self, key: &str) -> Option<&str> {
        lookup(&self.secrets, key)
    }

    /// Overlay `other` on top of `self`, namespace by namespace.
    ///
    /// Colliding keys take the overlay value. When a namespace is absent in
    /// `self` it is replaced by the overlay's namespace as a whole, so an
    /// absent base stays absent if the overlay is absent too.
    pub fn merge(&mut self, other: &EnvVars) {
        merge_namespace(&mut self.vars, &other.vars);
        merge_namespace(&mut self.refs, &other.refs);
        merge_namespace(&mut self.secrets, &other.secrets);
    }

    /// Non-mutating form of [`EnvVars::merge`].
    pub fn merged(&self, other: &EnvVars) -> EnvVars {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    /// Keep only the keys named in each allow-list.
    pub fn scope<'a>(
        &self,
        var_keys: impl IntoIterator<Item = &'a str>,
        ref_keys: impl IntoIterator<Item = &'a str>,
        secret_keys: impl IntoIterator<Item = &'a str>,
    ) -> EnvVars {
        EnvVars {
            vars: scope_namespace(&self.vars, var_keys),
            refs: scope_namespace(&self.refs, ref_keys),
            secrets: scope_namespace(&self.secrets, secret_keys),
        }
    }

    /// Keys declared in each namespace, used as allow-lists for [`EnvVars::scope`].
    pub fn declared_keys(&self) -> DeclaredKeys<'_> {
        DeclaredKeys {
            vars: keys_of(&self.vars),
            refs: keys_of(&self.refs),
            secrets: keys_of(&self.secrets),
        }
    }

    pub fn is_empty(&self) -> bool {
        [&self.vars, &self.refs, &self.secrets]
            .iter()
            .all(|ns| ns.as_ref().map_or(true, |m| m.is_empty()))
    }
}

/// Borrowed key sets of one [`EnvVars`] value.
#[derive(Debug, Clone, Default)]
pub struct DeclaredKeys<'a> {
    pub vars: BTreeSet<&'a str>,
    pub refs: BTreeSet<&'a str>,
    pub secrets: BTreeSet<&'a str>,
}

impl DeclaredKeys<'_> {
    /// Scope `source` down to these keys.
    pub fn apply(&self, source: &EnvVars) -> EnvVars {
        source.scope(
            self.vars.iter().copied(),
            self.refs.iter().copied(),
            self.secrets.iter().copied(),
        )
    }
}

fn lookup<'a>(ns: &'a Option<VarMap>, key: &str) -> Option<&'a str> {
    ns.as_ref().and_then(|m| m.get(key)).map(String::as_str)
}

fn keys_of(ns: &Option<VarMap>) -> BTreeSet<&str> {
    ns.iter().flat_map(|m| m.keys().map(String::as_str)).collect()
}

fn merge_namespace(base: &mut Option<VarMap>, overlay: &Option<VarMap>) {
    match (base.as_mut(), overlay) {
        (None, _) => *base = overlay.clone(),
        (Some(base), Some(overlay)) => {
            for (key, value) in overlay {
                base.insert(key.clone(), value.clone());
            }
        }
        (Some(_), None) => {}
    }
}

fn scope_namespace<'a>(
    ns: &Option<VarMap>,
    keys: impl IntoIterator<Item = &'a str>,
) -> Option<VarMap> {
    let source = ns.as_ref()?;
    let mut scoped = VarMap::new();
    for key in keys {
        if let Some(value) = source.get(key) {
            scoped.insert(key.to_string(), value.clone());
        }
    }
    Some(scoped)
}
