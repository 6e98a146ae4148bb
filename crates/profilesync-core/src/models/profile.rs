use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fallback shown when a profile has neither a username nor an email
const DEFAULT_DISPLAY_NAME: &str = "User";

/// User-visible profile fields as returned by `/users/me`.
///
/// The backend owns the schema, so fields are kept as a JSON object with
/// typed accessors for the ones this client knows about. Anything else
/// (confirmed flags, timestamps, custom attributes) is carried through
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(Map<String, Value>);

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a profile from string fields (handy for tests and patches)
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        )
    }

    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    pub fn username(&self) -> Option<&str> {
        self.get_str("username")
    }

    pub fn email(&self) -> Option<&str> {
        self.get_str("email")
    }

    /// Name to greet the user with: username, then email, then a placeholder
    pub fn display_name(&self) -> &str {
        self.username()
            .filter(|s| !s.is_empty())
            .or_else(|| self.email())
            .unwrap_or(DEFAULT_DISPLAY_NAME)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow merge: keys in `other` win, keys absent from `other` are kept.
    pub fn merge(&mut self, other: &Profile) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn merged(&self, other: &Profile) -> Profile {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }
}

/// Profile fields a user submitted for change.
///
/// Values are the raw form input; blank entries mean "keep the current
/// value" and are dropped by [`ProfilePatch::changes_from`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfilePatch(BTreeMap<String, String>);

impl ProfilePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keep only fields that are non-blank and differ from `current`.
    pub fn changes_from(&self, current: &Profile) -> ProfilePatch {
        ProfilePatch(
            self.0
                .iter()
                .filter(|(_, value)| !value.trim().is_empty())
                .filter(|(key, value)| current.get_str(key) != Some(value.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn to_profile(&self) -> Profile {
        Profile::from_pairs(self.0.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProfilePatch {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
