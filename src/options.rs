use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OptionsError;
use crate::fs::Resource;

/// String key/value options shared by every rule in a project.
///
/// Options are plain strings. When loaded from JSON, scalar values which are
/// not strings (numbers, booleans) are stored in their JSON text form, so
/// `{"level": 3}` and `{"level": "3"}` are equivalent.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options {
    values: BTreeMap<String, String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Value mapped to `key`, or `default` if there is none.
    pub fn get<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.values.get(key).map(String::as_str).unwrap_or(default)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge `other` into `self`, values from `other` win.
    pub fn extend(&mut self, other: Options) {
        self.values.extend(other.values);
    }

    /// Parse options from a JSON object. `null` values are skipped, nested
    /// arrays and objects are kept as their JSON text.
    pub fn from_json(text: &str) -> Result<Self, OptionsError> {
        Ok(Self::from_map(serde_json::from_str(text)?))
    }

    /// Like [`Options::from_json`], reading the resource as raw bytes so
    /// invalid UTF-8 is rejected rather than replaced.
    pub fn from_resource(resource: &Resource) -> Result<Self, OptionsError> {
        let bytes = resource.content()?;
        Ok(Self::from_map(serde_json::from_slice(&bytes)?))
    }

    fn from_map(map: BTreeMap<String, Value>) -> Self {
        let values = map
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(text) => Some((key, text)),
                other => Some((key, other.to_string())),
            })
            .collect();

        Self { values }
    }
}

impl<K, V> FromIterator<(K, V)> for Options
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
