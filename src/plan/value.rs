//! Structured configuration values.
//!
//! Appliance configuration is an arbitrary tree of key/value pairs. It is
//! carried as a [`ConfigValue`] so nesting survives untouched from the plan
//! document to the JSON files written next to the installed appliance.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A configuration tree: string keys mapped to structured values.
pub type ConfigTree = BTreeMap<String, ConfigValue>;

/// A single structured configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum ConfigValue {
    /// Explicit null.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Integer(i64),
    /// Integer value above `i64::MAX`.
    Unsigned(u64),
    /// Floating point value.
    Float(f64),
    /// String value.
    String(String),
    /// Ordered list of values.
    List(Vec<ConfigValue>),
    /// Nested map.
    Map(ConfigTree),
}

impl ConfigValue {
    /// Returns the nested map if this is a map value.
    #[must_use]
    pub const fn as_map(&self) -> Option<&ConfigTree> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Looks up a value by dotted path, e.g. `database.port`.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Self> {
        path.split('.')
            .try_fold(self, |current, segment| current.as_map()?.get(segment))
    }

    fn non_finite_at(&self, path: &str) -> Option<String> {
        match self {
            Self::Float(value) if !value.is_finite() => Some(path.to_string()),
            Self::List(items) => items
                .iter()
                .enumerate()
                .find_map(|(i, item)| item.non_finite_at(&format!("{path}[{i}]"))),
            Self::Map(map) => map
                .iter()
                .find_map(|(key, value)| value.non_finite_at(&format!("{path}.{key}"))),
            _ => None,
        }
    }
}

/// Returns the dotted path of the first NaN or infinite float in a tree.
///
/// JSON has no representation for these, so they cannot be written to an
/// appliance's configuration files.
#[must_use]
pub fn find_non_finite(tree: &ConfigTree) -> Option<String> {
    tree.iter().find_map(|(key, value)| value.non_finite_at(key))
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u64> for ConfigValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Unsigned(value), Self::Integer)
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<ConfigTree> for ConfigValue {
    fn from(value: ConfigTree) -> Self {
        Self::Map(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_variants_from_json() {
        let tree: ConfigTree = serde_json::from_str(
            r#"{"name":"web","port":8080,"ratio":0.5,"whole":3.0,"debug":false,"tags":["a","b"],"db":{"host":"localhost"},"none":null}"#,
        )
        .expect("valid json");

        assert_eq!(tree["name"], ConfigValue::from("web"));
        assert_eq!(tree["port"], ConfigValue::Integer(8080));
        assert_eq!(tree["ratio"], ConfigValue::Float(0.5));
        assert_eq!(tree["whole"], ConfigValue::Float(3.0));
        assert_eq!(tree["debug"], ConfigValue::Bool(false));
        assert_eq!(tree["none"], ConfigValue::Null);
        assert_eq!(
            tree["tags"],
            ConfigValue::List(vec![ConfigValue::from("a"), ConfigValue::from("b")])
        );
    }

    #[test]
    fn test_lookup_nested_path() {
        let value: ConfigValue =
            serde_json::from_str(r#"{"database":{"primary":{"port":5432}}}"#).expect("valid json");

        assert_eq!(
            value.lookup("database.primary.port"),
            Some(&ConfigValue::Integer(5432))
        );
        assert!(value.lookup("database.replica").is_none());
    }

    #[test]
    fn test_large_unsigned_integer_survives_json() {
        let tree: ConfigTree =
            serde_yaml::from_str("big: 18446744073709551615\nsmall: 7\n").expect("valid yaml");
        assert_eq!(tree["big"], ConfigValue::Unsigned(u64::MAX));
        assert_eq!(tree["small"], ConfigValue::Integer(7));

        let json = serde_json::to_string(&tree).expect("serialize");
        let back: ConfigTree = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, tree);
    }

    #[test]
    fn test_from_u64_prefers_signed() {
        assert_eq!(ConfigValue::from(5_u64), ConfigValue::Integer(5));
        assert_eq!(ConfigValue::from(u64::MAX), ConfigValue::Unsigned(u64::MAX));
    }

    #[test]
    fn test_find_non_finite_reports_path() {
        let tree: ConfigTree = serde_yaml::from_str(
            "limits:\n  ratio: 0.5\n  samples: [1.0, .nan]\nceiling: 2.0\n",
        )
        .expect("valid yaml");
        assert_eq!(find_non_finite(&tree).as_deref(), Some("limits.samples[1]"));

        let tree: ConfigTree = serde_yaml::from_str("limit: .inf\n").expect("valid yaml");
        assert_eq!(find_non_finite(&tree).as_deref(), Some("limit"));

        let tree: ConfigTree = serde_yaml::from_str("limit: 1.5\n").expect("valid yaml");
        assert!(find_non_finite(&tree).is_none());
    }

    #[test]
    fn test_yaml_and_json_agree() {
        let from_yaml: ConfigTree =
            serde_yaml::from_str("level: 3\nflags:\n  - x\nnested:\n  enabled: true\n").expect("valid yaml");
        let from_json: ConfigTree =
            serde_json::from_str(r#"{"level":3,"flags":["x"],"nested":{"enabled":true}}"#).expect("valid json");

        assert_eq!(from_yaml, from_json);
    }
}
