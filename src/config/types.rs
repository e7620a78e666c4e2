//! Core configuration types
//!
//! Raw types mirror a kick.yml document as written; resolved types are what
//! the parser produces after placeholder substitution and glob expansion.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashMap};

/// Name of the reserved top-level key holding hooks and shared environment
pub const GLOBAL_KEY: &str = "global";

/// Task run when the caller names none
pub const DEFAULT_TASK: &str = "main";

/// Resolved tasks keyed by name
pub type TaskTable = HashMap<String, Task>;

/// A resolved task
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Task {
    /// Task name (its key in the document)
    pub name: String,

    /// Concrete file paths the task depends on
    #[serde(default)]
    pub files: Vec<String>,

    /// Commands to execute, placeholders resolved
    #[serde(default)]
    pub run: Vec<String>,

    /// Resolved task environment
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Resolved `global` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Global {
    /// Variables exported for every substitution and child process
    #[serde(default)]
    pub environment: BTreeMap<String, String>,

    /// Lifecycle hooks
    #[serde(default)]
    pub events: Events,
}

/// Lifecycle hook command lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Events {
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub before_each_run: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub after_each_run: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub before_each_task: Vec<String>,

    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub after_each_task: Vec<String>,
}

/// The `global` section as written
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGlobal {
    /// Unresolved variables, in document order
    #[serde(default)]
    pub environment: Mapping,

    #[serde(default)]
    pub events: Events,
}

/// A task as written
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawTask {
    /// File patterns, before substitution and expansion
    #[serde(default, deserialize_with = "deserialize_string_list")]
    pub files: Vec<String>,

    /// Commands, before `{FILES}` interpolation and substitution
    #[serde(deserialize_with = "deserialize_string_list")]
    pub run: Vec<String>,

    /// Unresolved variables, in document order
    #[serde(default)]
    pub env: Mapping,
}

/// Render a scalar YAML value as an environment string
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Custom deserializer for lists that also accept a single string
fn deserialize_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;

    match value {
        // Single string
        Value::String(s) => Ok(vec![s]),
        Value::Sequence(seq) => {
            let mut items = Vec::new();
            for item in seq {
                match scalar_to_string(&item) {
                    Some(s) if !matches!(item, Value::Null) => items.push(s),
                    _ => return Err(D::Error::custom("list entries must be strings")),
                }
            }
            Ok(items)
        }
        // Null or not present
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("expected a string or a list of strings")),
    }
}
