pub mod builder;

use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

/// Flow as written in a YAML definition file.
///
/// ```yaml
/// id: nightly
/// tasks:
///   - name: extract
///     fn: echo
///     retries: 3
///     retry_delay: 30s
///   - name: load
///     after: [extract]
///     trigger: all_success
/// edges:
///   - before: extract
///     after: report
/// ```
///
/// Scalar task fields are kept as raw values so that the compiler can report
/// badly typed input instead of failing inside the YAML parser.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FlowDefinition {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub edges: Vec<EdgeDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TaskDefinition {
    /// Must be a string; defaults to the handler name.
    #[serde(default)]
    pub name: Option<Value>,
    /// Registered handler name.
    #[serde(default, rename = "fn")]
    pub handler: Option<String>,
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
    /// Integer, `-1` for unlimited.
    #[serde(default)]
    pub retries: Option<Value>,
    /// Duration string such as `"30s"` or `"5m"`.
    #[serde(default)]
    pub retry_delay: Option<Value>,
    #[serde(default)]
    pub trigger: Option<String>,
    /// Names of tasks this one runs after.
    #[serde(default)]
    pub after: Vec<String>,
}

/// Relationship between two tasks, by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeDefinition {
    pub before: String,
    pub after: String,
}
