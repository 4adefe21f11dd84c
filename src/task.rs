use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::TaskError;

/// A unit of work handed to an executor.
///
/// `task_type` and `description` are hints. `parameters` may already carry
/// normalized fields produced by an upstream planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    #[serde(rename = "type", default)]
    pub task_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl Task {
    pub fn new(task_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            description: description.into(),
            parameters: Map::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// String parameter, ignoring blanks.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn param_u64(&self, key: &str) -> Option<u64> {
        match self.parameters.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.task_type.trim().is_empty()
            && self.description.trim().is_empty()
            && self.parameters.is_empty()
    }
}

/// The resolved operation category for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    List,
    Create,
    Delete,
    Update,
    Unknown,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::List => write!(f, "list"),
            Intent::Create => write!(f, "create"),
            Intent::Delete => write!(f, "delete"),
            Intent::Update => write!(f, "update"),
            Intent::Unknown => write!(f, "unknown"),
        }
    }
}

/// Uniform result returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub success: bool,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mock_data: Option<bool>,
}

impl ResultEnvelope {
    pub fn success(content: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            content: content.into(),
            error: None,
            data,
            mock_data: None,
        }
    }

    pub fn mock(content: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            content: content.into(),
            error: None,
            data,
            mock_data: Some(true),
        }
    }

    pub fn failure(content: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: content.into(),
            error: Some(error.into()),
            data: None,
            mock_data: None,
        }
    }

    pub fn is_mock(&self) -> bool {
        self.mock_data.unwrap_or(false)
    }
}

impl From<TaskError> for ResultEnvelope {
    fn from(err: TaskError) -> Self {
        ResultEnvelope::failure(err.remediation(), err.to_string())
    }
}
