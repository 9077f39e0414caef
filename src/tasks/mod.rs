//! Automation tasks: planned step lists, their storage, and run tracking.

mod storage;
mod tracker;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use storage::{StorageError, TaskStorage};
pub use tracker::{RunRecord, RunStatus, RunTracker};

/// One step of a plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlanStep {
    pub step_description: String,
    pub action: String,
    pub validation_action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_handling: Option<String>,
}

/// A named browser task with its plan.
///
/// Decoding is lenient: missing fields take their defaults so task files
/// written by older versions still load.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutomationTask {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<PlanStep>,
}

impl AutomationTask {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description,
            steps: Vec::new(),
        }
    }

    pub fn with_steps(mut self, steps: Vec<PlanStep>) -> Self {
        self.steps = steps;
        self
    }
}

/// Decode plan steps from a planner reply value.
///
/// Returns `None` unless `value` is an array. Elements that are not objects
/// are skipped; missing fields default.
pub fn steps_from_value(value: &Value) -> Option<Vec<PlanStep>> {
    let items = value.as_array()?;
    Some(
        items
            .iter()
            .filter(|item| item.is_object())
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
    )
}
