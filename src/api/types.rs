//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::runner::RunReport;
use crate::tasks::RunRecord;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// A free-form browser command for the conversation agent.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandResponse {
    pub response: String,
}

/// Request to plan and store a new task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub name: String,
    pub description: String,
}

/// Outcome of running a stored task.
#[derive(Debug, Clone, Serialize)]
pub struct RunTaskResponse {
    pub run: RunRecord,
    pub report: RunReport,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionRequest {
    pub description: String,

    /// Drop earlier questions before asking
    #[serde(default)]
    pub new_conversation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionResponse {
    pub has_question: bool,
    /// Question text for the user; empty when nothing is missing
    pub prompt: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRequest {
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerResponse {
    pub statement: String,
}
