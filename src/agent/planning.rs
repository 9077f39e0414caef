//! Tool-less agents used while planning a task.

use async_trait::async_trait;
use serde_json::Value;

use super::prompt::{answer_prompt, step_planner_prompt, MISSING_INFO_PROMPT};
use super::{Agent, AgentBehavior};
use crate::tools::ToolSpec;

pub type MissingInfoAgent = Agent<MissingInfoBehavior>;
pub type AnswerHandlingAgent = Agent<AnswerHandlingBehavior>;
pub type StepPlannerAgent = Agent<StepPlannerBehavior>;

/// Lists the questions a task description leaves open, as a JSON array.
#[derive(Debug, Default)]
pub struct MissingInfoBehavior;

#[async_trait]
impl AgentBehavior for MissingInfoBehavior {
    fn name(&self) -> &str {
        "MissingInfoAgent"
    }

    async fn tools(&mut self) -> Vec<ToolSpec> {
        Vec::new()
    }

    async fn execute_tool(&mut self, _name: &str, _arguments: Value) -> anyhow::Result<String> {
        anyhow::bail!("MissingInfoAgent does not support tool execution directly.")
    }

    fn system_prompt(&self, _tools_description: &str) -> String {
        MISSING_INFO_PROMPT.to_string()
    }
}

/// Turns a question and its answer into one statement.
#[derive(Debug, Default)]
pub struct AnswerHandlingBehavior {
    question: String,
    answer: String,
}

impl AnswerHandlingBehavior {
    pub fn set_question_and_answer(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.question = question.into();
        self.answer = answer.into();
        tracing::debug!("Set question: {}, answer: {}", self.question, self.answer);
    }
}

#[async_trait]
impl AgentBehavior for AnswerHandlingBehavior {
    fn name(&self) -> &str {
        "AnswerHandlingAgent"
    }

    async fn tools(&mut self) -> Vec<ToolSpec> {
        Vec::new()
    }

    async fn execute_tool(&mut self, _name: &str, _arguments: Value) -> anyhow::Result<String> {
        anyhow::bail!("AnswerHandlingAgent does not support tool execution directly.")
    }

    fn system_prompt(&self, _tools_description: &str) -> String {
        answer_prompt(&self.question, &self.answer)
    }
}

/// Breaks a task description into a JSON array of plan steps.
#[derive(Debug, Default)]
pub struct StepPlannerBehavior {
    task_description: String,
}

impl StepPlannerBehavior {
    pub fn set_task_description(&mut self, task_description: impl Into<String>) {
        self.task_description = task_description.into();
        tracing::debug!("Set task description: {}", self.task_description);
    }
}

#[async_trait]
impl AgentBehavior for StepPlannerBehavior {
    fn name(&self) -> &str {
        "StepPlannerAgent"
    }

    async fn tools(&mut self) -> Vec<ToolSpec> {
        Vec::new()
    }

    async fn execute_tool(&mut self, _name: &str, _arguments: Value) -> anyhow::Result<String> {
        anyhow::bail!("StepPlannerAgent does not support tool execution directly.")
    }

    fn system_prompt(&self, _tools_description: &str) -> String {
        step_planner_prompt(&self.task_description)
    }
}
