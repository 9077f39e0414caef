//! Agent module - LLM agents driving the browser and planning tasks.
//!
//! Every agent follows the "tools in a loop" pattern:
//! 1. Build the system prompt from the agent's tools
//! 2. Ask the LLM
//! 3. If the reply is a tool call, execute it and feed the result back
//! 4. Repeat until the LLM replies in plain text or the iteration cap is hit
//!
//! The loop lives in [`Agent`]; what differs between agents (tools, prompt,
//! how a tool runs) is an [`AgentBehavior`].

mod agent_loop;
mod conversation;
mod navigation;
mod page_analysis;
mod planning;
mod prompt;

use async_trait::async_trait;
use serde_json::Value;

use crate::tools::ToolSpec;

pub use agent_loop::Agent;
pub use conversation::{ConversationAgent, ConversationBehavior};
pub use navigation::{NavigationAgent, NavigationBehavior};
pub use page_analysis::{PageAnalysisAgent, PageAnalysisBehavior};
pub use planning::{
    AnswerHandlingAgent, AnswerHandlingBehavior, MissingInfoAgent, MissingInfoBehavior,
    StepPlannerAgent, StepPlannerBehavior,
};

/// The agent-specific half of an [`Agent`].
#[async_trait]
pub trait AgentBehavior: Send {
    fn name(&self) -> &str;

    /// Tools offered to the model. Called once per initialization.
    async fn tools(&mut self) -> Vec<ToolSpec>;

    async fn execute_tool(&mut self, name: &str, arguments: Value) -> anyhow::Result<String>;

    fn system_prompt(&self, tools_description: &str) -> String;

    async fn on_initialize(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn on_cleanup(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// What to do with an LLM reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Plain text, the turn is over
    Reply,
    /// A tool ran; this text goes back to the model
    ToolResult(String),
}

/// Outcome of [`Agent::process_task`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskResult {
    pub response: String,
    /// Last tool result, untruncated (empty when no tool ran)
    pub context: String,
}
