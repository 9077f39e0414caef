//! Core agent loop implementation.

use std::sync::Arc;

use serde_json::Value;

use crate::config::AgentLimits;
use crate::llm::{ChatMessage, LlmClient};
use crate::tools::{parse_tool_call, ToolSpec};

use super::{AgentBehavior, Dispatch, TaskResult};

/// An LLM-driven agent with a text-encoded tool loop.
///
/// The behaviour supplies tools, prompt and tool execution; the loop itself
/// is shared by every agent.
pub struct Agent<B> {
    behavior: B,
    llm: Arc<dyn LlmClient>,
    limits: AgentLimits,
    tools: Vec<ToolSpec>,
    tools_description: String,
    initialized: bool,
    conversation: Vec<ChatMessage>,
    last_tool_result: String,
}

impl<B: AgentBehavior> Agent<B> {
    pub fn new(behavior: B, llm: Arc<dyn LlmClient>, limits: AgentLimits) -> Self {
        Self {
            behavior,
            llm,
            limits,
            tools: Vec::new(),
            tools_description: String::new(),
            initialized: false,
            conversation: Vec::new(),
            last_tool_result: String::new(),
        }
    }

    pub fn behavior(&self) -> &B {
        &self.behavior
    }

    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    pub fn tools(&self) -> &[ToolSpec] {
        &self.tools
    }

    pub fn tools_description(&self) -> &str {
        &self.tools_description
    }

    pub fn conversation(&self) -> &[ChatMessage] {
        &self.conversation
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Output of the most recent tool execution, as fed back to the model.
    pub fn last_tool_result(&self) -> &str {
        &self.last_tool_result
    }

    /// Collect tools and build the tools description. No-op once initialized.
    pub async fn initialize(&mut self) -> anyhow::Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.behavior.on_initialize().await?;
        self.tools = self.behavior.tools().await;
        self.tools_description = self
            .tools
            .iter()
            .map(ToolSpec::format_for_llm)
            .collect::<Vec<_>>()
            .join("\n");
        self.initialized = true;
        tracing::debug!(
            agent = self.behavior.name(),
            tools = self.tools.len(),
            "Agent initialized"
        );
        Ok(())
    }

    fn system_prompt(&self) -> String {
        self.behavior.system_prompt(&self.tools_description)
    }

    /// Execute the tool call in `reply`, if it is one.
    pub async fn dispatch(&mut self, reply: &str) -> Dispatch {
        let Some(call) = parse_tool_call(reply) else {
            return Dispatch::Reply;
        };

        if !self.tools.iter().any(|t| t.name == call.tool) {
            tracing::warn!(agent = self.behavior.name(), "Unknown tool: {}", call.tool);
            return Dispatch::ToolResult(format!("Unknown tool: {}", call.tool));
        }

        let result = match self.run_tool(&call.tool, call.arguments).await {
            Ok(output) => format!("Tool execution result: {}", output),
            Err(e) => {
                tracing::error!(agent = self.behavior.name(), "Error executing tool: {:#}", e);
                format!("Error executing tool: {}", e)
            }
        };
        self.last_tool_result = result.clone();
        Dispatch::ToolResult(result)
    }

    async fn run_tool(&mut self, name: &str, arguments: Value) -> anyhow::Result<String> {
        tracing::info!(agent = self.behavior.name(), "Calling tool: {} with args: {}", name, arguments);
        self.behavior.execute_tool(name, arguments).await
    }

    /// Multi-turn exchange: the input and every reply stay in the conversation.
    pub async fn process_message(&mut self, input: &str) -> anyhow::Result<String> {
        self.initialize().await?;
        tracing::info!(agent = self.behavior.name(), "Processing user input: {}", input);

        self.conversation.push(ChatMessage::user(input));
        let mut response = self.llm.complete(&self.system_prompt(), &self.conversation).await?;
        self.conversation.push(ChatMessage::assistant(response.clone()));
        tracing::debug!("Got LLM response: {}", response);

        let max_iterations = self.limits.max_tool_iterations;
        let mut iteration = 0;
        while iteration < max_iterations {
            let Dispatch::ToolResult(result) = self.dispatch(&response).await else {
                break;
            };
            iteration += 1;
            tracing::debug!("Tool iteration {}: processing tool result", iteration);

            let messages = self.llm.append_tool_response(&result, &self.conversation);
            response = self.llm.complete(&self.system_prompt(), &messages).await?;
            self.conversation.push(ChatMessage::assistant(response.clone()));
        }

        if iteration >= max_iterations {
            tracing::warn!("Reached maximum tool iterations ({})", max_iterations);
        }
        Ok(response)
    }

    /// Single-turn task: each round only sees the request, the last tool
    /// call and its (truncated) result.
    pub async fn process_task(&mut self, request: &str) -> anyhow::Result<TaskResult> {
        self.initialize().await?;
        tracing::info!(agent = self.behavior.name(), "Processing single-turn task: {}", request);

        let system = self.system_prompt();
        let opening = [ChatMessage::user(request)];
        let mut response = self.llm.complete(&system, &opening).await?;

        let max_iterations = self.limits.max_tool_iterations;
        let mut iteration = 0;
        let mut context = String::new();
        while iteration < max_iterations {
            let Dispatch::ToolResult(result) = self.dispatch(&response).await else {
                break;
            };
            iteration += 1;

            let truncated: String = result.chars().take(self.limits.tool_result_limit).collect();
            let exchange = [ChatMessage::user(request), ChatMessage::assistant(response)];
            let messages = self.llm.append_tool_response(&truncated, &exchange);
            context = result;
            response = self.llm.complete(&system, &messages).await?;
        }

        if iteration >= max_iterations {
            tracing::warn!("Reached maximum tool iterations ({})", max_iterations);
        }
        Ok(TaskResult { response, context })
    }

    pub fn reset_conversation(&mut self) {
        self.conversation.clear();
    }

    /// Release behaviour resources and forget tools and history.
    pub async fn cleanup(&mut self) -> anyhow::Result<()> {
        let outcome = self.behavior.on_cleanup().await;
        self.initialized = false;
        self.conversation.clear();
        self.tools.clear();
        self.tools_description.clear();
        outcome
    }
}
