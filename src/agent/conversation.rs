//! Top-level agent: routes user requests to navigation or page analysis.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::prompt::conversation_prompt;
use super::{Agent, AgentBehavior, NavigationAgent, PageAnalysisAgent};
use crate::tools::ToolSpec;

pub type ConversationAgent = Agent<ConversationBehavior>;

pub struct ConversationBehavior {
    navigation: NavigationAgent,
    page_analysis: PageAnalysisAgent,
}

impl ConversationBehavior {
    pub fn new(navigation: NavigationAgent, page_analysis: PageAnalysisAgent) -> Self {
        Self {
            navigation,
            page_analysis,
        }
    }

    pub fn navigation(&self) -> &NavigationAgent {
        &self.navigation
    }

    pub fn page_analysis(&self) -> &PageAnalysisAgent {
        &self.page_analysis
    }

    async fn browse_web(&mut self, action: &str) -> anyhow::Result<String> {
        self.navigation.reset_conversation();
        self.navigation.process_message(action).await
    }

    async fn analyze_page(&mut self, analysis_type: &str) -> anyhow::Result<String> {
        let context = self.navigation.last_tool_result().to_string();
        self.page_analysis.behavior_mut().set_page_context(context);
        self.page_analysis.reset_conversation();
        self.page_analysis.process_message(analysis_type).await
    }
}

fn string_arg<'a>(arguments: &'a Value, key: &str) -> &'a str {
    arguments.get(key).and_then(Value::as_str).unwrap_or_default()
}

#[async_trait]
impl AgentBehavior for ConversationBehavior {
    fn name(&self) -> &str {
        "ConversationAgent"
    }

    async fn tools(&mut self) -> Vec<ToolSpec> {
        vec![
            ToolSpec::new(
                "browse_web",
                "Navigate to a new page or perform actions like clicking on the current page.",
                json!({
                    "properties": {
                        "action": {
                            "type": "string",
                            "description": "The action to perform, e.g., 'navigate to github.com' or 'click on sign in link'."
                        }
                    },
                    "required": ["action"]
                }),
            ),
            ToolSpec::new(
                "analyze_page",
                "Analyze the current page and find IDs of page elements.",
                json!({
                    "properties": {
                        "analysis_type": {
                            "type": "string",
                            "description": "Type of analysis to perform, e.g., 'find element IDs' or 'inspect page structure'."
                        }
                    },
                    "required": ["analysis_type"]
                }),
            ),
        ]
    }

    async fn execute_tool(&mut self, name: &str, arguments: Value) -> anyhow::Result<String> {
        match name {
            "browse_web" => self.browse_web(string_arg(&arguments, "action")).await,
            "analyze_page" => {
                self.analyze_page(string_arg(&arguments, "analysis_type"))
                    .await
            }
            other => anyhow::bail!("Unknown tool: {}", other),
        }
    }

    fn system_prompt(&self, tools_description: &str) -> String {
        conversation_prompt(tools_description)
    }

    async fn on_cleanup(&mut self) -> anyhow::Result<()> {
        let navigation = self.navigation.cleanup().await;
        let page_analysis = self.page_analysis.cleanup().await;
        navigation.and(page_analysis)
    }
}
