//! Answers questions about the current page from a captured snapshot.

use async_trait::async_trait;
use serde_json::Value;

use super::prompt::page_analysis_prompt;
use super::{Agent, AgentBehavior};
use crate::tools::ToolSpec;

pub type PageAnalysisAgent = Agent<PageAnalysisBehavior>;

#[derive(Debug, Default)]
pub struct PageAnalysisBehavior {
    page_context: String,
}

impl PageAnalysisBehavior {
    pub fn set_page_context(&mut self, page_context: impl Into<String>) {
        self.page_context = page_context.into();
    }

    pub fn page_context(&self) -> &str {
        &self.page_context
    }
}

#[async_trait]
impl AgentBehavior for PageAnalysisBehavior {
    fn name(&self) -> &str {
        "PageAnalysisAgent"
    }

    async fn tools(&mut self) -> Vec<ToolSpec> {
        Vec::new()
    }

    async fn execute_tool(&mut self, _name: &str, _arguments: Value) -> anyhow::Result<String> {
        anyhow::bail!("PageAnalysisAgent does not support tool execution directly.")
    }

    fn system_prompt(&self, _tools_description: &str) -> String {
        page_analysis_prompt(&self.page_context)
    }
}
