//! Task planning: clarifying questions, answer statements, and step plans.
//!
//! Every agent call is bounded by the command timeout. Failures are logged
//! and reported as "nothing found" rather than propagated, so an interactive
//! front end can simply carry on.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::agent::{
    Agent, AnswerHandlingAgent, AnswerHandlingBehavior, MissingInfoAgent, MissingInfoBehavior,
    StepPlannerAgent, StepPlannerBehavior,
};
use crate::config::AgentLimits;
use crate::llm::LlmClient;
use crate::tasks::{steps_from_value, AutomationTask};
use crate::tools::strip_code_fence;

pub struct TaskPlanner {
    missing_info: MissingInfoAgent,
    answer: AnswerHandlingAgent,
    step_planner: StepPlannerAgent,
    questions: Vec<String>,
    possible_answers: Vec<String>,
    reason: String,
    timeout: Duration,
}

/// Run an agent call under `timeout`, logging instead of failing.
async fn bounded<T, F>(timeout: Duration, what: &str, call: F) -> Option<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            tracing::error!("{} failed: {:#}", what, e);
            None
        }
        Err(_) => {
            tracing::error!("{} timed out after {:?}", what, timeout);
            None
        }
    }
}

fn parse_json(reply: &str) -> Option<Value> {
    match serde_json::from_str(strip_code_fence(reply.trim())) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!("JSON decode error: {}", e);
            None
        }
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl TaskPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, limits: AgentLimits, timeout: Duration) -> Self {
        Self {
            missing_info: Agent::new(MissingInfoBehavior, llm.clone(), limits),
            answer: Agent::new(AnswerHandlingBehavior::default(), llm.clone(), limits),
            step_planner: Agent::new(StepPlannerBehavior::default(), llm, limits),
            questions: Vec::new(),
            possible_answers: Vec::new(),
            reason: String::new(),
            timeout,
        }
    }

    /// Forget previous questions and the question agent's history.
    pub fn start_conversation(&mut self) {
        self.questions.clear();
        self.possible_answers.clear();
        self.reason.clear();
        self.missing_info.reset_conversation();
    }

    pub fn is_empty_response(response: &str) -> bool {
        let trimmed = response.trim();
        trimmed.is_empty() || trimmed == "[]"
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// Ask whether `description` leaves anything open.
    ///
    /// Returns true and records the first question when the agent produced
    /// a usable one.
    pub async fn check_for_missing_information(&mut self, description: &str) -> bool {
        tracing::info!("Processing task description: {}", description);
        let timeout = self.timeout;
        let Some(response) = bounded(
            timeout,
            "MissingInfoAgent",
            self.missing_info.process_message(description),
        )
        .await
        else {
            return false;
        };

        if Self::is_empty_response(&response) {
            return false;
        }

        let Some(data) = parse_json(&response) else {
            return false;
        };
        let Some(first) = data.as_array().and_then(|items| items.first()) else {
            tracing::error!("Invalid response format: {}", response);
            return false;
        };
        let (Some(question), Some(possible_answers)) =
            (first.get("question"), first.get("possible_answers"))
        else {
            tracing::error!("Invalid response format: {}", response);
            return false;
        };

        self.questions.push(value_to_text(question));
        self.possible_answers = possible_answers
            .as_array()
            .map(|items| items.iter().map(value_to_text).collect())
            .unwrap_or_default();
        self.reason = first
            .get("reason")
            .map(value_to_text)
            .unwrap_or_default();
        true
    }

    /// Turn `answer` to the last question into a statement.
    pub async fn process_answer(&mut self, answer: &str) -> String {
        let Some(question) = self.questions.last().cloned() else {
            tracing::error!("No question to process");
            return String::new();
        };

        tracing::info!("Processing answer for question: {}", question);
        self.answer
            .behavior_mut()
            .set_question_and_answer(question, answer);
        self.answer.reset_conversation();
        let timeout = self.timeout;
        bounded(timeout, "AnswerHandlingAgent", self.answer.process_message("?"))
            .await
            .unwrap_or_default()
    }

    /// Text shown to the user for the last question.
    pub fn prepare_question(&self) -> String {
        let mut text = format!(
            "Question: {}",
            self.questions.last().map(String::as_str).unwrap_or_default()
        );
        if !self.possible_answers.is_empty() {
            text.push_str(&format!(
                "\nPossible answers: {}",
                self.possible_answers.join(", ")
            ));
        }
        if !self.reason.is_empty() {
            text.push_str(&format!("\nReason: {}", self.reason));
        }
        text
    }

    /// Ask the step planner for a plan and wrap it in a task.
    pub async fn prepare_plan(
        &mut self,
        id: &str,
        name: &str,
        description: &str,
    ) -> Option<AutomationTask> {
        if description.is_empty() {
            tracing::error!("Task description is empty");
            return None;
        }

        tracing::info!("Preparing plan for task description: {}", description);
        self.step_planner
            .behavior_mut()
            .set_task_description(description);
        self.step_planner.reset_conversation();
        let timeout = self.timeout;
        let reply = bounded(timeout, "StepPlannerAgent", self.step_planner.process_message("?")).await?;

        let value = parse_json(&reply)?;
        let Some(steps) = steps_from_value(&value) else {
            tracing::error!("Plan is not a JSON array: {}", reply);
            return None;
        };
        tracing::info!("Plan prepared for {} with {} steps", id, steps.len());
        Some(AutomationTask::new(id, name, Some(description.to_string())).with_steps(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::llm::LlmError;

    fn planner(llm: &Arc<ScriptedLlm>) -> TaskPlanner {
        TaskPlanner::new(llm.clone(), AgentLimits::default(), Duration::from_secs(5))
    }

    #[test]
    fn empty_responses() {
        assert!(TaskPlanner::is_empty_response(""));
        assert!(TaskPlanner::is_empty_response("   "));
        assert!(TaskPlanner::is_empty_response(" [] "));
        assert!(!TaskPlanner::is_empty_response("[{}]"));
    }

    #[tokio::test]
    async fn records_first_question() {
        let llm = Arc::new(ScriptedLlm::new([r#"[
            {"question": "Which account?", "possible_answers": ["work", "personal"], "reason": "Two accounts exist."},
            {"question": "Ignored?", "possible_answers": []}
        ]"#]));
        let mut planner = planner(&llm);

        assert!(planner.check_for_missing_information("Sign in to GitHub").await);
        assert_eq!(planner.questions(), ["Which account?".to_string()]);
        assert_eq!(
            planner.prepare_question(),
            "Question: Which account?\nPossible answers: work, personal\nReason: Two accounts exist."
        );
    }

    #[tokio::test]
    async fn question_without_answers_or_reason() {
        let llm = Arc::new(ScriptedLlm::new([
            "```json\n[{\"question\": \"Which repo?\", \"possible_answers\": []}]\n```",
        ]));
        let mut planner = planner(&llm);
        assert!(planner.check_for_missing_information("Star a repo").await);
        assert_eq!(planner.prepare_question(), "Question: Which repo?");
    }

    #[tokio::test]
    async fn unusable_replies_mean_no_question() {
        let llm = Arc::new(ScriptedLlm::new([
            "[]",
            "I need more details",
            r#"[{"question": "Which repo?"}]"#,
            "{}",
        ]));
        let mut planner = planner(&llm);
        for _ in 0..4 {
            assert!(!planner.check_for_missing_information("Star a repo").await);
        }
        llm.push_error(LlmError::InvalidResponse("boom".to_string()));
        assert!(!planner.check_for_missing_information("Star a repo").await);
        assert!(planner.questions().is_empty());
    }

    #[tokio::test]
    async fn start_conversation_resets_history() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"[{"question": "Which repo?", "possible_answers": []}]"#,
            "[]",
        ]));
        let mut planner = planner(&llm);
        assert!(planner.check_for_missing_information("Star a repo").await);
        planner.start_conversation();
        assert!(planner.questions().is_empty());

        assert!(!planner.check_for_missing_information("Star tokio").await);
        let (_, messages) = llm.request(1);
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn answers_become_statements() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"[{"question": "Which repo?", "possible_answers": ["tokio", "axum"]}]"#,
            "The repository is tokio.",
        ]));
        let mut planner = planner(&llm);

        assert_eq!(planner.process_answer("tokio").await, "");
        assert_eq!(llm.request_count(), 0);

        planner.check_for_missing_information("Star a repo").await;
        assert_eq!(planner.process_answer("tokio").await, "The repository is tokio.");
        let (system, messages) = llm.request(1);
        assert!(system.contains("question 'Which repo?' and answer 'tokio'"));
        assert_eq!(messages[0].content, "?");
    }

    #[tokio::test]
    async fn plans_become_tasks() {
        let llm = Arc::new(ScriptedLlm::new([
            r#"[{"step_description": "Open", "action": "Navigate to https://github.com", "validation_action": "Logo visible"}]"#,
            "Sorry, I cannot plan that.",
        ]));
        let mut planner = planner(&llm);

        assert!(planner.prepare_plan("1", "Open GitHub", "").await.is_none());

        let task = planner
            .prepare_plan("1", "Open GitHub", "Open github.com")
            .await
            .expect("plan");
        assert_eq!(task.description.as_deref(), Some("Open github.com"));
        assert_eq!(task.steps.len(), 1);
        assert_eq!(task.steps[0].action, "Navigate to https://github.com");

        assert!(planner.prepare_plan("2", "Other", "Do something").await.is_none());
        let (system, messages) = llm.request(1);
        assert!(system.contains("TASK DESCRIPTION:\nDo something"));
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn slow_agent_times_out() {
        struct Slow;

        #[async_trait::async_trait]
        impl LlmClient for Slow {
            async fn complete(
                &self,
                _system: &str,
                _messages: &[crate::llm::ChatMessage],
            ) -> Result<String, LlmError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("[]".to_string())
            }
        }

        let mut planner = TaskPlanner::new(Arc::new(Slow), AgentLimits::default(), Duration::from_millis(50));
        assert!(!planner.check_for_missing_information("Star a repo").await);
    }
}
