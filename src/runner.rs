//! Replays a planned task through an agent, one step at a time.

use std::fmt::Write as _;
use std::time::Duration;

use serde::Serialize;

use crate::agent::{Agent, AgentBehavior};
use crate::tasks::AutomationTask;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct StepOutcome {
    /// 1-based position in the plan
    pub step: usize,
    pub description: String,
    pub response: Option<String>,
    pub validation: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RunReport {
    pub task_id: String,
    pub steps: Vec<StepOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.steps.iter().all(|s| s.error.is_none())
    }

    /// Human readable summary of every step.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for outcome in &self.steps {
            let _ = writeln!(out, "Step {}: {}", outcome.step, outcome.description);
            if let Some(response) = &outcome.response {
                let _ = writeln!(out, "  Action: {}", response);
            }
            if let Some(validation) = &outcome.validation {
                let _ = writeln!(out, "  Validation: {}", validation);
            }
            if let Some(error) = &outcome.error {
                let _ = writeln!(out, "  Failed: {}", error);
            }
        }
        out.trim_end().to_string()
    }
}

pub struct TaskRunner {
    command_timeout: Duration,
}

impl TaskRunner {
    pub fn new(command_timeout: Duration) -> Self {
        Self { command_timeout }
    }

    async fn send<B: AgentBehavior>(&self, agent: &mut Agent<B>, command: &str) -> Result<String, String> {
        match tokio::time::timeout(self.command_timeout, agent.process_message(command)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("Command timed out, command: {}", command)),
        }
    }

    /// Send each step's action, then its validation, stopping at the first failure.
    pub async fn run<B: AgentBehavior>(&self, agent: &mut Agent<B>, task: &AutomationTask) -> RunReport {
        tracing::info!("Running task {} ({} steps)", task.id, task.steps.len());
        let mut report = RunReport {
            task_id: task.id.clone(),
            steps: Vec::with_capacity(task.steps.len()),
        };

        for (index, step) in task.steps.iter().enumerate() {
            let mut outcome = StepOutcome {
                step: index + 1,
                description: step.step_description.clone(),
                ..StepOutcome::default()
            };

            match self.send(agent, &step.action).await {
                Ok(response) => outcome.response = Some(response),
                Err(e) => outcome.error = Some(e),
            }

            if outcome.error.is_none() && !step.validation_action.is_empty() {
                let check = format!("Verify that: {}", step.validation_action);
                match self.send(agent, &check).await {
                    Ok(response) => outcome.validation = Some(response),
                    Err(e) => outcome.error = Some(e),
                }
            }

            let failed = outcome.error.is_some();
            report.steps.push(outcome);
            if failed {
                tracing::warn!("Task {} stopped at step {}", task.id, index + 1);
                break;
            }
        }
        report
    }
}
