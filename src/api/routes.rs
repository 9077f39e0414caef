//! HTTP routes and shared application state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::types::*;
use crate::agent::ConversationAgent;
use crate::planner::TaskPlanner;
use crate::runner::TaskRunner;
use crate::tasks::{AutomationTask, RunRecord, RunTracker, TaskStorage};

/// State shared by every handler.
///
/// Agents keep conversation state, so each one is used by a single request
/// at a time.
pub struct AppState {
    pub agent: Mutex<ConversationAgent>,
    pub planner: Mutex<TaskPlanner>,
    pub storage: TaskStorage,
    pub tracker: RunTracker,
    pub runner: TaskRunner,
    pub command_timeout: Duration,
}

impl AppState {
    pub fn new(
        agent: ConversationAgent,
        planner: TaskPlanner,
        storage: TaskStorage,
        command_timeout: Duration,
    ) -> Self {
        Self {
            agent: Mutex::new(agent),
            planner: Mutex::new(planner),
            storage,
            tracker: RunTracker::new(),
            runner: TaskRunner::new(command_timeout),
            command_timeout,
        }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/command", post(run_command))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/:id/run", post(run_task))
        .route("/api/runs", get(list_runs))
        .route("/api/planner/questions", post(ask_question))
        .route("/api/planner/answers", post(submit_answer))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until `shutdown` resolves.
pub async fn serve<F>(state: Arc<AppState>, addr: &str, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Send one command to the conversation agent.
pub async fn run_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> ApiResult<CommandResponse> {
    let command = req.command.trim();
    if command.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Please enter a command".to_string()));
    }

    let mut agent = state.agent.lock().await;
    match tokio::time::timeout(state.command_timeout, agent.process_message(command)).await {
        Ok(Ok(response)) => Ok(Json(CommandResponse { response })),
        Ok(Err(e)) => {
            tracing::error!("Error in process_message: {:#}", e);
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
        Err(_) => Err((
            StatusCode::GATEWAY_TIMEOUT,
            format!("Command timed out, command: {}", command),
        )),
    }
}

pub async fn list_tasks(State(state): State<Arc<AppState>>) -> Json<Vec<AutomationTask>> {
    Json(state.storage.list_tasks().await)
}

/// Plan a task from its description and store it.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<AutomationTask> {
    let id = Uuid::new_v4().to_string();
    let task = state
        .planner
        .lock()
        .await
        .prepare_plan(&id, &req.name, req.description.trim())
        .await
        .ok_or_else(|| {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Failed to prepare plan".to_string(),
            )
        })?;

    state
        .storage
        .add_task(task.clone())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    tracing::info!(task_id = %task.id, steps = task.steps.len(), "Task stored");
    Ok(Json(task))
}

/// Replay a stored plan through the conversation agent.
pub async fn run_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<RunTaskResponse> {
    let task = state
        .storage
        .get_task(&id)
        .await
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Task not found: {}", id)))?;

    let run = state.tracker.add(task.name.clone(), "api").await;
    let report = {
        let mut agent = state.agent.lock().await;
        state.runner.run(&mut *agent, &task).await
    };

    let summary = report.summary();
    let finished = if report.succeeded() {
        state.tracker.complete(run.id, summary).await
    } else {
        state.tracker.fail(run.id, summary).await
    };
    Ok(Json(RunTaskResponse {
        run: finished.unwrap_or(run),
        report,
    }))
}

pub async fn list_runs(State(state): State<Arc<AppState>>) -> Json<Vec<RunRecord>> {
    Json(state.tracker.list().await)
}

pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuestionRequest>,
) -> ApiResult<QuestionResponse> {
    if req.description.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please enter a task description".to_string(),
        ));
    }

    let mut planner = state.planner.lock().await;
    if req.new_conversation {
        planner.start_conversation();
    }
    let has_question = planner.check_for_missing_information(&req.description).await;
    let prompt = if has_question {
        planner.prepare_question()
    } else {
        String::new()
    };
    Ok(Json(QuestionResponse {
        has_question,
        prompt,
    }))
}

pub async fn submit_answer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnswerRequest>,
) -> ApiResult<AnswerResponse> {
    let statement = state.planner.lock().await.process_answer(&req.answer).await;
    Ok(Json(AnswerResponse { statement }))
}
