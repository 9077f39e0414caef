//! Browser Pilot - HTTP Server Entry Point
//!
//! Connects the configured MCP servers, wires up the agents and serves the
//! API until interrupted.

use std::sync::Arc;

use browser_pilot::{
    agent::{Agent, ConversationBehavior, NavigationBehavior, PageAnalysisBehavior},
    api::{self, AppState},
    config::Config,
    llm,
    mcp::McpServer,
    planner::TaskPlanner,
    tasks::TaskStorage,
};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "browser_pilot=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = Config::from_env()?;
    let servers_file = config.load_servers()?;
    config.require_api_key()?;
    info!(
        "Loaded configuration: provider={:?} model={} servers={}",
        config.llm.provider,
        config.llm.model,
        servers_file.mcp_servers.len()
    );

    let llm = llm::build_client(&config.llm, config.bad_request_dump.clone())?;

    let servers: Vec<Arc<McpServer>> = servers_file
        .mcp_servers
        .into_iter()
        .map(|(name, server)| Arc::new(McpServer::new(name, server)))
        .collect();

    let navigation = Agent::new(
        NavigationBehavior::new(servers.clone()),
        llm.clone(),
        config.limits,
    );
    let page_analysis = Agent::new(PageAnalysisBehavior::default(), llm.clone(), config.limits);
    let mut agent = Agent::new(
        ConversationBehavior::new(navigation, page_analysis),
        llm.clone(),
        config.limits,
    );
    if let Err(e) = agent.initialize().await {
        warn!("Agent initialization failed, continuing without tools: {:#}", e);
    }

    let planner = TaskPlanner::new(llm, config.limits, config.command_timeout);
    let storage = TaskStorage::new(&config.tasks_path);
    storage.initialize().await;

    let state = Arc::new(AppState::new(agent, planner, storage, config.command_timeout));

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting server on {}", addr);
    api::serve(state.clone(), &addr, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutting down");
    })
    .await?;

    if let Err(e) = state.agent.lock().await.cleanup().await {
        warn!("Agent cleanup failed: {:#}", e);
    }
    for server in &servers {
        server.cleanup().await;
    }

    Ok(())
}
