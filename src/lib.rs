//! # Browser Pilot
//!
//! Natural-language web browser automation backed by an LLM and MCP tool
//! servers.
//!
//! This library provides:
//! - A client for MCP servers speaking JSON-RPC over stdio
//! - A family of agents that plan, navigate and analyze pages
//! - A task planner that turns descriptions into stored step plans
//! - An HTTP API for commands, tasks and runs
//!
//! ## Architecture
//!
//! Every agent follows the "tools in a loop" pattern:
//! 1. Build a system prompt listing the available tools
//! 2. Call the LLM with the conversation so far
//! 3. If the reply is a JSON tool call, execute it and feed the result back
//! 4. Otherwise the reply is the answer
//!
//! The conversation agent exposes two tools, `browse_web` and
//! `analyze_page`, which delegate to the navigation and page analysis
//! agents. The navigation agent exposes the tools of every configured MCP
//! server.
//!
//! ## Example
//!
//! ```rust,ignore
//! use browser_pilot::{agent::*, config::Config, llm, mcp::McpServer};
//!
//! let mut config = Config::from_env()?;
//! let servers = config.load_servers()?;
//! let llm = llm::build_client(&config.llm, None)?;
//! let servers = servers
//!     .mcp_servers
//!     .into_iter()
//!     .map(|(name, cfg)| Arc::new(McpServer::new(name, cfg)))
//!     .collect();
//! let navigation = Agent::new(NavigationBehavior::new(servers), llm.clone(), config.limits);
//! let page = Agent::new(PageAnalysisBehavior::default(), llm.clone(), config.limits);
//! let mut agent = Agent::new(ConversationBehavior::new(navigation, page), llm, config.limits);
//! agent.initialize().await?;
//! let reply = agent.process_message("Open github.com and tell me the headline").await?;
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod llm;
pub mod mcp;
pub mod planner;
pub mod runner;
pub mod tasks;
pub mod tools;

pub use config::Config;
