//! # Serve Command
//!
//! Exposes the agent loop over HTTP.

use crate::agent;
use crate::server;
use crate::service::AgentService;
use agentic_core::AgentConfig;
use colored::Colorize;
use std::sync::Arc;

/// Run the serve command
pub async fn run(mut config: AgentConfig, addr: Option<String>) -> anyhow::Result<()> {
    if let Some(addr) = addr {
        config.server.addr = addr;
    }
    config.validate()?;

    let client = agent::build_model_client(&config)?;
    let controller = agent::build_controller(&config, client.clone())?;
    let mut service = AgentService::new(controller).with_validator(client);
    if let Some(ttl) = config.server.session_ttl() {
        service = service.with_session_ttl(ttl);
    }
    let service = Arc::new(service);

    println!(
        "{} http://{} ({} backend, {} models)",
        "Agent server on".bright_cyan().bold(),
        config.server.addr,
        config.automation.backend,
        config.models.provider
    );

    server::serve(service, &config.server.addr).await
}
