//! Wiring of the agent loop from configuration.

use agentic_core::{AgentConfig, CycleController, ExecutionDispatcher, ToolRegistry};
use agentic_providers::{provider_from_config, ModelClient};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;

/// The configured model client, shared by the loop and the validators
pub fn build_model_client(config: &AgentConfig) -> anyhow::Result<Arc<ModelClient>> {
    let provider = provider_from_config(&config.models)
        .with_context(|| format!("failed to set up {} provider", config.models.provider))?;
    let client = ModelClient::new(
        provider,
        &config.models.vision_model,
        &config.models.reasoning_model,
    )
    .with_temperature(config.models.temperature)
    .with_registry(ToolRegistry::default());
    Ok(Arc::new(client))
}

/// A cycle controller driven by `client`, with the configured automation
/// backend and memory store
pub fn build_controller(
    config: &AgentConfig,
    client: Arc<ModelClient>,
) -> anyhow::Result<CycleController> {
    let factory = agentic_automation::create_factory(&config.automation);
    let dispatcher = ExecutionDispatcher::new(factory).with_action_delay(config.action_delay());

    let mut controller = CycleController::new(
        client.clone(),
        client,
        agentic_automation::default_capturer(),
        dispatcher,
    )
    .with_cycle_delay(config.cycle_delay());

    if let Some(store) =
        agentic_memory::create_store(&config.memory).context("failed to open memory store")?
    {
        info!("Long-term memory enabled ({:?})", config.memory.backend);
        controller = controller.with_memory(store);
    }

    Ok(controller)
}
