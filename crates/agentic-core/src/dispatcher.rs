//! # Execution Dispatcher
//!
//! Runs a plan's actions in order against the automation session.
//!
//! The dispatcher is the only code that creates, starts or stops the
//! [`AutomationSession`] held in the session state. Sessions are started
//! lazily by the first backend tool and kept running across cycles until the
//! task finishes or an action fails.

use crate::action::{Action, Plan};
use crate::automation::{AutomationError, AutomationSession, BackendFactory};
use crate::tools::{finish_result, ToolError, ToolKind, ToolRegistry};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Reason reported for an empty plan
pub const NO_VALID_PLAN: &str = "no valid plan";

/// Errors raised while dispatching a single action
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Unknown tool '{0}'")]
    UnknownTool(String),

    #[error(transparent)]
    InvalidParameters(#[from] ToolError),

    #[error(transparent)]
    Backend(#[from] AutomationError),
}

/// Outcome of executing one plan
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// Every action succeeded
    Continuing { summary: String },
    /// The plan was empty or an action failed
    Failed { reason: String },
    /// The terminal tool ran
    Finished { result: String },
}

/// Outcome plus the history lines produced while executing
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub outcome: ExecutionOutcome,
    pub history: Vec<String>,
    /// Number of actions that completed successfully
    pub executed: usize,
}

/// Executes plans against lazily created automation sessions
pub struct ExecutionDispatcher {
    registry: ToolRegistry,
    factory: Arc<dyn BackendFactory>,
    action_delay: Duration,
}

impl ExecutionDispatcher {
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self {
            registry: ToolRegistry::default(),
            factory,
            action_delay: Duration::ZERO,
        }
    }

    /// Use a custom tool catalogue
    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Pause between consecutive actions
    pub fn with_action_delay(mut self, delay: Duration) -> Self {
        self.action_delay = delay;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute `plan`, creating, reusing or tearing down the session in `slot`
    pub async fn execute(
        &self,
        plan: &Plan,
        slot: &mut Option<AutomationSession>,
    ) -> ExecutionReport {
        let mut history = Vec::new();

        if plan.is_empty() {
            warn!("Execution failed: no valid plan was provided");
            history.push("ERROR: Execution failed: No valid plan was provided.".to_string());
            return ExecutionReport {
                outcome: ExecutionOutcome::Failed {
                    reason: NO_VALID_PLAN.to_string(),
                },
                history,
                executed: 0,
            };
        }

        info!("Executing plan for intermediate goal: {}", plan.intermediate_goal);
        history.push(format!(
            "Executing plan for intermediate goal: {}",
            plan.intermediate_goal
        ));

        let mut summary = Vec::with_capacity(plan.len());

        for (index, action) in plan.actions.iter().enumerate() {
            if index > 0 && !self.action_delay.is_zero() {
                tokio::time::sleep(self.action_delay).await;
            }

            let kind = match self.registry.lookup(&action.tool) {
                Some(kind) => kind,
                None => {
                    let err = DispatchError::UnknownTool(action.tool.clone());
                    return fail(action, err, slot, history, index).await;
                }
            };

            match kind {
                ToolKind::Terminal => {
                    let result = finish_result(&action.parameters);
                    shutdown(slot).await;
                    info!("Task finished: {}", result);
                    history.push(format!("Task finished with result: {}", result));
                    return ExecutionReport {
                        outcome: ExecutionOutcome::Finished { result },
                        history,
                        executed: index,
                    };
                }
                ToolKind::Backend(build) => {
                    info!("Executing action '{}' ({}/{})", action.tool, index + 1, plan.len());
                    let outcome = async {
                        let command = build(&action.tool, &action.parameters)?;
                        let session = self.ensure_session(slot).await?;
                        session.perform(&command).await?;
                        Ok::<(), DispatchError>(())
                    }
                    .await;

                    if let Err(err) = outcome {
                        return fail(action, err, slot, history, index).await;
                    }
                    summary.push(format!(
                        "Action '{}' with params {} executed successfully.",
                        action.tool,
                        action.parameters_json()
                    ));
                }
            }
        }

        history.push(format!(
            "Execution successful for intermediate goal '{}'.",
            plan.intermediate_goal
        ));

        ExecutionReport {
            outcome: ExecutionOutcome::Continuing {
                summary: summary.join("\n"),
            },
            history,
            executed: plan.len(),
        }
    }

    /// Running session in `slot`, starting a fresh one if needed.
    ///
    /// On start failure the slot is left empty.
    async fn ensure_session<'a>(
        &self,
        slot: &'a mut Option<AutomationSession>,
    ) -> Result<&'a mut AutomationSession, AutomationError> {
        if !slot.as_ref().is_some_and(AutomationSession::is_running) {
            if let Some(mut stale) = slot.take() {
                stale.stop().await;
            }

            let mut session = AutomationSession::new(self.factory.create());
            if let Err(e) = session.start().await {
                return Err(match e {
                    AutomationError::StartFailed(_) | AutomationError::BackendUnavailable(_) => e,
                    other => AutomationError::StartFailed(other.to_string()),
                });
            }
            *slot = Some(session);
        }

        slot.as_mut().ok_or(AutomationError::NotRunning)
    }
}

/// Stop and clear the session, if any
pub async fn shutdown(slot: &mut Option<AutomationSession>) {
    if let Some(mut session) = slot.take() {
        session.stop().await;
    }
}

async fn fail(
    action: &Action,
    err: DispatchError,
    slot: &mut Option<AutomationSession>,
    mut history: Vec<String>,
    executed: usize,
) -> ExecutionReport {
    shutdown(slot).await;

    let reason = format!(
        "Error executing action '{}' with params {}. Reason: {}",
        action.tool,
        action.parameters_json(),
        err
    );
    warn!("{}", reason);
    history.push(format!("ERROR: {}", reason));

    ExecutionReport {
        outcome: ExecutionOutcome::Failed { reason },
        history,
        executed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::SessionStatus;
    use crate::mock::{RecordingBackend, RecordingFactory};
    use serde_json::json;

    fn action(tool: &str, params: serde_json::Value) -> Action {
        Action::new(tool, params.as_object().cloned().unwrap()).unwrap()
    }

    fn setup() -> (RecordingBackend, ExecutionDispatcher) {
        let backend = RecordingBackend::new();
        let factory = RecordingFactory::new(backend.clone());
        (backend, ExecutionDispatcher::new(Arc::new(factory)))
    }

    #[tokio::test]
    async fn test_empty_plan_fails_without_backend() {
        let (backend, dispatcher) = setup();
        let mut slot = None;
        let report = dispatcher.execute(&Plan::empty(), &mut slot).await;
        assert_eq!(
            report.outcome,
            ExecutionOutcome::Failed { reason: NO_VALID_PLAN.into() }
        );
        assert_eq!(backend.starts(), 0);
        assert!(slot.is_none());
    }

    #[tokio::test]
    async fn test_finish_only_plan_never_starts_session() {
        let (backend, dispatcher) = setup();
        let plan = Plan::new("done", vec![action("finish_task", json!({"result": "ok"}))]);
        let mut slot = None;
        let report = dispatcher.execute(&plan, &mut slot).await;
        assert_eq!(report.outcome, ExecutionOutcome::Finished { result: "ok".into() });
        assert_eq!(backend.starts(), 0);
    }

    #[tokio::test]
    async fn test_finish_stops_remaining_actions() {
        let (backend, dispatcher) = setup();
        let plan = Plan::new(
            "wrap up",
            vec![
                action("navigate", json!({"url": "https://a"})),
                action("scroll", json!({"direction": "down"})),
                action("finish_task", json!({})),
                action("click", json!({"selector": "#never"})),
            ],
        );
        let mut slot = None;
        let report = dispatcher.execute(&plan, &mut slot).await;

        assert_eq!(
            report.outcome,
            ExecutionOutcome::Finished { result: "Task completed successfully.".into() }
        );
        assert_eq!(report.executed, 2);
        assert_eq!(backend.performed(), vec!["navigate", "scroll"]);
        assert!(slot.is_none());
        assert_eq!(backend.stops(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_stops_session() {
        let (backend, dispatcher) = setup();
        let plan = Plan::new(
            "g",
            vec![
                action("navigate", json!({"url": "https://a"})),
                action("teleport", json!({})),
                action("scroll", json!({})),
            ],
        );
        let mut slot = None;
        let report = dispatcher.execute(&plan, &mut slot).await;

        match &report.outcome {
            ExecutionOutcome::Failed { reason } => assert!(reason.contains("Unknown tool 'teleport'")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(backend.performed(), vec!["navigate"]);
        assert!(slot.is_none());
        assert_eq!(backend.stops(), 1);
        assert!(report.history.last().unwrap().starts_with("ERROR: Error executing action 'teleport'"));
    }

    #[tokio::test]
    async fn test_success_keeps_session_for_next_cycle() {
        let (backend, dispatcher) = setup();
        let plan = Plan::new("g", vec![action("navigate", json!({"url": "https://a"}))]);
        let mut slot = None;

        let report = dispatcher.execute(&plan, &mut slot).await;
        assert!(matches!(report.outcome, ExecutionOutcome::Continuing { .. }));
        assert_eq!(slot.as_ref().map(AutomationSession::status), Some(SessionStatus::Running));

        dispatcher.execute(&plan, &mut slot).await;
        assert_eq!(backend.starts(), 1);
        assert_eq!(backend.performed(), vec!["navigate", "navigate"]);
    }

    #[tokio::test]
    async fn test_invalid_parameters_fail_execution() {
        let (backend, dispatcher) = setup();
        let plan = Plan::new("g", vec![action("navigate", json!({}))]);
        let mut slot = None;
        let report = dispatcher.execute(&plan, &mut slot).await;
        assert!(matches!(report.outcome, ExecutionOutcome::Failed { .. }));
        assert!(backend.performed().is_empty());
    }

    #[tokio::test]
    async fn test_start_failure_leaves_no_session() {
        let backend = RecordingBackend::new().fail_start("browser missing");
        let dispatcher = ExecutionDispatcher::new(Arc::new(RecordingFactory::new(backend)));
        let plan = Plan::new("g", vec![action("navigate", json!({"url": "https://a"}))]);
        let mut slot = None;
        let report = dispatcher.execute(&plan, &mut slot).await;
        match report.outcome {
            ExecutionOutcome::Failed { reason } => assert!(reason.contains("browser missing")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(slot.is_none());
    }
}
