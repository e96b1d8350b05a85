//! # Cycle Controller
//!
//! The perceive → plan → act state machine:
//!
//! ```text
//! Perceiving ──▶ Planning ──▶ Executing ──Finished──▶ Done
//!     ▲                           │
//!     └──── Continuing / Failed ──┘
//! ```
//!
//! Each phase reads the [`SessionState`] and returns a [`StateUpdate`]; the
//! controller merges it and moves on. The core loop only ends when the
//! terminal tool runs. [`CycleController::run`] adds an optional
//! [`CycleBudget`] and a [`StopSignal`] on top, both checked between phases.

use crate::action::Plan;
use crate::automation::ScreenCapturer;
use crate::dispatcher::{shutdown, ExecutionDispatcher};
use crate::parser::parse_plan;
use crate::state::{Phase, SessionState, StateUpdate};
use crate::traits::{MemoryStore, PlanningRequest, ReasoningModel, VisionModel};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Loop termination errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    #[error("Session cancelled after {cycles} cycle(s)")]
    Cancelled { cycles: u32 },

    #[error("Cycle budget exhausted after {cycles} cycle(s)")]
    BudgetExhausted { cycles: u32 },

    #[error("Session timed out after {elapsed_secs}s")]
    TimedOut { elapsed_secs: u64 },
}

pub type Result<T> = std::result::Result<T, ControllerError>;

/// Limits imposed on a full run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleBudget {
    pub max_cycles: Option<u32>,
    pub timeout: Option<Duration>,
}

impl CycleBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn max_cycles(mut self, cycles: u32) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives sessions through the perceive/plan/execute cycle
pub struct CycleController {
    vision: Arc<dyn VisionModel>,
    reasoning: Arc<dyn ReasoningModel>,
    capturer: Arc<dyn ScreenCapturer>,
    dispatcher: ExecutionDispatcher,
    memory: Option<Arc<dyn MemoryStore>>,
    cycle_delay: Duration,
}

impl CycleController {
    pub fn new(
        vision: Arc<dyn VisionModel>,
        reasoning: Arc<dyn ReasoningModel>,
        capturer: Arc<dyn ScreenCapturer>,
        dispatcher: ExecutionDispatcher,
    ) -> Self {
        Self {
            vision,
            reasoning,
            capturer,
            dispatcher,
            memory: None,
            cycle_delay: Duration::ZERO,
        }
    }

    /// Recall prior records at session start and store the result at the end
    pub fn with_memory(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(store);
        self
    }

    /// Pause between cycles of a full run
    pub fn with_cycle_delay(mut self, delay: Duration) -> Self {
        self.cycle_delay = delay;
        self
    }

    /// Create a session, seeding its history from memory
    pub async fn start_session(
        &self,
        session_id: impl Into<String>,
        goal: impl Into<String>,
    ) -> SessionState {
        let mut state = SessionState::with_id(session_id, goal);

        if let Some(store) = &self.memory {
            match store.search(&state.session_id, state.main_goal()).await {
                Ok(records) => {
                    debug!("Recalled {} memory record(s)", records.len());
                    state
                        .history
                        .extend(records.into_iter().map(|r| format!("Memory: {}", r)));
                }
                Err(e) => warn!("Memory search failed for session {}: {}", state.session_id, e),
            }
        }

        state
    }

    /// Run the entry action of the current phase and advance
    pub async fn step(&self, state: &mut SessionState) -> Phase {
        match state.phase {
            Phase::Perceiving => {
                info!("Running vision phase (cycle {})", state.cycles + 1);
                let update = self.perceive(state).await;
                state.apply(update);
            }
            Phase::Planning => {
                info!("Running reasoning phase");
                let update = self.plan(state).await;
                state.apply(update);
            }
            Phase::Executing => {
                info!("Running execution phase");
                let update = self.execute(state).await;
                state.apply(update);
                if state.is_done() {
                    self.remember(state).await;
                }
            }
            Phase::Done => {}
        }
        state.phase
    }

    /// Finish the current cycle. Returns `Perceiving` to loop or `Done`.
    pub async fn run_cycle(&self, state: &mut SessionState) -> Phase {
        if state.is_done() {
            return Phase::Done;
        }
        loop {
            let phase = self.step(state).await;
            if matches!(phase, Phase::Perceiving | Phase::Done) {
                return phase;
            }
        }
    }

    /// Run until the task finishes, the budget runs out or `stop` is raised
    pub async fn run(
        &self,
        state: &mut SessionState,
        budget: CycleBudget,
        stop: &StopSignal,
    ) -> Result<String> {
        self.run_observed(state, budget, stop, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_cycle` after every completed cycle
    pub async fn run_observed<F>(
        &self,
        state: &mut SessionState,
        budget: CycleBudget,
        stop: &StopSignal,
        mut on_cycle: F,
    ) -> Result<String>
    where
        F: FnMut(&SessionState),
    {
        let started = Instant::now();

        let outcome = loop {
            if let Some(result) = &state.terminal_result {
                break Ok(result.clone());
            }
            if stop.is_stopped() {
                break Err(ControllerError::Cancelled { cycles: state.cycles });
            }
            if state.phase == Phase::Perceiving {
                if let Some(max) = budget.max_cycles {
                    if state.cycles >= max {
                        break Err(ControllerError::BudgetExhausted { cycles: state.cycles });
                    }
                }
            }
            if let Some(timeout) = budget.timeout {
                if started.elapsed() >= timeout {
                    break Err(ControllerError::TimedOut {
                        elapsed_secs: started.elapsed().as_secs(),
                    });
                }
            }

            let was_executing = state.phase == Phase::Executing;
            let phase = self.step(state).await;

            if was_executing {
                on_cycle(state);
                if phase == Phase::Perceiving && !self.cycle_delay.is_zero() {
                    tokio::time::sleep(self.cycle_delay).await;
                }
            }
        };

        if let Err(e) = &outcome {
            warn!("Stopping session {}: {}", state.session_id, e);
            self.shutdown(state).await;
        }
        outcome
    }

    /// Stop the session's automation backend, if one is live
    pub async fn shutdown(&self, state: &mut SessionState) {
        shutdown(&mut state.automation).await;
    }

    async fn perceive(&self, state: &SessionState) -> StateUpdate {
        let image = if let Some(screenshot) = &state.pending_screenshot {
            debug!("Using caller-supplied screenshot");
            Ok(screenshot.clone())
        } else if let Some(session) = state.automation.as_ref().filter(|s| s.is_running()) {
            session.capture().await
        } else {
            self.capturer.capture().await
        };

        let vision_analysis = match image {
            Ok(bytes) => match self.vision.analyze(&bytes, state.main_goal()).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Vision call failed: {}", e);
                    format!("Error: Could not get vision analysis: {}", e)
                }
            },
            Err(e) => {
                warn!("Screen capture failed: {}", e);
                format!("Error: Could not capture screen: {}", e)
            }
        };

        StateUpdate::Perceived { vision_analysis }
    }

    async fn plan(&self, state: &SessionState) -> StateUpdate {
        let request = PlanningRequest {
            goal: state.main_goal(),
            screen_description: state.last_vision_analysis.as_deref().unwrap_or_default(),
            history: &state.history,
            previous_error: state.last_error.as_deref(),
        };

        let raw_output = match self.reasoning.plan(request).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Reasoning call failed: {}", e);
                return StateUpdate::Planned {
                    raw_output: format!("Error: reasoning call failed: {}", e),
                    plan: Plan::empty(),
                    parse_error: Some(e.to_string()),
                };
            }
        };
        debug!("Raw reasoning output: {}", raw_output);

        match parse_plan(&raw_output) {
            Ok(plan) => StateUpdate::Planned {
                raw_output,
                plan,
                parse_error: None,
            },
            Err(e) => {
                warn!("Failed to parse plan: {}", e);
                StateUpdate::Planned {
                    raw_output,
                    plan: Plan::empty(),
                    parse_error: Some(e.to_string()),
                }
            }
        }
    }

    async fn execute(&self, state: &mut SessionState) -> StateUpdate {
        let empty = Plan::empty();
        let plan = state.current_plan.as_ref().unwrap_or(&empty);
        let report = self.dispatcher.execute(plan, &mut state.automation).await;
        StateUpdate::Executed { report }
    }

    async fn remember(&self, state: &SessionState) {
        let (Some(store), Some(result)) = (&self.memory, &state.terminal_result) else {
            return;
        };
        let record = format!("Goal: {}\nResult: {}", state.main_goal(), result);
        if let Err(e) = store.add(&state.session_id, &record).await {
            warn!("Failed to store memory for session {}: {}", state.session_id, e);
        }
    }
}
