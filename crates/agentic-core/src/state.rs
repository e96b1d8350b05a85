//! # Session State
//!
//! The aggregate threaded through the loop for one task run. Phases never
//! mutate it directly; each produces a [`StateUpdate`] that the controller
//! merges with [`SessionState::apply`].

use crate::action::Plan;
use crate::automation::AutomationSession;
use crate::dispatcher::{ExecutionOutcome, ExecutionReport};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Where the cycle currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Perceiving,
    Planning,
    Executing,
    Done,
}

/// Partial update produced by one phase
#[derive(Debug)]
pub enum StateUpdate {
    Perceived {
        vision_analysis: String,
    },
    Planned {
        raw_output: String,
        plan: Plan,
        parse_error: Option<String>,
    },
    Executed {
        report: ExecutionReport,
    },
}

/// State of one task run
#[derive(Debug)]
pub struct SessionState {
    pub session_id: String,
    main_goal: String,
    pub history: Vec<String>,
    pub last_vision_analysis: Option<String>,
    pub last_error: Option<String>,
    pub current_plan: Option<Plan>,
    pub last_execution: Option<String>,
    /// Owned by the dispatcher
    pub automation: Option<AutomationSession>,
    pub terminal_result: Option<String>,
    pub phase: Phase,
    /// Completed cycles
    pub cycles: u32,
    /// Screenshot supplied by the caller, consumed by the next perception
    pub pending_screenshot: Option<Vec<u8>>,
    pub started_at: DateTime<Utc>,
}

impl SessionState {
    /// New session with a generated id
    pub fn new(goal: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), goal)
    }

    pub fn with_id(session_id: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            main_goal: goal.into(),
            history: Vec::new(),
            last_vision_analysis: None,
            last_error: None,
            current_plan: None,
            last_execution: None,
            automation: None,
            terminal_result: None,
            phase: Phase::Perceiving,
            cycles: 0,
            pending_screenshot: None,
            started_at: Utc::now(),
        }
    }

    pub fn main_goal(&self) -> &str {
        &self.main_goal
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    /// Merge a phase result
    pub fn apply(&mut self, update: StateUpdate) {
        match update {
            StateUpdate::Perceived { vision_analysis } => {
                self.history.push(format!("Vision Analysis: {}", vision_analysis));
                self.last_vision_analysis = Some(vision_analysis);
                self.pending_screenshot = None;
                // last_error survives until the planning phase has read it
                self.current_plan = None;
                self.last_execution = None;
                self.phase = Phase::Planning;
            }
            StateUpdate::Planned {
                raw_output,
                plan,
                parse_error,
            } => {
                self.history.push(format!("LLM Raw Output: {}", raw_output));
                if let Some(err) = &parse_error {
                    self.history.push(format!(
                        "ERROR: Failed to parse or validate plan object: {}",
                        err
                    ));
                }
                self.last_error = parse_error;
                self.current_plan = Some(plan);
                self.phase = Phase::Executing;
            }
            StateUpdate::Executed { report } => {
                self.history.extend(report.history);
                self.cycles += 1;
                match report.outcome {
                    ExecutionOutcome::Finished { result } => {
                        self.terminal_result = Some(result);
                        self.last_error = None;
                        self.phase = Phase::Done;
                    }
                    ExecutionOutcome::Failed { reason } => {
                        self.last_error = Some(match self.last_error.take() {
                            Some(parse_error) => format!("{}: {}", reason, parse_error),
                            None => reason,
                        });
                        self.phase = Phase::Perceiving;
                    }
                    ExecutionOutcome::Continuing { summary } => {
                        self.last_execution = Some(summary);
                        self.phase = Phase::Perceiving;
                    }
                }
            }
        }
    }
}
