//! # Agentic Core
//!
//! The perceive → plan → act loop that lets an agent work towards a goal on a
//! live browser page or desktop.
//!
//! ## Components
//!
//! - **Action Model** ([`action`]): tool invocations and plans
//! - **Plan Parser** ([`parser`]): raw model text to [`Plan`], tolerant of fences and junk
//! - **Tool Catalogue** ([`tools`]): open dispatch table from tool names to typed commands
//! - **Automation Session** ([`automation`]): lifecycle around one browser/desktop backend
//! - **Execution Dispatcher** ([`dispatcher`]): runs plans, owns the automation session
//! - **Cycle Controller** ([`controller`]): the state machine tying it all together
//!
//! Vision, reasoning and memory are reached through the traits in [`traits`];
//! concrete implementations live in the sibling crates.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agentic_core::mock::{RecordingBackend, RecordingFactory, ScriptedReasoning, ScriptedVision, StaticCapturer};
//! use agentic_core::{CycleBudget, CycleController, ExecutionDispatcher, StopSignal};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let factory = RecordingFactory::new(RecordingBackend::new());
//!     let controller = CycleController::new(
//!         Arc::new(ScriptedVision::new("An empty page")),
//!         Arc::new(ScriptedReasoning::new(&[
//!             r#"{"intermediate_goal": "done", "plan": [{"tool": "finish_task", "parameters": {"result": "ok"}}]}"#,
//!         ])),
//!         Arc::new(StaticCapturer::new(Vec::new())),
//!         ExecutionDispatcher::new(Arc::new(factory)),
//!     );
//!
//!     let mut state = controller.start_session("demo", "do nothing").await;
//!     let result = controller
//!         .run(&mut state, CycleBudget::unlimited(), &StopSignal::new())
//!         .await;
//!     println!("{:?}", result);
//! }
//! ```

pub mod action;
pub mod automation;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod mock;
pub mod parser;
pub mod state;
pub mod tools;
pub mod traits;

pub use action::{Action, Parameters, Plan};
pub use automation::{
    AutomationBackend, AutomationError, AutomationSession, BackendFactory, ScreenCapturer,
    SessionStatus,
};
pub use config::{AgentConfig, BackendKind, ConfigError, MemoryBackend, ModelProvider};
pub use controller::{ControllerError, CycleBudget, CycleController, StopSignal};
pub use dispatcher::{DispatchError, ExecutionDispatcher, ExecutionOutcome, ExecutionReport};
pub use parser::{parse_plan, ParseError};
pub use state::{Phase, SessionState, StateUpdate};
pub use tools::{ClickTarget, ScrollDirection, ToolCommand, ToolError, ToolKind, ToolRegistry};
pub use traits::{
    MemoryStore, ModelError, PlanningRequest, ReasoningModel, StoreError, VisionModel,
};
