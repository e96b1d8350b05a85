//! # Test Doubles
//!
//! Scripted and recording implementations of every collaborator the loop
//! talks to. Always compiled so that downstream crates can drive a
//! [`CycleController`](crate::CycleController) without a model or a display.

use crate::automation::{AutomationBackend, AutomationError, BackendFactory, ScreenCapturer};
use crate::tools::{ClickTarget, ToolCommand};
use crate::traits::{MemoryStore, ModelError, PlanningRequest, ReasoningModel, StoreError, VisionModel};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct BackendLog {
    starts: usize,
    stops: usize,
    captures: usize,
    performed: Vec<String>,
    start_failure: Option<String>,
    missing_selectors: Vec<String>,
    failing_tools: Vec<String>,
}

/// Automation backend that records what it was asked to do.
///
/// Clones share one log, so a test can keep a handle while the dispatcher
/// owns the boxed backend.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    log: Arc<Mutex<BackendLog>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `start()` fail
    pub fn fail_start(self, reason: impl Into<String>) -> Self {
        lock(&self.log).start_failure = Some(reason.into());
        self
    }

    /// Make any action on `selector` fail with `ElementNotFound`
    pub fn missing_selector(self, selector: impl Into<String>) -> Self {
        lock(&self.log).missing_selectors.push(selector.into());
        self
    }

    /// Make every invocation of `tool` fail
    pub fn fail_tool(self, tool: impl Into<String>) -> Self {
        lock(&self.log).failing_tools.push(tool.into());
        self
    }

    /// Tool names of successfully performed actions, in order
    pub fn performed(&self) -> Vec<String> {
        lock(&self.log).performed.clone()
    }

    pub fn starts(&self) -> usize {
        lock(&self.log).starts
    }

    pub fn stops(&self) -> usize {
        lock(&self.log).stops
    }

    pub fn captures(&self) -> usize {
        lock(&self.log).captures
    }
}

#[async_trait]
impl AutomationBackend for RecordingBackend {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start(&mut self) -> Result<(), AutomationError> {
        let mut log = lock(&self.log);
        if let Some(reason) = &log.start_failure {
            return Err(AutomationError::StartFailed(reason.clone()));
        }
        log.starts += 1;
        Ok(())
    }

    async fn execute(&mut self, command: &ToolCommand) -> Result<(), AutomationError> {
        let mut log = lock(&self.log);
        let tool = command.tool_name().to_string();

        if log.failing_tools.contains(&tool) {
            return Err(AutomationError::ActionFailed(format!("{} failed", tool)));
        }

        let selector = match command {
            ToolCommand::Click {
                target: ClickTarget::Selector(selector),
            } => Some(selector),
            ToolCommand::TypeText {
                selector: Some(selector),
                ..
            } => Some(selector),
            _ => None,
        };
        if let Some(selector) = selector {
            if log.missing_selectors.contains(selector) {
                return Err(AutomationError::ElementNotFound(selector.clone()));
            }
        }

        log.performed.push(tool);
        Ok(())
    }

    async fn capture(&self) -> Result<Vec<u8>, AutomationError> {
        lock(&self.log).captures += 1;
        Ok(b"session-screenshot".to_vec())
    }

    async fn stop(&mut self) -> Result<(), AutomationError> {
        lock(&self.log).stops += 1;
        Ok(())
    }
}

/// Factory handing out clones of one [`RecordingBackend`]
#[derive(Debug, Clone)]
pub struct RecordingFactory {
    backend: RecordingBackend,
}

impl RecordingFactory {
    pub fn new(backend: RecordingBackend) -> Self {
        Self { backend }
    }
}

impl BackendFactory for RecordingFactory {
    fn create(&self) -> Box<dyn AutomationBackend> {
        Box::new(self.backend.clone())
    }
}

/// Screen capturer returning fixed bytes
#[derive(Debug)]
pub struct StaticCapturer {
    image: Result<Vec<u8>, String>,
    captures: Mutex<usize>,
}

impl StaticCapturer {
    pub fn new(image: Vec<u8>) -> Self {
        Self {
            image: Ok(image),
            captures: Mutex::new(0),
        }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            image: Err(reason.into()),
            captures: Mutex::new(0),
        }
    }

    pub fn captures(&self) -> usize {
        *lock(&self.captures)
    }
}

#[async_trait]
impl ScreenCapturer for StaticCapturer {
    async fn capture(&self) -> Result<Vec<u8>, AutomationError> {
        *lock(&self.captures) += 1;
        self.image.clone().map_err(AutomationError::CaptureFailed)
    }
}

/// Vision model answering with a fixed description
#[derive(Debug)]
pub struct ScriptedVision {
    description: String,
    images: Mutex<Vec<Vec<u8>>>,
    failures: Mutex<VecDeque<String>>,
}

impl ScriptedVision {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            images: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Fail the next call
    pub fn fail_next(&self, reason: impl Into<String>) {
        lock(&self.failures).push_back(reason.into());
    }

    /// Images received so far
    pub fn images(&self) -> Vec<Vec<u8>> {
        lock(&self.images).clone()
    }
}

#[async_trait]
impl VisionModel for ScriptedVision {
    async fn analyze(&self, image: &[u8], _goal: &str) -> Result<String, ModelError> {
        if let Some(reason) = lock(&self.failures).pop_front() {
            return Err(ModelError::Request(reason));
        }
        lock(&self.images).push(image.to_vec());
        Ok(self.description.clone())
    }
}

/// A reasoning call as received by [`ScriptedReasoning`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPlanning {
    pub goal: String,
    pub screen_description: String,
    pub history_len: usize,
    pub previous_error: Option<String>,
}

/// Reasoning model replaying queued responses
#[derive(Debug)]
pub struct ScriptedReasoning {
    responses: Mutex<VecDeque<Result<String, ModelError>>>,
    requests: Mutex<Vec<RecordedPlanning>>,
}

impl ScriptedReasoning {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| Ok(r.to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another response
    pub fn push(&self, response: impl Into<String>) {
        lock(&self.responses).push_back(Ok(response.into()));
    }

    /// Queue a failing call
    pub fn push_error(&self, error: ModelError) {
        lock(&self.responses).push_back(Err(error));
    }

    /// Calls received so far
    pub fn requests(&self) -> Vec<RecordedPlanning> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl ReasoningModel for ScriptedReasoning {
    async fn plan(&self, request: PlanningRequest<'_>) -> Result<String, ModelError> {
        lock(&self.requests).push(RecordedPlanning {
            goal: request.goal.to_string(),
            screen_description: request.screen_description.to_string(),
            history_len: request.history.len(),
            previous_error: request.previous_error.map(str::to_string),
        });
        lock(&self.responses)
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Unavailable("no scripted response left".into())))
    }
}

/// Memory store that returns fixed records and remembers additions
#[derive(Debug, Default)]
pub struct RecordingMemory {
    records: Vec<String>,
    fail: bool,
    added: Mutex<Vec<(String, String)>>,
}

impl RecordingMemory {
    pub fn with_records(records: &[&str]) -> Self {
        Self {
            records: records.iter().map(|r| r.to_string()).collect(),
            ..Self::default()
        }
    }

    /// A store whose every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(session_id, text)` pairs added so far
    pub fn added(&self) -> Vec<(String, String)> {
        lock(&self.added).clone()
    }
}

#[async_trait]
impl MemoryStore for RecordingMemory {
    async fn add(&self, session_id: &str, text: &str) -> Result<(), StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("recording store offline".into()));
        }
        lock(&self.added).push((session_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn search(&self, _session_id: &str, _query: &str) -> Result<Vec<String>, StoreError> {
        if self.fail {
            return Err(StoreError::Unavailable("recording store offline".into()));
        }
        Ok(self.records.clone())
    }
}
