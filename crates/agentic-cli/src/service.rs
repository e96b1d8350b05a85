//! # Agent Service
//!
//! Task entry point behind the HTTP API. Each request runs one cycle of
//! the session named by `session_id`; sessions live in a registry until
//! they finish or sit idle longer than the session TTL.

use crate::api::{CycleSnapshot, TaskRequest, TaskResponse};
use agentic_core::{CycleController, Phase, SessionState};
use agentic_providers::{ActionValidation, CompletionCheck, ModelClient, ProviderError};
use base64::Engine;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Validation is not available on this server")]
    ValidatorUnavailable,

    #[error("Model call failed: {0}")]
    Model(#[from] ProviderError),
}

type SharedSession = Arc<Mutex<SessionState>>;

struct SessionEntry {
    state: SharedSession,
    last_active: Instant,
}

pub struct AgentService {
    controller: CycleController,
    validator: Option<Arc<ModelClient>>,
    session_ttl: Option<Duration>,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl AgentService {
    pub fn new(controller: CycleController) -> Self {
        Self {
            controller,
            validator: None,
            session_ttl: None,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Stop sessions nobody has triggered for `ttl`
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = Some(ttl);
        self
    }

    pub fn session_ttl(&self) -> Option<Duration> {
        self.session_ttl
    }

    /// Model client answering the validation endpoints
    pub fn with_validator(mut self, client: Arc<ModelClient>) -> Self {
        self.validator = Some(client);
        self
    }

    /// Ids of sessions that have not finished yet
    pub async fn active_sessions(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    async fn session(&self, session_id: &str, goal: &str) -> SharedSession {
        if let Some(existing) = self.sessions.lock().await.get_mut(session_id) {
            existing.last_active = Instant::now();
            return existing.state.clone();
        }

        info!("Starting session {} with goal: {}", session_id, goal);
        let state = self.controller.start_session(session_id, goal).await;

        self.sessions
            .lock()
            .await
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                state: Arc::new(Mutex::new(state)),
                last_active: Instant::now(),
            })
            .state
            .clone()
    }

    fn touch(sessions: &mut HashMap<String, SessionEntry>, session_id: &str) {
        if let Some(entry) = sessions.get_mut(session_id) {
            entry.last_active = Instant::now();
        }
    }

    /// Stop and forget sessions idle longer than the TTL. Sessions in the
    /// middle of a cycle are left alone. Returns how many were stopped.
    pub async fn evict_idle(&self) -> usize {
        let Some(ttl) = self.session_ttl else {
            return 0;
        };

        let expired: Vec<(String, SharedSession)> = {
            let mut sessions = self.sessions.lock().await;
            let ids: Vec<String> = sessions
                .iter()
                .filter(|(_, entry)| {
                    entry.last_active.elapsed() >= ttl && entry.state.try_lock().is_ok()
                })
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|entry| (id, entry.state)))
                .collect()
        };

        for (id, session) in &expired {
            info!("Session {} idle for over {:?}, stopping it", id, ttl);
            let mut state = session.lock().await;
            self.controller.shutdown(&mut state).await;
        }
        expired.len()
    }

    /// Run one cycle of the request's session
    pub async fn execute(&self, request: TaskRequest) -> Result<TaskResponse, ServiceError> {
        if request.session_id.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("session_id must not be empty".into()));
        }

        let screenshot = match request.screenshot_base64.as_deref().filter(|s| !s.is_empty()) {
            Some(encoded) => Some(
                base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|e| ServiceError::InvalidRequest(format!("screenshot_base64: {}", e)))?,
            ),
            None => None,
        };

        self.evict_idle().await;
        let session = self.session(&request.session_id, &request.goal).await;
        let mut state = session.lock().await;

        if state.main_goal() != request.goal {
            warn!(
                "Session {} keeps its original goal; ignoring '{}'",
                request.session_id, request.goal
            );
        }
        if screenshot.is_some() {
            state.pending_screenshot = screenshot;
        }

        let phase = self.controller.run_cycle(&mut state).await;

        if phase != Phase::Done {
            let snapshot = CycleSnapshot::capture(&state);
            drop(state);
            Self::touch(&mut *self.sessions.lock().await, &request.session_id);
            return Ok(TaskResponse::in_progress(snapshot));
        }

        self.controller.shutdown(&mut state).await;
        let output = state.terminal_result.clone().unwrap_or_default();
        drop(state);
        self.sessions.lock().await.remove(&request.session_id);
        info!("Session {} completed", request.session_id);

        Ok(TaskResponse::completed(output))
    }

    pub async fn validate_action(
        &self,
        screenshot_base64: &str,
        desired_outcome: &str,
    ) -> Result<ActionValidation, ServiceError> {
        let client = self.validator.as_ref().ok_or(ServiceError::ValidatorUnavailable)?;
        Ok(client
            .validate_action_outcome(screenshot_base64, desired_outcome)
            .await?)
    }

    pub async fn validate_completion(
        &self,
        goal: &str,
        screen_description: &str,
    ) -> Result<CompletionCheck, ServiceError> {
        let client = self.validator.as_ref().ok_or(ServiceError::ValidatorUnavailable)?;
        Ok(client.validate_completion(goal, screen_description).await?)
    }

    /// Stop every live automation session
    pub async fn shutdown(&self) {
        let sessions: Vec<SharedSession> = self
            .sessions
            .lock()
            .await
            .drain()
            .map(|(_, entry)| entry.state)
            .collect();
        for session in sessions {
            let mut state = session.lock().await;
            self.controller.shutdown(&mut state).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::TaskStatus;
    use agentic_core::mock::{
        RecordingBackend, RecordingFactory, ScriptedReasoning, ScriptedVision, StaticCapturer,
    };
    use agentic_core::ExecutionDispatcher;

    pub(crate) const NAVIGATE: &str = r#"{"thought": "open it", "intermediate_goal": "open site", "plan": [{"tool": "navigate", "parameters": {"url": "https://example.com"}}]}"#;
    pub(crate) const FINISH: &str =
        r#"{"intermediate_goal": "done", "plan": [{"tool": "finish_task", "parameters": {"result": "42"}}]}"#;

    pub(crate) struct Fixture {
        pub backend: RecordingBackend,
        pub vision: Arc<ScriptedVision>,
        pub reasoning: Arc<ScriptedReasoning>,
    }

    pub(crate) fn service(responses: &[&str]) -> (AgentService, Fixture) {
        let backend = RecordingBackend::new();
        let vision = Arc::new(ScriptedVision::new("Element: Search box, Coords: [1, 2, 3, 4]"));
        let reasoning = Arc::new(ScriptedReasoning::new(responses));
        let dispatcher = ExecutionDispatcher::new(Arc::new(RecordingFactory::new(backend.clone())));
        let controller = CycleController::new(
            vision.clone(),
            reasoning.clone(),
            Arc::new(StaticCapturer::new(b"desktop".to_vec())),
            dispatcher,
        );
        (
            AgentService::new(controller),
            Fixture {
                backend,
                vision,
                reasoning,
            },
        )
    }

    fn request(session_id: &str) -> TaskRequest {
        TaskRequest {
            session_id: session_id.into(),
            goal: "find the answer".into(),
            screenshot_base64: None,
        }
    }

    #[tokio::test]
    async fn test_one_cycle_per_request() {
        let (service, fixture) = service(&[NAVIGATE, FINISH]);

        let first = service.execute(request("s1")).await.unwrap();
        assert_eq!(first.status, TaskStatus::InProgress);
        let data = first.data.unwrap();
        assert_eq!(data.thought.as_deref(), Some("open it"));
        assert_eq!(data.intermediate_goal.as_deref(), Some("open site"));
        assert_eq!(data.plan[0].tool, "navigate");
        assert_eq!(service.active_sessions().await, vec!["s1"]);

        let second = service.execute(request("s1")).await.unwrap();
        assert_eq!(second, TaskResponse::completed("42"));
        assert!(service.active_sessions().await.is_empty());

        assert_eq!(fixture.backend.performed(), vec!["navigate"]);
        assert_eq!(fixture.backend.stops(), 1);
        assert_eq!(fixture.reasoning.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_caller_screenshot_is_used() {
        let (service, fixture) = service(&[FINISH]);
        let mut req = request("s1");
        req.screenshot_base64 = Some("cG5n".into());

        service.execute(req).await.unwrap();
        assert_eq!(fixture.vision.images(), vec![b"png".to_vec()]);
    }

    #[tokio::test]
    async fn test_invalid_screenshot_is_rejected() {
        let (service, _) = service(&[FINISH]);
        let mut req = request("s1");
        req.screenshot_base64 = Some("not base64!".into());

        assert!(matches!(
            service.execute(req).await,
            Err(ServiceError::InvalidRequest(_))
        ));
        assert!(service.active_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let (service, _) = service(&[NAVIGATE, NAVIGATE]);
        service.execute(request("a")).await.unwrap();
        service.execute(request("b")).await.unwrap();
        assert_eq!(service.active_sessions().await, vec!["a", "b"]);

        service.shutdown().await;
        assert!(service.active_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_idle_session_is_stopped() {
        let (service, fixture) = service(&[NAVIGATE]);
        let service = service.with_session_ttl(Duration::ZERO);

        service.execute(request("a")).await.unwrap();
        assert_eq!(fixture.backend.starts(), 1);
        assert_eq!(service.active_sessions().await, vec!["a"]);

        assert_eq!(service.evict_idle().await, 1);
        assert_eq!(fixture.backend.stops(), 1);
        assert!(service.active_sessions().await.is_empty());
    }

    #[tokio::test]
    async fn test_recent_session_survives_sweep() {
        let (service, fixture) = service(&[NAVIGATE]);
        let service = service.with_session_ttl(Duration::from_secs(3600));

        service.execute(request("a")).await.unwrap();
        assert_eq!(service.evict_idle().await, 0);
        assert_eq!(fixture.backend.stops(), 0);
        assert_eq!(service.active_sessions().await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_no_ttl_keeps_sessions() {
        let (service, _) = service(&[NAVIGATE]);
        service.execute(request("a")).await.unwrap();
        assert_eq!(service.evict_idle().await, 0);
        assert_eq!(service.active_sessions().await, vec!["a"]);
    }

    #[tokio::test]
    async fn test_validators_need_a_client() {
        let (service, _) = service(&[]);
        assert!(matches!(
            service.validate_completion("g", "s").await,
            Err(ServiceError::ValidatorUnavailable)
        ));
    }
}
