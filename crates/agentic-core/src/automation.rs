//! # Automation Session
//!
//! A persistent connection to one automation backend (browser or desktop),
//! reused across cycles.
//!
//! ```text
//! Unstarted ──start()──▶ Running ──stop()──▶ Stopped
//! ```
//!
//! `Stopped` is terminal: a stopped session is never restarted, a new one is
//! created through a [`BackendFactory`] instead.

use crate::tools::ToolCommand;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Automation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AutomationError {
    #[error("Automation session is not running")]
    NotRunning,

    #[error("Automation session was stopped and cannot be restarted")]
    AlreadyStopped,

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Failed to start backend: {0}")]
    StartFailed(String),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Unsupported action '{tool}' on {backend} backend")]
    Unsupported { tool: String, backend: String },

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, AutomationError>;

/// A concrete automation driver
#[async_trait]
pub trait AutomationBackend: Send + Sync {
    /// Backend name (e.g., "browser", "desktop")
    fn name(&self) -> &str;

    /// Acquire the underlying resource (launch the browser, open the input device)
    async fn start(&mut self) -> Result<()>;

    /// Perform one validated action
    async fn execute(&mut self, command: &ToolCommand) -> Result<()>;

    /// Current screen as PNG bytes
    async fn capture(&self) -> Result<Vec<u8>>;

    /// Release the underlying resource
    async fn stop(&mut self) -> Result<()>;
}

/// Creates fresh backends for new automation sessions
pub trait BackendFactory: Send + Sync {
    fn create(&self) -> Box<dyn AutomationBackend>;
}

/// Default screen capture used when no automation session is running
#[async_trait]
pub trait ScreenCapturer: Send + Sync {
    async fn capture(&self) -> Result<Vec<u8>>;
}

/// Lifecycle of an automation session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unstarted,
    Running,
    Stopped,
}

/// Owned handle to a backend plus its lifecycle state
pub struct AutomationSession {
    id: Uuid,
    status: SessionStatus,
    backend: Box<dyn AutomationBackend>,
}

impl AutomationSession {
    pub fn new(backend: Box<dyn AutomationBackend>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: SessionStatus::Unstarted,
            backend,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Start the backend. Starting a running session only logs a warning.
    ///
    /// A failed start leaves the session `Stopped`.
    pub async fn start(&mut self) -> Result<()> {
        match self.status {
            SessionStatus::Running => {
                warn!("Automation session {} is already running", self.id);
                Ok(())
            }
            SessionStatus::Stopped => Err(AutomationError::AlreadyStopped),
            SessionStatus::Unstarted => {
                info!("Starting {} automation session {}", self.backend.name(), self.id);
                match self.backend.start().await {
                    Ok(()) => {
                        self.status = SessionStatus::Running;
                        Ok(())
                    }
                    Err(e) => {
                        self.status = SessionStatus::Stopped;
                        // Release anything the backend acquired before failing
                        if let Err(stop_err) = self.backend.stop().await {
                            debug!("Cleanup after failed start: {}", stop_err);
                        }
                        Err(e)
                    }
                }
            }
        }
    }

    /// Perform one action on the running backend
    pub async fn perform(&mut self, command: &ToolCommand) -> Result<()> {
        if !self.is_running() {
            return Err(AutomationError::NotRunning);
        }
        debug!("{} backend: {:?}", self.backend.name(), command);
        self.backend.execute(command).await
    }

    /// Current visual snapshot
    pub async fn capture(&self) -> Result<Vec<u8>> {
        if !self.is_running() {
            return Err(AutomationError::NotRunning);
        }
        self.backend.capture().await
    }

    /// Release the backend. Safe to call any number of times.
    pub async fn stop(&mut self) {
        if self.status == SessionStatus::Running {
            info!("Stopping automation session {}", self.id);
            if let Err(e) = self.backend.stop().await {
                warn!("Error while stopping automation session {}: {}", self.id, e);
            }
        }
        self.status = SessionStatus::Stopped;
    }
}

impl fmt::Debug for AutomationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutomationSession")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingBackend;
    use crate::tools::ScrollDirection;

    fn scroll() -> ToolCommand {
        ToolCommand::Scroll { direction: ScrollDirection::Down }
    }

    #[tokio::test]
    async fn test_perform_requires_start() {
        let backend = RecordingBackend::new();
        let mut session = AutomationSession::new(Box::new(backend.clone()));
        assert_eq!(session.perform(&scroll()).await, Err(AutomationError::NotRunning));
        assert_eq!(session.capture().await, Err(AutomationError::NotRunning));

        session.start().await.unwrap();
        session.perform(&scroll()).await.unwrap();
        assert_eq!(backend.performed(), vec!["scroll"]);
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let backend = RecordingBackend::new();
        let mut session = AutomationSession::new(Box::new(backend.clone()));
        session.start().await.unwrap();
        session.start().await.unwrap();
        assert_eq!(backend.starts(), 1);
        assert!(session.is_running());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let backend = RecordingBackend::new();
        let mut session = AutomationSession::new(Box::new(backend.clone()));
        session.start().await.unwrap();
        session.stop().await;
        session.stop().await;
        assert_eq!(session.status(), SessionStatus::Stopped);
        assert_eq!(backend.stops(), 1);
    }

    #[tokio::test]
    async fn test_stopped_session_is_not_reusable() {
        let mut session = AutomationSession::new(Box::new(RecordingBackend::new()));
        session.stop().await;
        assert_eq!(session.start().await, Err(AutomationError::AlreadyStopped));
    }

    #[tokio::test]
    async fn test_failed_start_leaves_session_stopped() {
        let backend = RecordingBackend::new().fail_start("no display");
        let mut session = AutomationSession::new(Box::new(backend));
        assert!(matches!(session.start().await, Err(AutomationError::StartFailed(_))));
        assert_eq!(session.status(), SessionStatus::Stopped);
    }
}
