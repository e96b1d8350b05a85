//! # Hybrid Backend
//!
//! Routes each action to the backend that can serve it: DOM actions
//! (navigation, selectors) to the browser, coordinate actions to the
//! desktop. The browser is only launched once a DOM action arrives.

use agentic_core::{AutomationBackend, AutomationError, ClickTarget, ToolCommand};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Which half of a hybrid backend serves a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Browser,
    Desktop,
}

/// Pick the backend for `command`
pub fn route(command: &ToolCommand) -> Route {
    match command {
        ToolCommand::Navigate { .. } | ToolCommand::Extension { .. } => Route::Browser,
        ToolCommand::Click {
            target: ClickTarget::Selector(_),
        } => Route::Browser,
        ToolCommand::TypeText {
            selector: Some(_), ..
        } => Route::Browser,
        ToolCommand::Click { .. } | ToolCommand::TypeText { .. } | ToolCommand::Scroll { .. } => {
            Route::Desktop
        }
    }
}

pub struct HybridBackend {
    browser: Box<dyn AutomationBackend>,
    desktop: Box<dyn AutomationBackend>,
    browser_started: bool,
}

impl HybridBackend {
    pub fn new(browser: Box<dyn AutomationBackend>, desktop: Box<dyn AutomationBackend>) -> Self {
        Self {
            browser,
            desktop,
            browser_started: false,
        }
    }

    async fn ensure_browser(&mut self) -> Result<(), AutomationError> {
        if !self.browser_started {
            debug!("Hybrid backend launching browser on first DOM action");
            self.browser.start().await?;
            self.browser_started = true;
        }
        Ok(())
    }
}

#[async_trait]
impl AutomationBackend for HybridBackend {
    fn name(&self) -> &str {
        "hybrid"
    }

    async fn start(&mut self) -> Result<(), AutomationError> {
        self.desktop.start().await
    }

    async fn execute(&mut self, command: &ToolCommand) -> Result<(), AutomationError> {
        match route(command) {
            Route::Browser => {
                self.ensure_browser().await?;
                self.browser.execute(command).await
            }
            Route::Desktop => self.desktop.execute(command).await,
        }
    }

    async fn capture(&self) -> Result<Vec<u8>, AutomationError> {
        match self.desktop.capture().await {
            Ok(image) => Ok(image),
            Err(e) if self.browser_started => {
                debug!("Desktop capture failed ({}), using browser screenshot", e);
                self.browser.capture().await
            }
            Err(e) => Err(e),
        }
    }

    async fn stop(&mut self) -> Result<(), AutomationError> {
        let browser = if self.browser_started {
            self.browser_started = false;
            self.browser.stop().await
        } else {
            Ok(())
        };
        let desktop = self.desktop.stop().await;

        if let Err(e) = &browser {
            warn!("Failed to stop browser half of hybrid backend: {}", e);
        }
        browser.and(desktop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentic_core::mock::RecordingBackend;
    use agentic_core::ScrollDirection;

    fn hybrid() -> (HybridBackend, RecordingBackend, RecordingBackend) {
        let browser = RecordingBackend::new();
        let desktop = RecordingBackend::new();
        let backend = HybridBackend::new(Box::new(browser.clone()), Box::new(desktop.clone()));
        (backend, browser, desktop)
    }

    #[test]
    fn test_routing() {
        assert_eq!(
            route(&ToolCommand::Navigate { url: "https://a.b".into() }),
            Route::Browser
        );
        assert_eq!(
            route(&ToolCommand::TypeText { selector: Some("#q".into()), text: "x".into() }),
            Route::Browser
        );
        assert_eq!(
            route(&ToolCommand::TypeText { selector: None, text: "x".into() }),
            Route::Desktop
        );
        assert_eq!(
            route(&ToolCommand::Click { target: ClickTarget::Point { x: 1, y: 2 } }),
            Route::Desktop
        );
        assert_eq!(
            route(&ToolCommand::Scroll { direction: ScrollDirection::Up }),
            Route::Desktop
        );
    }

    #[tokio::test]
    async fn test_browser_started_lazily() {
        let (mut backend, browser, desktop) = hybrid();
        backend.start().await.unwrap();
        assert_eq!(desktop.starts(), 1);
        assert_eq!(browser.starts(), 0);

        backend
            .execute(&ToolCommand::Scroll { direction: ScrollDirection::Down })
            .await
            .unwrap();
        assert_eq!(browser.starts(), 0);

        backend
            .execute(&ToolCommand::Navigate { url: "https://a.b".into() })
            .await
            .unwrap();
        backend
            .execute(&ToolCommand::Click { target: ClickTarget::Selector("#go".into()) })
            .await
            .unwrap();
        assert_eq!(browser.starts(), 1);
        assert_eq!(browser.performed(), vec!["navigate", "click"]);
        assert_eq!(desktop.performed(), vec!["scroll"]);
    }

    #[tokio::test]
    async fn test_stop_only_stops_started_halves() {
        let (mut backend, browser, desktop) = hybrid();
        backend.start().await.unwrap();
        backend.stop().await.unwrap();
        assert_eq!(browser.stops(), 0);
        assert_eq!(desktop.stops(), 1);
    }

    #[tokio::test]
    async fn test_capture_prefers_desktop() {
        let (mut backend, browser, desktop) = hybrid();
        backend.start().await.unwrap();
        backend.capture().await.unwrap();
        assert_eq!(desktop.captures(), 1);
        assert_eq!(browser.captures(), 0);
    }
}
