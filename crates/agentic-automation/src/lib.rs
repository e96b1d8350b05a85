//! # Agentic Automation
//!
//! Concrete automation backends for the agent loop.
//!
//! ## Features
//!
//! - **Browser** (`browser` feature): Chromium through Playwright, selector
//!   based actions, page screenshots
//! - **Desktop** (`desktop` feature): enigo mouse/keyboard input and xcap
//!   screen capture
//! - **Hybrid**: DOM actions in the browser, coordinate actions on the desktop
//!
//! Backends compiled without their feature still exist and fail their
//! `start()` with `BackendUnavailable`, so configuration errors surface as
//! recoverable cycle errors rather than build errors.

pub mod browser;
pub mod desktop;
pub mod factory;
pub mod hybrid;

pub use browser::{BrowserBackend, BrowserSettings};
pub use desktop::{DesktopBackend, DesktopCapture, DesktopSettings};
pub use factory::DefaultBackendFactory;
pub use hybrid::HybridBackend;

use agentic_core::config::AutomationConfig;
use agentic_core::{BackendFactory, ScreenCapturer};
use std::sync::Arc;

/// Backend factory for the configured automation kind
pub fn create_factory(config: &AutomationConfig) -> Arc<dyn BackendFactory> {
    Arc::new(DefaultBackendFactory::from_config(config))
}

/// Capturer used when no automation session is running
pub fn default_capturer() -> Arc<dyn ScreenCapturer> {
    Arc::new(DesktopCapture)
}
