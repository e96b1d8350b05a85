//! Backend construction from configuration.

use crate::browser::{BrowserBackend, BrowserSettings};
use crate::desktop::{DesktopBackend, DesktopSettings};
use crate::hybrid::HybridBackend;
use agentic_core::config::AutomationConfig;
use agentic_core::{AutomationBackend, BackendFactory, BackendKind};

/// Builds a fresh backend of the configured kind for every new session
#[derive(Debug, Clone)]
pub struct DefaultBackendFactory {
    kind: BackendKind,
    browser: BrowserSettings,
    desktop: DesktopSettings,
}

impl DefaultBackendFactory {
    pub fn new(kind: BackendKind) -> Self {
        Self {
            kind,
            browser: BrowserSettings::default(),
            desktop: DesktopSettings::default(),
        }
    }

    pub fn from_config(config: &AutomationConfig) -> Self {
        let mut factory = Self::new(config.backend);
        factory.browser.headless = config.headless;
        factory.desktop.scroll_amount = config.scroll_amount;
        factory
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Whether this build can serve the configured kind
    pub fn is_supported(&self) -> bool {
        match self.kind {
            BackendKind::Browser => BrowserBackend::is_supported(),
            BackendKind::Desktop => DesktopBackend::is_supported(),
            BackendKind::Hybrid => {
                BrowserBackend::is_supported() && DesktopBackend::is_supported()
            }
        }
    }
}

impl BackendFactory for DefaultBackendFactory {
    fn create(&self) -> Box<dyn AutomationBackend> {
        match self.kind {
            BackendKind::Browser => Box::new(BrowserBackend::new(self.browser.clone())),
            BackendKind::Desktop => Box::new(DesktopBackend::new(self.desktop.clone())),
            BackendKind::Hybrid => Box::new(HybridBackend::new(
                Box::new(BrowserBackend::new(self.browser.clone())),
                Box::new(DesktopBackend::new(self.desktop.clone())),
            )),
        }
    }
}
