//! # Browser Backend
//!
//! Chromium driven through Playwright. Enabled with the `browser` feature;
//! without it the backend reports itself unavailable on `start()`.

use agentic_core::{AutomationBackend, AutomationError, ToolCommand};
use async_trait::async_trait;
use tracing::info;

/// Browser launch settings
#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Pixels per scroll step
    pub scroll_pixels: i32,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: false,
            scroll_pixels: 600,
        }
    }
}

/// Playwright-backed browser session
pub struct BrowserBackend {
    settings: BrowserSettings,
    #[cfg(feature = "browser")]
    driver: Option<driver::PlaywrightDriver>,
}

impl BrowserBackend {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            settings,
            #[cfg(feature = "browser")]
            driver: None,
        }
    }

    /// Whether this build can drive a browser
    pub fn is_supported() -> bool {
        cfg!(feature = "browser")
    }

    pub fn settings(&self) -> &BrowserSettings {
        &self.settings
    }
}

#[cfg(feature = "browser")]
#[async_trait]
impl AutomationBackend for BrowserBackend {
    fn name(&self) -> &str {
        "browser"
    }

    async fn start(&mut self) -> Result<(), AutomationError> {
        if self.driver.is_none() {
            info!("Launching Chromium (headless: {})", self.settings.headless);
            self.driver = Some(driver::PlaywrightDriver::launch(&self.settings).await?);
        }
        Ok(())
    }

    async fn execute(&mut self, command: &ToolCommand) -> Result<(), AutomationError> {
        let scroll_pixels = self.settings.scroll_pixels;
        let driver = self.driver.as_ref().ok_or(AutomationError::NotRunning)?;
        driver.execute(command, scroll_pixels).await
    }

    async fn capture(&self) -> Result<Vec<u8>, AutomationError> {
        let driver = self.driver.as_ref().ok_or(AutomationError::NotRunning)?;
        driver.screenshot().await
    }

    async fn stop(&mut self) -> Result<(), AutomationError> {
        match self.driver.take() {
            Some(driver) => {
                info!("Closing browser");
                driver.close().await
            }
            None => Ok(()),
        }
    }
}

#[cfg(not(feature = "browser"))]
#[async_trait]
impl AutomationBackend for BrowserBackend {
    fn name(&self) -> &str {
        "browser"
    }

    async fn start(&mut self) -> Result<(), AutomationError> {
        info!("Browser backend requested but not compiled in");
        Err(AutomationError::BackendUnavailable(
            "browser support not compiled in (rebuild with --features browser)".to_string(),
        ))
    }

    async fn execute(&mut self, _command: &ToolCommand) -> Result<(), AutomationError> {
        Err(AutomationError::NotRunning)
    }

    async fn capture(&self) -> Result<Vec<u8>, AutomationError> {
        Err(AutomationError::NotRunning)
    }

    async fn stop(&mut self) -> Result<(), AutomationError> {
        Ok(())
    }
}

#[cfg(feature = "browser")]
mod driver {
    use super::BrowserSettings;
    use agentic_core::{AutomationError, ClickTarget, ScrollDirection, ToolCommand};
    use playwright::api::{Browser, BrowserContext, Page};
    use playwright::Playwright;
    use tracing::debug;

    fn failed(e: impl std::fmt::Display) -> AutomationError {
        AutomationError::ActionFailed(e.to_string())
    }

    /// Live Playwright objects; dropping `playwright` kills the driver process
    pub(super) struct PlaywrightDriver {
        _playwright: Playwright,
        browser: Browser,
        _context: BrowserContext,
        page: Page,
    }

    impl PlaywrightDriver {
        pub(super) async fn launch(settings: &BrowserSettings) -> Result<Self, AutomationError> {
            let start_failed = |e: &dyn std::fmt::Display| AutomationError::StartFailed(e.to_string());

            let playwright = Playwright::initialize().await.map_err(|e| start_failed(&e))?;
            playwright.install_chromium().map_err(|e| start_failed(&e))?;

            let browser = playwright
                .chromium()
                .launcher()
                .headless(settings.headless)
                .launch()
                .await
                .map_err(|e| start_failed(&e))?;
            let context = browser
                .context_builder()
                .build()
                .await
                .map_err(|e| start_failed(&e))?;
            let page = context.new_page().await.map_err(|e| start_failed(&e))?;

            Ok(Self {
                _playwright: playwright,
                browser,
                _context: context,
                page,
            })
        }

        pub(super) async fn execute(
            &self,
            command: &ToolCommand,
            scroll_pixels: i32,
        ) -> Result<(), AutomationError> {
            match command {
                ToolCommand::Navigate { url } => {
                    self.page.goto_builder(url).goto().await.map_err(failed)?;
                }
                ToolCommand::Click {
                    target: ClickTarget::Selector(selector),
                } => {
                    self.page
                        .click_builder(selector)
                        .click()
                        .await
                        .map_err(|e| AutomationError::ElementNotFound(format!("{}: {}", selector, e)))?;
                }
                ToolCommand::Click {
                    target: ClickTarget::Point { x, y },
                } => {
                    let script = format!(
                        "(() => {{ const el = document.elementFromPoint({x}, {y}); \
                         if (!el) return false; el.click(); return true; }})()"
                    );
                    let clicked: bool = self.page.evaluate(&script, ()).await.map_err(failed)?;
                    if !clicked {
                        return Err(AutomationError::ElementNotFound(format!("point ({}, {})", x, y)));
                    }
                }
                ToolCommand::TypeText {
                    selector: Some(selector),
                    text,
                } => {
                    self.page
                        .fill_builder(selector, text)
                        .fill()
                        .await
                        .map_err(|e| AutomationError::ElementNotFound(format!("{}: {}", selector, e)))?;
                }
                ToolCommand::TypeText { selector: None, text } => {
                    let literal = serde_json::to_string(text).map_err(failed)?;
                    let script = format!(
                        "(() => {{ const el = document.activeElement; \
                         if (!el || !('value' in el)) return false; \
                         el.value += {literal}; \
                         el.dispatchEvent(new Event('input', {{ bubbles: true }})); return true; }})()"
                    );
                    let typed: bool = self.page.evaluate(&script, ()).await.map_err(failed)?;
                    if !typed {
                        return Err(AutomationError::ElementNotFound(
                            "no focused input element".to_string(),
                        ));
                    }
                }
                ToolCommand::Scroll { direction } => {
                    let delta = match direction {
                        ScrollDirection::Down => scroll_pixels,
                        ScrollDirection::Up => -scroll_pixels,
                    };
                    let script =
                        format!("(() => {{ window.scrollBy(0, {delta}); return window.scrollY; }})()");
                    let offset: f64 = self.page.evaluate(&script, ()).await.map_err(failed)?;
                    debug!("Scrolled to {}", offset);
                }
                ToolCommand::Extension { tool, .. } => {
                    return Err(AutomationError::Unsupported {
                        tool: tool.clone(),
                        backend: "browser".to_string(),
                    });
                }
            }
            Ok(())
        }

        pub(super) async fn screenshot(&self) -> Result<Vec<u8>, AutomationError> {
            self.page
                .screenshot_builder()
                .screenshot()
                .await
                .map_err(|e| AutomationError::CaptureFailed(e.to_string()))
        }

        pub(super) async fn close(self) -> Result<(), AutomationError> {
            self.browser.close().await.map_err(failed)
        }
    }
}
