//! # Desktop Backend
//!
//! Drives the real mouse and keyboard with enigo and captures the screen
//! with xcap. Enabled with the `desktop` feature.
//!
//! The desktop has no DOM, so selector-based actions are rejected as
//! unsupported; navigation goes through the focused browser's address bar.

use agentic_core::{
    AutomationBackend, AutomationError, ClickTarget, ScreenCapturer, ScrollDirection, ToolCommand,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Desktop input settings
#[derive(Debug, Clone)]
pub struct DesktopSettings {
    /// Wheel notches per scroll step
    pub scroll_amount: i32,
    /// Pause between the keystrokes of a compound action
    pub key_delay: Duration,
}

impl Default for DesktopSettings {
    fn default() -> Self {
        Self {
            scroll_amount: 10,
            key_delay: Duration::from_millis(200),
        }
    }
}

fn unsupported(tool: &str) -> AutomationError {
    AutomationError::Unsupported {
        tool: tool.to_string(),
        backend: "desktop".to_string(),
    }
}

/// Scroll delta for enigo: positive scrolls down
pub(crate) fn scroll_delta(direction: ScrollDirection, amount: i32) -> i32 {
    match direction {
        ScrollDirection::Down => amount,
        ScrollDirection::Up => -amount,
    }
}

/// Mouse/keyboard automation of the local desktop
pub struct DesktopBackend {
    settings: DesktopSettings,
    #[cfg(feature = "desktop")]
    input: Option<platform::InputDriver>,
}

impl DesktopBackend {
    pub fn new(settings: DesktopSettings) -> Self {
        Self {
            settings,
            #[cfg(feature = "desktop")]
            input: None,
        }
    }

    pub fn is_supported() -> bool {
        cfg!(feature = "desktop")
    }

    pub fn settings(&self) -> &DesktopSettings {
        &self.settings
    }
}

#[cfg(feature = "desktop")]
#[async_trait]
impl AutomationBackend for DesktopBackend {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn start(&mut self) -> Result<(), AutomationError> {
        if self.input.is_none() {
            info!("Opening desktop input device");
            self.input = Some(platform::InputDriver::new()?);
        }
        Ok(())
    }

    async fn execute(&mut self, command: &ToolCommand) -> Result<(), AutomationError> {
        let input = self.input.as_ref().ok_or(AutomationError::NotRunning)?;

        match command {
            ToolCommand::Click {
                target: ClickTarget::Point { x, y },
            } => {
                debug!("Desktop click at ({}, {})", x, y);
                input.click(*x, *y)
            }
            ToolCommand::TypeText { selector: None, text } => input.text(text),
            ToolCommand::Scroll { direction } => {
                input.scroll(scroll_delta(*direction, self.settings.scroll_amount))
            }
            ToolCommand::Navigate { url } => {
                input.focus_address_bar()?;
                tokio::time::sleep(self.settings.key_delay).await;
                input.text(url)?;
                tokio::time::sleep(self.settings.key_delay).await;
                input.enter()
            }
            other => Err(unsupported(other.tool_name())),
        }
    }

    async fn capture(&self) -> Result<Vec<u8>, AutomationError> {
        platform::capture_png().await
    }

    async fn stop(&mut self) -> Result<(), AutomationError> {
        if self.input.take().is_some() {
            info!("Released desktop input device");
        }
        Ok(())
    }
}

#[cfg(not(feature = "desktop"))]
#[async_trait]
impl AutomationBackend for DesktopBackend {
    fn name(&self) -> &str {
        "desktop"
    }

    async fn start(&mut self) -> Result<(), AutomationError> {
        Err(AutomationError::BackendUnavailable(
            "desktop support not compiled in (rebuild with --features desktop)".to_string(),
        ))
    }

    async fn execute(&mut self, command: &ToolCommand) -> Result<(), AutomationError> {
        Err(unsupported(command.tool_name()))
    }

    async fn capture(&self) -> Result<Vec<u8>, AutomationError> {
        Err(AutomationError::BackendUnavailable(
            "desktop capture not compiled in".to_string(),
        ))
    }

    async fn stop(&mut self) -> Result<(), AutomationError> {
        Ok(())
    }
}

/// Full-screen capture of the primary display, used when no automation
/// session is running
#[derive(Debug, Default, Clone)]
pub struct DesktopCapture;

#[async_trait]
impl ScreenCapturer for DesktopCapture {
    #[cfg(feature = "desktop")]
    async fn capture(&self) -> Result<Vec<u8>, AutomationError> {
        platform::capture_png().await
    }

    #[cfg(not(feature = "desktop"))]
    async fn capture(&self) -> Result<Vec<u8>, AutomationError> {
        Err(AutomationError::CaptureFailed(
            "screen capture not compiled in (rebuild with --features desktop)".to_string(),
        ))
    }
}

#[cfg(feature = "desktop")]
mod platform {
    use agentic_core::AutomationError;
    use enigo::{Axis, Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgba};
    use std::io::Cursor;
    use std::sync::Mutex as StdMutex;

    fn input_failed(e: impl std::fmt::Display) -> AutomationError {
        AutomationError::ActionFailed(e.to_string())
    }

    pub(super) struct InputDriver {
        enigo: StdMutex<Enigo>,
    }

    impl InputDriver {
        pub(super) fn new() -> Result<Self, AutomationError> {
            let enigo = Enigo::new(&Settings::default())
                .map_err(|e| AutomationError::StartFailed(e.to_string()))?;
            Ok(Self {
                enigo: StdMutex::new(enigo),
            })
        }

        fn with_enigo<T>(
            &self,
            f: impl FnOnce(&mut Enigo) -> Result<T, AutomationError>,
        ) -> Result<T, AutomationError> {
            let mut enigo = self
                .enigo
                .lock()
                .map_err(|_| AutomationError::ActionFailed("input device lock poisoned".into()))?;
            f(&mut enigo)
        }

        pub(super) fn click(&self, x: i32, y: i32) -> Result<(), AutomationError> {
            self.with_enigo(|enigo| {
                enigo.move_mouse(x, y, Coordinate::Abs).map_err(input_failed)?;
                enigo.button(Button::Left, Direction::Click).map_err(input_failed)
            })
        }

        pub(super) fn text(&self, text: &str) -> Result<(), AutomationError> {
            self.with_enigo(|enigo| enigo.text(text).map_err(input_failed))
        }

        pub(super) fn scroll(&self, delta: i32) -> Result<(), AutomationError> {
            self.with_enigo(|enigo| enigo.scroll(delta, Axis::Vertical).map_err(input_failed))
        }

        pub(super) fn enter(&self) -> Result<(), AutomationError> {
            self.with_enigo(|enigo| enigo.key(Key::Return, Direction::Click).map_err(input_failed))
        }

        /// Ctrl+L (Cmd+L on macOS)
        pub(super) fn focus_address_bar(&self) -> Result<(), AutomationError> {
            let modifier = if cfg!(target_os = "macos") {
                Key::Meta
            } else {
                Key::Control
            };
            self.with_enigo(|enigo| {
                enigo.key(modifier, Direction::Press).map_err(input_failed)?;
                let typed = enigo.key(Key::Unicode('l'), Direction::Click).map_err(input_failed);
                enigo.key(modifier, Direction::Release).map_err(input_failed)?;
                typed
            })
        }
    }

    /// Capture the first monitor and encode it as PNG
    pub(super) async fn capture_png() -> Result<Vec<u8>, AutomationError> {
        tokio::task::spawn_blocking(capture_blocking)
            .await
            .map_err(|e| AutomationError::CaptureFailed(e.to_string()))?
    }

    fn capture_blocking() -> Result<Vec<u8>, AutomationError> {
        let failed = |e: &dyn std::fmt::Display| AutomationError::CaptureFailed(e.to_string());

        let monitor = xcap::Monitor::all()
            .map_err(|e| failed(&e))?
            .into_iter()
            .next()
            .ok_or_else(|| AutomationError::CaptureFailed("no monitor found".to_string()))?;
        let capture = monitor.capture_image().map_err(|e| failed(&e))?;

        let width = capture.width();
        let height = capture.height();
        let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
            ImageBuffer::from_raw(width, height, capture.into_raw()).ok_or_else(|| {
                AutomationError::CaptureFailed("failed to create image buffer".to_string())
            })?;

        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(buffer)
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| failed(&e))?;
        Ok(png.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_delta_sign() {
        assert_eq!(scroll_delta(ScrollDirection::Down, 10), 10);
        assert_eq!(scroll_delta(ScrollDirection::Up, 10), -10);
    }

    #[test]
    fn test_default_settings() {
        let backend = DesktopBackend::new(DesktopSettings::default());
        assert_eq!(backend.name(), "desktop");
        assert_eq!(backend.settings().scroll_amount, 10);
    }

    #[cfg(not(feature = "desktop"))]
    #[tokio::test]
    async fn test_without_feature() {
        let mut backend = DesktopBackend::new(DesktopSettings::default());
        assert!(matches!(
            backend.start().await,
            Err(AutomationError::BackendUnavailable(_))
        ));
        assert!(matches!(
            DesktopCapture.capture().await,
            Err(AutomationError::CaptureFailed(_))
        ));
    }

    #[cfg(feature = "desktop")]
    #[tokio::test]
    async fn test_execute_before_start() {
        let mut backend = DesktopBackend::new(DesktopSettings::default());
        let err = backend
            .execute(&ToolCommand::Click {
                target: ClickTarget::Selector("#go".into()),
            })
            .await
            .unwrap_err();
        assert_eq!(err, AutomationError::NotRunning);
    }
}
