//! Browser automation for capturing page regions.
//!
//! The capture pipeline talks to the browser only through the traits in this
//! module, so it can be driven by headless Chromium in production and by
//! in-memory fakes in tests.
//!
//! # Module Structure
//!
//! - [`chromium`] - chromiumoxide-backed implementation
//! - [`manager`] - bounded launch retry and console relay

mod chromium;
mod manager;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::config::CaptureMarkers;
use crate::types::CaptureInfo;
use crate::Result;

pub use chromium::{ChromiumBrowser, ChromiumElement, ChromiumLauncher, ChromiumPage};
pub use manager::{is_suppressed, launch_with_retry, spawn_console_relay};

/// Starts browser instances. Launching may fail transiently and is retried
/// by [`launch_with_retry`].
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Browser: CaptureBrowser;

    async fn launch(&self) -> Result<Self::Browser>;
}

/// A running browser.
#[async_trait]
pub trait CaptureBrowser: Send {
    type Page: CapturePage;

    async fn open_page(&mut self) -> Result<Self::Page>;

    async fn close(&mut self) -> Result<()>;
}

/// One page of a running browser.
#[async_trait]
pub trait CapturePage: Send + Sync {
    type Element: CaptureTarget;

    /// Text of every console message the page logs from now on.
    async fn console_messages(&self) -> Result<BoxStream<'static, String>>;

    /// Navigates to `url` and waits for the load to finish.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// All elements matching `selector`, in document order.
    async fn find_all(&self, selector: &str) -> Result<Vec<Self::Element>>;

    /// Moves the pointer back to the page origin.
    async fn reset_pointer(&self) -> Result<()>;
}

/// A capture region on a page.
#[async_trait]
pub trait CaptureTarget: Send + Sync {
    /// Dispatches the pre-capture event and reads back the element's id and
    /// focus/hover markers in the same round-trip.
    async fn prepare(&self, markers: &CaptureMarkers) -> Result<CaptureInfo>;

    async fn focus_first_child(&self) -> Result<()>;

    async fn hover_first_child(&self) -> Result<()>;

    /// PNG screenshot of the element with the page background omitted.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Dispatches the post-capture removal event.
    async fn remove(&self, markers: &CaptureMarkers) -> Result<()>;
}
