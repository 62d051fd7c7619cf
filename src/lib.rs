//! Visual Regression Testing (VRT) Library
//!
//! Serves a compiled page locally, screenshots every capture region on it in
//! headless Chromium, and compares each screenshot pixel-for-pixel with its
//! golden image. Mismatches are written to an HTML report; golden images no
//! capture produced are flagged (check mode) or deleted (update mode).
//!
//! # Module Overview
//!
//! - [`browser`] - Browser traits and the chromiumoxide implementation
//! - [`capture`] - Per-element capture and golden comparison
//! - [`orchestrator`] - The run state machine
//! - [`pixel`] - Exact pixel comparison and diff synthesis
//! - [`raster`] - PNG decode/encode to RGBA buffers
//! - [`report`] - HTML mismatch report
//! - [`reconcile`] - Stale golden image detection
//! - [`server`] - Static page server
//! - [`config`] - Configuration file support
//! - [`types`] - Core data types
//!
//! # Example
//!
//! ```no_run
//! use vrt_lib::{ChromiumLauncher, Config, Harness, Mode};
//!
//! # async fn example() -> vrt_lib::Result<()> {
//! let config = Config::load(None)?;
//! let launcher = ChromiumLauncher::new(config.browser.clone());
//! let summary = Harness::new(config, Mode::Check, launcher).run().await?;
//! println!("{} mismatches", summary.mismatches.len());
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod capture;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod pixel;
pub mod raster;
pub mod reconcile;
pub mod report;
pub mod server;
pub mod types;
pub mod viewport;

pub use browser::{
    BrowserLauncher, CaptureBrowser, CapturePage, CaptureTarget, ChromiumLauncher,
};
pub use config::{BrowserSettings, CaptureMarkers, Config};
pub use error::{ErrorCategory, ErrorPayload, Result, VrtError};
pub use orchestrator::{Harness, Phase};
pub use pixel::compare;
pub use raster::{decode, encode, DecodeError, RasterImage};
pub use report::generate_report;
pub use server::PageServer;
pub use types::{Capture, CaptureInfo, MismatchResult, Mode, RunOutcome, RunSummary, Verdict};
pub use viewport::{Viewport, ViewportParseError};
