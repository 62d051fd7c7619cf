//! In-memory browser used by unit tests.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};

use super::{BrowserLauncher, CaptureBrowser, CapturePage, CaptureTarget};
use crate::config::CaptureMarkers;
use crate::types::CaptureInfo;
use crate::{Result, VrtError};

/// Ordered record of every browser interaction, shared by all fakes
/// spawned from the same page.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    fn push(&self, call: impl Into<String>) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(call.into());
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

pub struct FakeLauncher {
    failures: u32,
    attempts: AtomicU32,
    browser: FakeBrowser,
}

impl FakeLauncher {
    pub fn new(browser: FakeBrowser) -> Self {
        Self::failing_first(0, browser)
    }

    /// Fails the first `failures` launches.
    pub fn failing_first(failures: u32, browser: FakeBrowser) -> Self {
        Self {
            failures,
            attempts: AtomicU32::new(0),
            browser,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    type Browser = FakeBrowser;

    async fn launch(&self) -> Result<FakeBrowser> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.failures {
            return Err(VrtError::browser(format!("launch attempt {attempt} failed")));
        }
        Ok(self.browser.clone())
    }
}

#[derive(Clone)]
pub struct FakeBrowser {
    page: FakePage,
    closed: Arc<AtomicBool>,
}

impl FakeBrowser {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureBrowser for FakeBrowser {
    type Page = FakePage;

    async fn open_page(&mut self) -> Result<FakePage> {
        self.page.log.push("open_page");
        Ok(self.page.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.page.log.push("close");
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakePage {
    elements: Vec<FakeElement>,
    console: Vec<String>,
    pub log: CallLog,
}

impl FakePage {
    pub fn with_elements(elements: Vec<FakeElement>) -> Self {
        let log = CallLog::default();
        let elements = elements
            .into_iter()
            .map(|mut e| {
                e.log = log.clone();
                e
            })
            .collect();
        Self {
            elements,
            console: Vec::new(),
            log,
        }
    }

    pub fn with_console(mut self, console: Vec<String>) -> Self {
        self.console = console;
        self
    }
}

#[async_trait]
impl CapturePage for FakePage {
    type Element = FakeElement;

    async fn console_messages(&self) -> Result<BoxStream<'static, String>> {
        Ok(stream::iter(self.console.clone()).boxed())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.log.push(format!("navigate:{url}"));
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<FakeElement>> {
        self.log.push(format!("find_all:{selector}"));
        Ok(self.elements.clone())
    }

    async fn reset_pointer(&self) -> Result<()> {
        self.log.push("reset_pointer");
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakeElement {
    info: CaptureInfo,
    png: Vec<u8>,
    broken: bool,
    log: CallLog,
}

impl FakeElement {
    /// Element with the given id whose screenshot returns `png`.
    pub fn new(id: &str, png: Vec<u8>) -> Self {
        Self {
            info: CaptureInfo {
                id: id.to_string(),
                wants_focus: false,
                wants_hover: false,
            },
            png,
            broken: false,
            log: CallLog::default(),
        }
    }

    pub fn focus(mut self) -> Self {
        self.info.wants_focus = true;
        self
    }

    pub fn hover(mut self) -> Self {
        self.info.wants_hover = true;
        self
    }

    /// Screenshots fail with a browser error.
    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }
}

#[async_trait]
impl CaptureTarget for FakeElement {
    async fn prepare(&self, markers: &CaptureMarkers) -> Result<CaptureInfo> {
        self.log
            .push(format!("dispatch:{}:{}", markers.prepare_event, self.info.id));
        Ok(self.info.clone())
    }

    async fn focus_first_child(&self) -> Result<()> {
        self.log.push(format!("focus:{}", self.info.id));
        Ok(())
    }

    async fn hover_first_child(&self) -> Result<()> {
        self.log.push(format!("hover:{}", self.info.id));
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.log.push(format!("screenshot:{}", self.info.id));
        if self.broken {
            return Err(VrtError::browser("Target closed"));
        }
        Ok(self.png.clone())
    }

    async fn remove(&self, markers: &CaptureMarkers) -> Result<()> {
        self.log
            .push(format!("dispatch:{}:{}", markers.remove_event, self.info.id));
        Ok(())
    }
}
