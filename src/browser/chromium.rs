//! Headless Chromium driven over the DevTools protocol.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, Viewport as ClipRect};
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, RemoteObject};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport as EmulatedViewport;
use chromiumoxide::layout::Point;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::stream::{BoxStream, StreamExt};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::debug;

use super::{BrowserLauncher, CaptureBrowser, CapturePage, CaptureTarget};
use crate::config::{BrowserSettings, CaptureMarkers};
use crate::types::CaptureInfo;
use crate::{Result, VrtError};

/// chromiumoxide applies its request timeout to navigation, so "no timeout"
/// is approximated by a day.
const UNBOUNDED_REQUEST_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

fn cdp(err: CdpError) -> VrtError {
    VrtError::browser(err.to_string())
}

fn js_string(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    settings: BrowserSettings,
}

impl ChromiumLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    fn browser_config(&self) -> Result<BrowserConfig> {
        let viewport = self.settings.viewport;
        let mut builder = BrowserConfig::builder()
            .window_size(viewport.width, viewport.height)
            .viewport(Some(EmulatedViewport {
                width: viewport.width,
                height: viewport.height,
                ..EmulatedViewport::default()
            }))
            .request_timeout(
                self.settings
                    .navigation_timeout
                    .unwrap_or(UNBOUNDED_REQUEST_TIMEOUT),
            );

        if let Some(exe) = &self.settings.executable {
            builder = builder.chrome_executable(exe);
        }

        // chromiumoxide's own headless mode always adds --hide-scrollbars.
        builder = match (self.settings.headless, self.settings.hide_scrollbars) {
            (true, true) => builder,
            (true, false) => builder.with_head().arg("--headless=new"),
            (false, _) => builder.with_head(),
        };

        builder
            .build()
            .map_err(|e| VrtError::browser(format!("Invalid browser config: {e}")))
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    type Browser = ChromiumBrowser;

    async fn launch(&self) -> Result<ChromiumBrowser> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(cdp)?;

        // The handler must be polled or every CDP command stalls.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!("CDP handler error: {err}");
                }
            }
        });

        Ok(ChromiumBrowser {
            browser,
            handler_task,
            navigation_timeout: self.settings.navigation_timeout,
        })
    }
}

pub struct ChromiumBrowser {
    browser: Browser,
    handler_task: JoinHandle<()>,
    navigation_timeout: Option<Duration>,
}

#[async_trait]
impl CaptureBrowser for ChromiumBrowser {
    type Page = ChromiumPage;

    async fn open_page(&mut self) -> Result<ChromiumPage> {
        let page = self.browser.new_page("about:blank").await.map_err(cdp)?;
        Ok(ChromiumPage {
            page,
            navigation_timeout: self.navigation_timeout,
        })
    }

    async fn close(&mut self) -> Result<()> {
        self.browser.close().await.map_err(cdp)?;
        if let Err(err) = self.browser.wait().await {
            debug!("Browser process did not exit cleanly: {err}");
        }
        self.handler_task.abort();
        Ok(())
    }
}

impl Drop for ChromiumBrowser {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}

pub struct ChromiumPage {
    page: Page,
    navigation_timeout: Option<Duration>,
}

#[async_trait]
impl CapturePage for ChromiumPage {
    type Element = ChromiumElement;

    async fn console_messages(&self) -> Result<BoxStream<'static, String>> {
        let events = self
            .page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(cdp)?;
        Ok(events.map(|event| console_text(&event.args)).boxed())
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        let navigation = self.page.goto(url);
        match self.navigation_timeout {
            Some(limit) => {
                timeout(limit, navigation)
                    .await
                    .map_err(|_| {
                        VrtError::browser(format!("Timeout navigating to {url} after {limit:?}"))
                    })?
                    .map_err(cdp)?;
            }
            None => {
                navigation.await.map_err(cdp)?;
            }
        }
        Ok(())
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<ChromiumElement>> {
        let elements = self.page.find_elements(selector).await.map_err(cdp)?;
        Ok(elements
            .into_iter()
            .map(|element| ChromiumElement {
                page: self.page.clone(),
                element,
            })
            .collect())
    }

    async fn reset_pointer(&self) -> Result<()> {
        self.page
            .move_mouse(Point { x: 0.0, y: 0.0 })
            .await
            .map_err(cdp)?;
        Ok(())
    }
}

/// Renders console arguments the way the devtools console prints them.
fn console_text(args: &[RemoteObject]) -> String {
    args.iter()
        .filter_map(|arg| match &arg.value {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => arg.description.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Element box in document coordinates.
#[derive(Debug, Deserialize)]
struct PageRect {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

pub struct ChromiumElement {
    page: Page,
    element: Element,
}

impl ChromiumElement {
    /// Runs `function` with `this` bound to the element and returns its
    /// string result. Exceptions thrown by the page become errors.
    async fn call(&self, function: String) -> Result<Option<String>> {
        let returns = self.element.call_js_fn(function, false).await.map_err(cdp)?;
        if let Some(details) = returns.exception_details {
            let message = details
                .exception
                .and_then(|e| e.description)
                .unwrap_or(details.text);
            return Err(VrtError::browser(format!(
                "Script failed in capture element: {message}"
            )));
        }
        Ok(match returns.result.value {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        })
    }
}

#[async_trait]
impl CaptureTarget for ChromiumElement {
    async fn prepare(&self, markers: &CaptureMarkers) -> Result<CaptureInfo> {
        // Objects come back by reference, so the payload is stringified.
        let function = format!(
            "function() {{ \
                this.dispatchEvent(new CustomEvent({event})); \
                return JSON.stringify({{ \
                    id: this.id, \
                    wantsFocus: this.classList.contains({focus}), \
                    wantsHover: this.classList.contains({hover}) \
                }}); \
            }}",
            event = js_string(&markers.prepare_event)?,
            focus = js_string(&markers.focus_class)?,
            hover = js_string(&markers.hover_class)?,
        );
        let payload = self
            .call(function)
            .await?
            .ok_or_else(|| VrtError::browser("Capture element returned no metadata"))?;
        Ok(serde_json::from_str(&payload)?)
    }

    async fn focus_first_child(&self) -> Result<()> {
        self.call("function() { this.firstElementChild.focus(); }".to_string())
            .await?;
        Ok(())
    }

    async fn hover_first_child(&self) -> Result<()> {
        let child = self
            .element
            .find_element(":scope > *")
            .await
            .map_err(cdp)?;
        child.hover().await.map_err(cdp)?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.element.scroll_into_view().await.map_err(cdp)?;
        let rect = self
            .call(
                "function() { \
                    const r = this.getBoundingClientRect(); \
                    return JSON.stringify({ \
                        x: r.left + window.scrollX, \
                        y: r.top + window.scrollY, \
                        width: r.width, \
                        height: r.height \
                    }); \
                }"
                .to_string(),
            )
            .await?
            .ok_or_else(|| VrtError::browser("Capture element has no layout box"))?;
        let rect: PageRect = serde_json::from_str(&rect)?;

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .clip(ClipRect {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                scale: 1.0,
            })
            .capture_beyond_viewport(true)
            .omit_background(true)
            .build();

        self.page.screenshot(params).await.map_err(cdp)
    }

    async fn remove(&self, markers: &CaptureMarkers) -> Result<()> {
        let function = format!(
            "function() {{ this.dispatchEvent(new CustomEvent({event})); }}",
            event = js_string(&markers.remove_event)?,
        );
        self.call(function).await?;
        Ok(())
    }
}
