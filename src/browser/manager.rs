//! Browser lifecycle helpers shared by every [`BrowserLauncher`].

use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{BrowserLauncher, CapturePage};
use crate::{Result, VrtError};

/// Launches a browser, retrying immediately on failure.
///
/// Gives up with [`VrtError::LaunchExhausted`] after `max_attempts` failed
/// launches. A zero `max_attempts` still makes one attempt.
pub async fn launch_with_retry<L: BrowserLauncher>(
    launcher: &L,
    max_attempts: u32,
) -> Result<L::Browser> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match launcher.launch().await {
            Ok(browser) => return Ok(browser),
            Err(err) => {
                error!("{err}");
                if attempt >= max_attempts {
                    return Err(VrtError::LaunchExhausted {
                        attempts: attempt,
                        last_error: err.to_string(),
                    });
                }
                warn!("Browser failed to launch (attempt {attempt}/{max_attempts}), trying again...");
                attempt += 1;
            }
        }
    }
}

/// Whether a console message matches one of the suppressed patterns.
pub fn is_suppressed(text: &str, suppress: &[String]) -> bool {
    suppress
        .iter()
        .any(|pattern| !pattern.is_empty() && text.contains(pattern.as_str()))
}

/// Relays the page's console output to the log until the page goes away.
pub async fn spawn_console_relay<P: CapturePage>(
    page: &P,
    suppress: Vec<String>,
) -> Result<JoinHandle<()>> {
    let mut messages = page.console_messages().await?;
    Ok(tokio::spawn(async move {
        while let Some(text) = messages.next().await {
            if !is_suppressed(&text, &suppress) {
                info!(target: "page", "{text}");
            }
        }
    }))
}
