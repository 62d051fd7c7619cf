//! Capture Driver: screenshots one capture element and settles it against
//! its golden image.

use tracing::{debug, error};

use crate::browser::{CapturePage, CaptureTarget};
use crate::config::{CaptureMarkers, Config};
use crate::types::{Capture, CaptureInfo, MismatchResult, Mode, Verdict};
use crate::{pixel, raster, Result};

/// All capture elements on the page, in document order.
pub async fn discover_elements<P: CapturePage>(
    page: &P,
    markers: &CaptureMarkers,
) -> Result<Vec<P::Element>> {
    page.find_all(&markers.selector).await
}

/// Captures `element` and either stores the screenshot as the new golden
/// image or compares it against the stored one, depending on `mode`.
///
/// Golden images that cannot be read are reported through
/// [`Verdict::Unreadable`]; only browser and filesystem-write failures are
/// returned as errors. The element is signalled to remove itself whatever
/// happens.
pub async fn capture<P: CapturePage>(
    page: &P,
    element: &P::Element,
    mode: Mode,
    config: &Config,
) -> Result<Capture> {
    let result = settle(page, element, mode, config).await;
    let removed = element.remove(&config.markers).await;
    let capture = result?;
    removed?;
    Ok(capture)
}

async fn settle<P: CapturePage>(
    page: &P,
    element: &P::Element,
    mode: Mode,
    config: &Config,
) -> Result<Capture> {
    page.reset_pointer().await?;

    let info = element.prepare(&config.markers).await?;
    if info.wants_focus {
        element.focus_first_child().await?;
    }
    if info.wants_hover {
        element.hover_first_child().await?;
    }

    let golden = config.golden_path(&info.filename());
    debug!("Capturing {} ({mode})", info.id);

    let verdict = match mode {
        Mode::Update => {
            let png = element.screenshot().await?;
            tokio::fs::create_dir_all(&config.screenshots_dir).await?;
            tokio::fs::write(&golden, &png).await?;
            Verdict::Saved
        }
        Mode::Check => {
            let (expected, actual) = tokio::join!(tokio::fs::read(&golden), element.screenshot());
            let actual = actual?;
            match expected {
                Ok(expected) => check(&info, expected, actual)?,
                Err(err) => {
                    error!("Failed to read {}: {err}", golden.display());
                    Verdict::Unreadable(err.to_string())
                }
            }
        }
    };

    Ok(Capture {
        id: info.id,
        verdict,
    })
}

fn check(info: &CaptureInfo, expected: Vec<u8>, actual: Vec<u8>) -> Result<Verdict> {
    let expected_image = match raster::decode(&expected) {
        Ok(image) => image,
        Err(err) => {
            error!("Failed to decode golden image {}: {err}", info.filename());
            return Ok(Verdict::Unreadable(err.to_string()));
        }
    };
    let actual_image = raster::decode(&actual)?;

    let Some(diff) = pixel::compare(&expected_image, &actual_image) else {
        return Ok(Verdict::Matched);
    };

    error!("Screenshot mismatch found for test {}", info.id);
    Ok(Verdict::Mismatch(MismatchResult {
        name: info.id.clone(),
        expected,
        actual,
        diff: raster::encode(&diff)?,
    }))
}
