//! Run Orchestrator: serves the page, drives every capture and settles the
//! run's outcome.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, error, info, warn};
use url::Url;

use crate::browser::{
    launch_with_retry, spawn_console_relay, BrowserLauncher, CaptureBrowser, CapturePage,
};
use crate::capture::{capture, discover_elements};
use crate::config::Config;
use crate::reconcile::reconcile_screenshots;
use crate::report::generate_report;
use crate::server::PageServer;
use crate::types::{Mode, RunSummary, Verdict};
use crate::{Result, VrtError};

/// Stages of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Booting,
    BrowserLaunching,
    Capturing,
    Reporting,
    Reconciling,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Booting => "booting",
            Phase::BrowserLaunching => "browser-launching",
            Phase::Capturing => "capturing",
            Phase::Reporting => "reporting",
            Phase::Reconciling => "reconciling",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

fn enter(phase: Phase) {
    debug!(%phase, "entering phase");
}

/// One visual regression run over the configured page.
pub struct Harness<L> {
    config: Config,
    mode: Mode,
    launcher: L,
}

impl<L: BrowserLauncher> Harness<L> {
    pub fn new(config: Config, mode: Mode, launcher: L) -> Self {
        Self {
            config,
            mode,
            launcher,
        }
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Runs every stage and returns what the run produced.
    ///
    /// Mismatches, unreadable golden images and stale screenshots are
    /// recorded in the summary's outcome. Launch exhaustion, duplicate
    /// capture ids and broken browser or server plumbing end the run with
    /// an error. The browser and server are shut down either way.
    pub async fn run(&self) -> Result<RunSummary> {
        enter(Phase::Booting);
        let server = PageServer::start(&self.config.page_dir, self.config.listen).await?;

        let result = match server.origin() {
            Ok(origin) => self.run_with_server(&origin).await,
            Err(err) => Err(err),
        };

        server.shutdown().await;
        enter(Phase::Done);
        result
    }

    async fn run_with_server(&self, origin: &Url) -> Result<RunSummary> {
        enter(Phase::BrowserLaunching);
        let mut browser = launch_with_retry(&self.launcher, self.config.launch_attempts).await?;

        let result = self.run_with_browser(&mut browser, origin).await;

        if let Err(err) = browser.close().await {
            warn!("Failed to close browser: {err}");
        }
        result
    }

    async fn run_with_browser(
        &self,
        browser: &mut L::Browser,
        origin: &Url,
    ) -> Result<RunSummary> {
        enter(Phase::Capturing);
        let page = browser.open_page().await?;
        let relay = spawn_console_relay(&page, self.config.console_suppress.clone()).await?;

        let captured = self.capture_all(&page, origin).await;
        relay.abort();
        let mut summary = captured?;

        if self.mode == Mode::Check && !summary.mismatches.is_empty() {
            enter(Phase::Reporting);
            generate_report(&self.config.report_dir, &summary.mismatches).await?;
        }

        enter(Phase::Reconciling);
        let produced: HashSet<String> = summary.filenames.iter().cloned().collect();
        summary.stale =
            reconcile_screenshots(&self.config.screenshots_dir, &produced, self.mode).await?;
        if self.mode == Mode::Check && !summary.stale.is_empty() {
            summary.outcome.fail();
        }

        Ok(summary)
    }

    /// Captures every element in document order, aborting on the first
    /// repeated capture id.
    async fn capture_all<P: CapturePage>(&self, page: &P, origin: &Url) -> Result<RunSummary> {
        page.navigate(origin.as_str()).await?;
        let elements = discover_elements(page, &self.config.markers).await?;
        debug!("Found {} capture elements", elements.len());

        let mut summary = RunSummary {
            mode: self.mode,
            ..RunSummary::default()
        };
        let mut seen = HashSet::with_capacity(elements.len());

        for element in &elements {
            let captured = capture(page, element, self.mode, &self.config).await?;
            let filename = captured.filename();
            if !seen.insert(filename.clone()) {
                let err = VrtError::duplicate_capture_id(captured.id);
                error!("{}", err.to_payload().message);
                return Err(err);
            }

            if captured.verdict.is_failure() {
                summary.outcome.fail();
            }
            match captured.verdict {
                Verdict::Saved | Verdict::Matched => {}
                Verdict::Unreadable(_) => summary.unreadable.push(filename.clone()),
                Verdict::Mismatch(mismatch) => summary.mismatches.push(mismatch),
            }
            summary.filenames.push(filename);
        }

        match self.mode {
            Mode::Update => info!("Saved {} screenshots", summary.filenames.len()),
            Mode::Check => info!("Checked {} screenshots", summary.filenames.len()),
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeBrowser, FakeElement, FakeLauncher, FakePage};
    use crate::raster::{self, RasterImage};
    use std::net::SocketAddr;
    use std::path::Path;
    use tempfile::TempDir;

    fn png(pixel: [u8; 4]) -> Vec<u8> {
        raster::encode(&RasterImage::filled(4, 3, pixel)).expect("encode png")
    }

    fn config_in(dir: &Path) -> Config {
        let page_dir = dir.join("dist");
        std::fs::create_dir_all(&page_dir).unwrap();
        std::fs::write(page_dir.join("index.html"), "<div class=\"capture-component\"></div>")
            .unwrap();
        Config {
            page_dir,
            screenshots_dir: dir.join("screenshots"),
            report_dir: dir.join("report"),
            listen: SocketAddr::from(([127, 0, 0, 1], 0)),
            ..Config::default()
        }
    }

    fn harness(
        config: Config,
        mode: Mode,
        elements: Vec<FakeElement>,
    ) -> (Harness<FakeLauncher>, FakeBrowser) {
        let browser = FakeBrowser::new(FakePage::with_elements(elements));
        let launcher = FakeLauncher::new(browser.clone());
        (Harness::new(config, mode, launcher), browser)
    }

    fn seed_golden(config: &Config, name: &str, bytes: &[u8]) {
        std::fs::create_dir_all(&config.screenshots_dir).unwrap();
        std::fs::write(config.screenshots_dir.join(name), bytes).unwrap();
    }

    #[tokio::test]
    async fn empty_page_in_check_mode_passes() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let (harness, browser) = harness(config.clone(), Mode::Check, vec![]);

        let summary = harness.run().await.unwrap();

        assert!(summary.filenames.is_empty());
        assert!(summary.mismatches.is_empty());
        assert_eq!(summary.exit_code(), 0);
        assert!(!config.report_dir.exists());
        assert!(browser.is_closed());
    }

    #[tokio::test]
    async fn first_update_run_writes_golden() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let shot = png([20, 40, 60, 255]);
        let (harness, _) = harness(
            config.clone(),
            Mode::Update,
            vec![FakeElement::new("button", shot.clone())],
        );

        let summary = harness.run().await.unwrap();

        assert_eq!(summary.filenames, vec!["button.png"]);
        assert_eq!(summary.exit_code(), 0);
        assert_eq!(
            std::fs::read(config.screenshots_dir.join("button.png")).unwrap(),
            shot
        );
    }

    #[tokio::test]
    async fn unchanged_check_run_passes() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let shot = png([20, 40, 60, 255]);
        seed_golden(&config, "button.png", &shot);
        let (harness, _) = harness(config.clone(), Mode::Check, vec![FakeElement::new("button", shot)]);

        let summary = harness.run().await.unwrap();

        assert!(summary.mismatches.is_empty());
        assert!(summary.stale.is_empty());
        assert_eq!(summary.exit_code(), 0);
        assert!(!config.report_dir.exists());
    }

    #[tokio::test]
    async fn changed_check_run_fails_with_report() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        seed_golden(&config, "button.png", &png([20, 40, 60, 255]));
        let (harness, _) = harness(
            config.clone(),
            Mode::Check,
            vec![FakeElement::new("button", png([20, 40, 61, 255]))],
        );

        let summary = harness.run().await.unwrap();

        assert_eq!(summary.mismatches.len(), 1);
        assert_eq!(summary.mismatches[0].name, "button");
        assert_eq!(summary.exit_code(), 1);
        assert!(config.report_dir.join("index.html").is_file());
        assert!(config.report_dir.join("button-diff.png").is_file());
    }

    #[tokio::test]
    async fn missing_golden_fails_without_report() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let (harness, _) = harness(
            config.clone(),
            Mode::Check,
            vec![FakeElement::new("fresh", png([0, 0, 0, 0]))],
        );

        let summary = harness.run().await.unwrap();

        assert!(summary.mismatches.is_empty());
        assert_eq!(summary.unreadable, vec!["fresh.png"]);
        assert_eq!(summary.exit_code(), 1);
        assert!(!config.report_dir.exists());
    }

    #[tokio::test]
    async fn recoverable_failures_do_not_stop_later_captures() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let shot = png([9, 9, 9, 255]);
        seed_golden(&config, "a.png", &png([8, 8, 8, 255]));
        seed_golden(&config, "c.png", &shot);
        let (harness, _) = harness(
            config.clone(),
            Mode::Check,
            vec![
                FakeElement::new("a", shot.clone()),
                FakeElement::new("b", shot.clone()),
                FakeElement::new("c", shot),
            ],
        );

        let summary = harness.run().await.unwrap();

        assert_eq!(summary.filenames, vec!["a.png", "b.png", "c.png"]);
        assert_eq!(summary.mismatches.len(), 1);
        assert_eq!(summary.mismatches[0].name, "a");
        assert_eq!(summary.unreadable, vec!["b.png"]);
        assert!(summary.stale.is_empty());
        assert_eq!(summary.exit_code(), 1);
        assert!(config.report_dir.join("a-diff.png").is_file());
    }

    #[tokio::test]
    async fn duplicate_ids_abort_before_report() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        seed_golden(&config, "twin.png", &png([1, 1, 1, 255]));
        let (harness, browser) = harness(
            config.clone(),
            Mode::Check,
            vec![
                FakeElement::new("twin", png([2, 2, 2, 255])),
                FakeElement::new("twin", png([3, 3, 3, 255])),
            ],
        );

        let err = harness.run().await.unwrap_err();

        match err {
            VrtError::DuplicateCaptureId { id } => assert_eq!(id, "twin"),
            other => panic!("expected DuplicateCaptureId, got {other:?}"),
        }
        assert!(!config.report_dir.exists());
        assert!(browser.is_closed());
    }

    #[tokio::test]
    async fn stale_golden_fails_check_mode() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let shot = png([5, 5, 5, 255]);
        seed_golden(&config, "live.png", &shot);
        seed_golden(&config, "retired.png", &shot);
        let (harness, _) = harness(config.clone(), Mode::Check, vec![FakeElement::new("live", shot)]);

        let summary = harness.run().await.unwrap();

        assert_eq!(summary.stale, vec!["retired.png"]);
        assert_eq!(summary.exit_code(), 1);
        assert!(config.screenshots_dir.join("retired.png").exists());
    }

    #[tokio::test]
    async fn stale_golden_is_deleted_in_update_mode() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let shot = png([5, 5, 5, 255]);
        seed_golden(&config, "retired.png", &shot);
        let (harness, _) = harness(config.clone(), Mode::Update, vec![FakeElement::new("live", shot)]);

        let summary = harness.run().await.unwrap();

        assert_eq!(summary.stale, vec!["retired.png"]);
        assert_eq!(summary.exit_code(), 0);
        assert!(!config.screenshots_dir.join("retired.png").exists());
        assert!(config.screenshots_dir.join("live.png").exists());
    }

    #[tokio::test]
    async fn exhausted_launch_is_fatal() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            launch_attempts: 3,
            ..config_in(dir.path())
        };
        let launcher = FakeLauncher::failing_first(u32::MAX, FakeBrowser::new(FakePage::default()));
        let harness = Harness::new(config, Mode::Check, launcher);

        let err = harness.run().await.unwrap_err();

        assert!(matches!(err, VrtError::LaunchExhausted { attempts: 3, .. }));
        assert_eq!(harness.launcher().attempts(), 3);
    }

    #[tokio::test]
    async fn page_is_loaded_from_served_origin() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let page = FakePage::with_elements(vec![]);
        let log = page.log.clone();
        let harness = Harness::new(config, Mode::Check, FakeLauncher::new(FakeBrowser::new(page)));

        harness.run().await.unwrap();

        let calls = log.calls();
        assert_eq!(calls[0], "open_page");
        assert!(calls[1].starts_with("navigate:http://127.0.0.1:"), "{calls:?}");
        assert_eq!(calls[2], "find_all:.capture-component");
        assert_eq!(calls.last().map(String::as_str), Some("close"));
    }

    #[test]
    fn phases_display_in_kebab_case() {
        assert_eq!(Phase::BrowserLaunching.to_string(), "browser-launching");
        assert_eq!(Phase::Done.to_string(), "done");
    }
}
