use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VrtError};
use crate::Viewport;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "VRT_CONFIG";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "vrt.toml";

pub const DEFAULT_LAUNCH_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the compiled page that gets served.
    pub page_dir: PathBuf,
    /// Golden images, one `<id>.png` per capture.
    pub screenshots_dir: PathBuf,
    /// Mismatch report output.
    pub report_dir: PathBuf,
    /// Local address the page is served from.
    pub listen: SocketAddr,
    pub launch_attempts: u32,
    pub markers: CaptureMarkers,
    /// Console messages containing any of these are not relayed.
    pub console_suppress: Vec<String>,
    pub browser: BrowserSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_dir: PathBuf::from("vrt/dist"),
            screenshots_dir: PathBuf::from("vrt/screenshots"),
            report_dir: PathBuf::from("vrt/report"),
            listen: SocketAddr::from(([127, 0, 0, 1], 8123)),
            launch_attempts: DEFAULT_LAUNCH_ATTEMPTS,
            markers: CaptureMarkers::default(),
            console_suppress: vec!["react-devtools".to_string()],
            browser: BrowserSettings::default(),
        }
    }
}

/// How capture regions are marked up in the served page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureMarkers {
    pub selector: String,
    pub focus_class: String,
    pub hover_class: String,
    pub prepare_event: String,
    pub remove_event: String,
}

impl Default for CaptureMarkers {
    fn default() -> Self {
        Self {
            selector: ".capture-component".to_string(),
            focus_class: "focus".to_string(),
            hover_class: "hover".to_string(),
            prepare_event: "screenshot".to_string(),
            remove_event: "remove".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserSettings {
    /// Chrome/Chromium binary; detected by chromiumoxide when unset.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub viewport: Viewport,
    pub hide_scrollbars: bool,
    /// `None` waits for navigation indefinitely.
    #[serde(with = "humantime_serde")]
    pub navigation_timeout: Option<Duration>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            viewport: Viewport::default(),
            hide_scrollbars: false,
            navigation_timeout: None,
        }
    }
}

impl Config {
    /// Loads the config: `path` if given, else `$VRT_CONFIG`, else
    /// `./vrt.toml` if it exists, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_ENV).map(PathBuf::from));

        let source = match explicit {
            Some(p) => Some(p),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                local.is_file().then_some(local)
            }
        };

        let cfg = match source {
            Some(p) => Self::from_file(&p)?,
            None => Self::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            VrtError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        toml::from_str(&raw)
            .map_err(|e| VrtError::config(format!("Invalid config ({}): {}", path.display(), e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.launch_attempts == 0 {
            return Err(VrtError::config("launch_attempts must be at least 1"));
        }
        if self.markers.selector.trim().is_empty() {
            return Err(VrtError::config("markers.selector must not be empty"));
        }
        if self.screenshots_dir == self.report_dir {
            return Err(VrtError::config(
                "screenshots_dir and report_dir must be different directories",
            ));
        }
        Ok(())
    }

    /// Path of the golden image for `filename`.
    pub fn golden_path(&self, filename: &str) -> PathBuf {
        self.screenshots_dir.join(filename)
    }
}
