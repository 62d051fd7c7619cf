use std::fmt;

use serde::{Deserialize, Serialize};

/// Run-wide mode, fixed at start from the `--update` switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Compare fresh screenshots against golden images.
    #[default]
    Check,
    /// Overwrite golden images with fresh screenshots.
    Update,
}

impl Mode {
    pub fn from_update_flag(update: bool) -> Self {
        if update {
            Mode::Update
        } else {
            Mode::Check
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Check => f.write_str("check"),
            Mode::Update => f.write_str("update"),
        }
    }
}

/// What a capture element reports about itself after the pre-capture signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureInfo {
    pub id: String,
    #[serde(default)]
    pub wants_focus: bool,
    #[serde(default)]
    pub wants_hover: bool,
}

impl CaptureInfo {
    /// Name of the golden image for this capture.
    pub fn filename(&self) -> String {
        golden_filename(&self.id)
    }
}

pub fn golden_filename(id: &str) -> String {
    format!("{id}.png")
}

/// A failed comparison, holding the PNG bytes for the report.
#[derive(Clone, PartialEq, Eq)]
pub struct MismatchResult {
    pub name: String,
    pub expected: Vec<u8>,
    pub actual: Vec<u8>,
    pub diff: Vec<u8>,
}

impl fmt::Debug for MismatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MismatchResult")
            .field("name", &self.name)
            .field("expected", &format_args!("{} bytes", self.expected.len()))
            .field("actual", &format_args!("{} bytes", self.actual.len()))
            .field("diff", &format_args!("{} bytes", self.diff.len()))
            .finish()
    }
}

/// Result of driving one capture element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Update mode wrote the golden image.
    Saved,
    /// Check mode found a pixel-identical golden image.
    Matched,
    /// Check mode could not read or decode the golden image.
    Unreadable(String),
    /// Check mode found differences.
    Mismatch(MismatchResult),
}

impl Verdict {
    pub fn is_failure(&self) -> bool {
        matches!(self, Verdict::Unreadable(_) | Verdict::Mismatch(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub id: String,
    pub verdict: Verdict,
}

impl Capture {
    pub fn filename(&self) -> String {
        golden_filename(&self.id)
    }
}

/// Run-wide pass/fail state. Once failed it stays failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOutcome {
    failed: bool,
}

impl RunOutcome {
    pub fn fail(&mut self) {
        self.failed = true;
    }

    pub fn is_failure(self) -> bool {
        self.failed
    }

    pub fn exit_code(self) -> u8 {
        u8::from(self.failed)
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub mode: Mode,
    /// Golden filenames produced this run, in capture order.
    pub filenames: Vec<String>,
    pub mismatches: Vec<MismatchResult>,
    /// Files in the screenshot directory that no capture produced.
    pub stale: Vec<String>,
    /// Captures whose golden image could not be read.
    pub unreadable: Vec<String>,
    pub outcome: RunOutcome,
}

impl RunSummary {
    pub fn exit_code(&self) -> u8 {
        self.outcome.exit_code()
    }
}
