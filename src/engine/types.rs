use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// How the target reduction is pursued: constant quality (single pass) or a
/// bitrate computed from the target size (two passes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Quality,
    Size,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quality" => Ok(Mode::Quality),
            "size" => Ok(Mode::Size),
            other => Err(format!(
                "unknown mode '{other}' (expected 'size' or 'quality')"
            )),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Quality => write!(f, "quality"),
            Mode::Size => write!(f, "size"),
        }
    }
}

/// One encode run. Owned by the job controller from creation to its terminal
/// status; `duration_s` and `source_size` are resolved at job start, before
/// any encoder subprocess is launched.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub id: Uuid,
    pub input_path: PathBuf,
    pub output_path: PathBuf,

    /// Target shrinkage of the output relative to the input, in percent.
    /// The CLI constrains this to 5..=80; the engine tolerates any value.
    pub reduction: u32,
    pub mode: Mode,

    /// Video codec identifier handed to ffmpeg verbatim (e.g. "libx264").
    pub codec: String,

    /// Extra ffmpeg arguments appended to real-output invocations,
    /// shell-style quoted.
    pub extra_args: String,

    // Resolved at job start
    pub duration_s: Option<f64>,
    pub source_size: u64,
}

impl EncodeJob {
    pub fn new(
        input_path: PathBuf,
        output_path: PathBuf,
        reduction: u32,
        mode: Mode,
        codec: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_path,
            output_path,
            reduction,
            mode,
            codec,
            extra_args: String::new(),
            duration_s: None,
            source_size: 0,
        }
    }
}

/// Encode parameters derived once per job, immutable after planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodePlan {
    /// Quality mode: single pass at this constant rate factor.
    Crf(u32),
    /// Size mode: two passes at this video bitrate.
    Bitrate { video_kbps: u32 },
}

/// Event delivered to the embedding application. Status strings beginning
/// with `Completed` or `Failed`, or exactly `Stopped`, are terminal: no
/// further events follow on the same job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum JobEvent {
    /// Overall job progress on a single 0-100 scale across all phases.
    Progress(f64),
    /// Human-readable phase or outcome description.
    Status(String),
}

impl JobEvent {
    /// Whether this event signals job termination to the caller.
    pub fn is_terminal(&self) -> bool {
        match self {
            JobEvent::Progress(_) => false,
            JobEvent::Status(s) => {
                s.starts_with("Completed") || s.starts_with("Failed") || s == "Stopped"
            }
        }
    }
}
