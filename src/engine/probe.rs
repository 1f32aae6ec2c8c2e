//! Source inspection via the encoder binary itself: `ffmpeg -i <input>`
//! prints a banner with a `Duration:` marker on its diagnostic stream.

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;
use tracing::debug;

use super::process::suppress_console;
use super::progress::parse_clock;

/// Duration of `input` in seconds, or `None` if the encoder is missing or
/// its output carries no duration marker. Absence is not an error at this
/// layer; the job controller decides what it means.
///
/// The child's exit status is deliberately ignored: `ffmpeg -i` without an
/// output file always exits non-zero while still printing the banner.
pub fn probe_duration(ffmpeg: &Path, input: &Path) -> Option<f64> {
    let mut cmd = Command::new(ffmpeg);
    cmd.arg("-i").arg(input);
    suppress_console(&mut cmd);

    let output = match cmd.output() {
        Ok(output) => output,
        Err(e) => {
            debug!("probe spawn failed for {}: {e}", ffmpeg.display());
            return None;
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    stderr
        .lines()
        .find_map(parse_duration_marker)
        .or_else(|| stdout.lines().find_map(parse_duration_marker))
}

/// First `Duration: H:MM:SS[.frac]` marker on a banner line.
pub fn parse_duration_marker(line: &str) -> Option<f64> {
    let rest = line.trim_start().strip_prefix("Duration:")?;
    parse_clock(rest.trim_start())
}

/// First line of `ffmpeg -version`, for diagnostics.
pub fn ffmpeg_version(ffmpeg: &Path) -> Result<String> {
    let output = Command::new(ffmpeg)
        .arg("-version")
        .output()
        .context("Failed to execute ffmpeg")?;

    if !output.status.success() {
        anyhow::bail!("ffmpeg -version exited with {}", output.status);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or("unknown").to_string())
}
