//! Parsing of ffmpeg's streaming stats output into a normalized progress
//! signal. Lines without a time marker are simply not progress, never errors.

/// Minimum advance (in progress points) before another update is emitted.
/// Debounce only; nothing downstream depends on the exact value.
pub const MIN_STEP: f64 = 0.5;

/// Total seconds from a leading `H:MM:SS[.frac]` clock, tolerating trailing
/// text (`, start: …`, ` bitrate=…`).
pub(crate) fn parse_clock(text: &str) -> Option<f64> {
    let token: &str = text
        .split(|c: char| !(c.is_ascii_digit() || c == ':' || c == '.'))
        .next()
        .unwrap_or("");
    let mut parts = token.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Elapsed encode time from a stats line carrying a `time=H:MM:SS.ff` marker.
pub fn parse_time_marker(line: &str) -> Option<f64> {
    let idx = line.find("time=")?;
    parse_clock(&line[idx + "time=".len()..])
}

/// Maps one phase's elapsed-time markers into its slice of the overall 0-100
/// progress scale, debouncing sub-[`MIN_STEP`] updates.
#[derive(Debug)]
pub struct PhaseProgress {
    duration_s: f64,
    lo: f64,
    hi: f64,
    last_emitted: f64,
}

impl PhaseProgress {
    pub fn new(duration_s: f64, lo: f64, hi: f64) -> Self {
        Self {
            duration_s,
            lo,
            hi,
            last_emitted: lo,
        }
    }

    /// Mapped progress for `line`, or `None` for lines without a time marker
    /// and for updates that have not advanced by [`MIN_STEP`] yet.
    pub fn observe(&mut self, line: &str) -> Option<f64> {
        let elapsed = parse_time_marker(line)?;
        let pct = self.map(elapsed);
        if pct - self.last_emitted >= MIN_STEP {
            self.last_emitted = pct;
            return Some(pct);
        }
        None
    }

    /// Map an elapsed time into this phase's sub-range, clamped to [1, 100].
    pub fn map(&self, elapsed_s: f64) -> f64 {
        let fraction = if self.duration_s > 0.0 {
            (elapsed_s / self.duration_s).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (self.lo + fraction * (self.hi - self.lo)).clamp(1.0, 100.0)
    }
}
