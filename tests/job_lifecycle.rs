//! End-to-end job lifecycle tests against a stub encoder script. The stub
//! answers the probe with a fixed duration, replays stats lines the way
//! ffmpeg writes them (carriage-return terminated), and records every
//! invocation so tests can assert on spawn counts and pass ordering.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vidopt::engine::{EncodeJob, JobEvent, Mode, start_job};

const INPUT_SIZE: usize = 4000;
const OUTPUT_SIZE: usize = 1000;

/// Stub body shared by the happy-path tests: five advancing time markers,
/// then an output file unless the last operand is the null sink.
const ENCODE_OK: &str = r#"
for t in 02 04 06 08 10; do
    printf 'frame=1 fps=25 q=28.0 size=256KiB time=00:00:%s.00 bitrate=400.0kbits/s speed=2x\r' "$t" >&2
done
printf '\n' >&2
out=""
for a in "$@"; do out="$a"; done
if [ "$out" != "-" ]; then
    head -c 1000 /dev/zero > "$out"
fi
"#;

struct Fixture {
    dir: TempDir,
    ffmpeg: PathBuf,
    calls_file: PathBuf,
}

impl Fixture {
    /// Write a stub encoder. `probe_body` runs for `<stub> -i <input>`
    /// invocations, `encode_body` for everything else; both see the full
    /// argv, and every invocation is appended to the calls file.
    fn new(probe_body: &str, encode_body: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let calls_file = dir.path().join("calls.log");
        let ffmpeg = dir.path().join("ffmpeg");

        let script = format!(
            "#!/bin/sh\necho \"$@\" >> \"{calls}\"\nif [ \"$#\" -eq 2 ]; then\n{probe_body}\nexit 1\nfi\n{encode_body}\n",
            calls = calls_file.display(),
        );
        fs::write(&ffmpeg, script).unwrap();
        let mut perms = fs::metadata(&ffmpeg).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&ffmpeg, perms).unwrap();

        Self {
            dir,
            ffmpeg,
            calls_file,
        }
    }

    fn with_duration(encode_body: &str) -> Self {
        Self::new(
            r#"echo "  Duration: 00:00:10.00, start: 0.000000, bitrate: 1000 kb/s" >&2"#,
            encode_body,
        )
    }

    fn job(&self, mode: Mode, reduction: u32) -> EncodeJob {
        let input = self.dir.path().join("input.mp4");
        fs::write(&input, vec![0u8; INPUT_SIZE]).unwrap();
        EncodeJob::new(
            input,
            self.dir.path().join("output.mp4"),
            reduction,
            mode,
            "libx264".to_string(),
        )
    }

    fn calls(&self) -> Vec<String> {
        fs::read_to_string(&self.calls_file)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn drain(handle: vidopt::engine::JobHandle) -> Vec<JobEvent> {
    let events: Vec<JobEvent> = handle.events.iter().collect();
    handle.join();
    events
}

fn terminal_status(events: &[JobEvent]) -> &str {
    match events.last() {
        Some(JobEvent::Status(s)) => s,
        other => panic!("expected a terminal status, got {other:?}"),
    }
}

#[test]
fn quality_job_completes_and_reports_reduction() {
    let fixture = Fixture::with_duration(ENCODE_OK);
    let job = fixture.job(Mode::Quality, 20);

    let events = drain(start_job(job, fixture.ffmpeg.clone()));

    let expected = format!(
        "Completed ({:.1}% reduced)",
        100.0 * (1.0 - OUTPUT_SIZE as f64 / INPUT_SIZE as f64)
    );
    assert_eq!(terminal_status(&events), expected);

    // Probe plus exactly one encode invocation, at the computed CRF.
    let calls = fixture.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].ends_with("input.mp4"));
    assert!(calls[1].contains("-crf 25"));
    assert!(!calls[1].contains("-pass"));
}

#[test]
fn quality_job_progress_is_monotone_within_range() {
    let fixture = Fixture::with_duration(ENCODE_OK);
    let job = fixture.job(Mode::Quality, 20);

    let events = drain(start_job(job, fixture.ffmpeg.clone()));

    let progress: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            JobEvent::Progress(p) => Some(*p),
            JobEvent::Status(_) => None,
        })
        .collect();
    assert!(!progress.is_empty());
    for pair in progress.windows(2) {
        assert!(pair[0] <= pair[1], "progress went backwards: {progress:?}");
    }
    for p in &progress {
        assert!((1.0..=100.0).contains(p));
    }
}

#[test]
fn size_mode_runs_analysis_pass_before_final_pass() {
    let fixture = Fixture::with_duration(ENCODE_OK);
    let job = fixture.job(Mode::Size, 50);

    let events = drain(start_job(job, fixture.ffmpeg.clone()));

    assert!(terminal_status(&events).starts_with("Completed ("));

    let calls = fixture.calls();
    assert_eq!(calls.len(), 3, "probe, pass 1, pass 2: {calls:?}");
    assert!(calls[1].contains("-pass 1"));
    assert!(calls[1].contains("-an"));
    assert!(calls[1].ends_with("-f null -"));
    assert!(calls[2].contains("-pass 2"));
    assert!(calls[2].ends_with("output.mp4"));

    // Phase 2's progress range strictly follows phase 1's.
    let progress: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            JobEvent::Progress(p) => Some(*p),
            JobEvent::Status(_) => None,
        })
        .collect();
    assert!(progress.iter().any(|p| *p <= 50.0));
    assert!(progress.iter().any(|p| *p > 50.0));
}

#[test]
fn missing_duration_fails_without_spawning_an_encoder() {
    // Probe branch prints nothing, so no duration marker is found.
    let fixture = Fixture::new(":", ENCODE_OK);
    let job = fixture.job(Mode::Size, 50);

    let events = drain(start_job(job, fixture.ffmpeg.clone()));

    assert_eq!(terminal_status(&events), "Failed: cannot read video duration");
    assert!(
        events
            .iter()
            .all(|e| !matches!(e, JobEvent::Progress(_))),
        "no progress events expected: {events:?}"
    );
    assert_eq!(fixture.calls().len(), 1, "only the probe may run");
}

#[test]
fn missing_encoder_binary_fails_the_job() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.mp4");
    fs::write(&input, vec![0u8; INPUT_SIZE]).unwrap();
    let job = EncodeJob::new(
        input,
        dir.path().join("output.mp4"),
        20,
        Mode::Quality,
        "libx264".to_string(),
    );

    let events = drain(start_job(job, dir.path().join("no-such-ffmpeg")));
    // The probe is the first thing to touch the binary, so its absence
    // surfaces as an unreadable duration.
    assert_eq!(terminal_status(&events), "Failed: cannot read video duration");
}

#[test]
fn cancellation_stops_the_job_and_skips_the_final_pass() {
    let fixture = Fixture::with_duration(
        r#"
i=1
while [ "$i" -le 100 ]; do
    printf 'frame=%s fps=25 q=28.0 size=100KiB time=00:00:%02d.00 bitrate=300.0kbits/s speed=1x\r' "$i" "$i" >&2
    sleep 0.1
    i=$((i+1))
done
"#,
    );
    let job = fixture.job(Mode::Size, 50);

    let handle = start_job(job, fixture.ffmpeg.clone());
    let mut events = Vec::new();
    let mut stopped_requested = false;
    for event in &handle.events {
        if !stopped_requested && matches!(event, JobEvent::Progress(_)) {
            handle.stop();
            stopped_requested = true;
        }
        events.push(event);
    }
    handle.join();

    assert!(stopped_requested, "expected at least one progress event");
    assert_eq!(terminal_status(&events), "Stopped");

    // No progress after the terminal status, and pass 2 never launched.
    let stopped_at = events
        .iter()
        .position(|e| matches!(e, JobEvent::Status(s) if s == "Stopped"))
        .unwrap();
    assert!(
        events[stopped_at + 1..]
            .iter()
            .all(|e| !matches!(e, JobEvent::Progress(_)))
    );
    let calls = fixture.calls();
    assert_eq!(calls.len(), 2, "probe and pass 1 only: {calls:?}");
    assert!(calls[1].contains("-pass 1"));
}
