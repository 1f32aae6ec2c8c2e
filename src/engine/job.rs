//! The encoding-job state machine: probe, plan, one or two encoder phases,
//! cleanup, terminal classification. Everything a job can do ends up as an
//! event on the caller's channel; this module never panics across the
//! worker boundary.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::debug;

use super::cmd;
use super::plan;
use super::probe;
use super::process::{EncoderProcess, SpawnError};
use super::progress::PhaseProgress;
use super::types::{EncodeJob, EncodePlan, JobEvent};

/// Why a job ended in `Failed`. Every variant is terminal; the message is
/// forwarded verbatim into the `Failed: …` status.
#[derive(Debug, Error)]
pub enum JobError {
    /// The prober found no duration. Raised before any encode subprocess
    /// is spawned.
    #[error("cannot read video duration")]
    ProbeFailed,

    /// Input file metadata was unreadable.
    #[error("cannot read input file {}: {source}", path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The encoder binary itself could not be launched.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// The encoder ran but supervising it failed.
    #[error("{0}")]
    Runtime(String),
}

/// How a finished (non-failed) job ended.
#[derive(Debug, Clone, PartialEq)]
enum Outcome {
    Completed { achieved_reduction: Option<f64> },
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseOutcome {
    Finished,
    Cancelled,
}

/// Drive one job to a terminal status. The final event is always a `Status`
/// beginning with `Completed` or `Failed`, or exactly `Stopped`.
pub fn run_job(
    mut job: EncodeJob,
    ffmpeg: &Path,
    cancel: &AtomicBool,
    emit: &mut dyn FnMut(JobEvent),
) {
    debug!(job = %job.id, input = %job.input_path.display(), "job starting");

    let status = match drive(&mut job, ffmpeg, cancel, emit) {
        Ok(Outcome::Completed {
            achieved_reduction: Some(reduced),
        }) => format!("Completed ({reduced:.1}% reduced)"),
        Ok(Outcome::Completed {
            achieved_reduction: None,
        }) => "Completed".to_string(),
        Ok(Outcome::Stopped) => "Stopped".to_string(),
        Err(e) => format!("Failed: {e}"),
    };
    emit(JobEvent::Status(status));
}

fn drive(
    job: &mut EncodeJob,
    ffmpeg: &Path,
    cancel: &AtomicBool,
    emit: &mut dyn FnMut(JobEvent),
) -> Result<Outcome, JobError> {
    job.source_size = fs::metadata(&job.input_path)
        .map_err(|source| JobError::InputUnreadable {
            path: job.input_path.clone(),
            source,
        })?
        .len();

    // Duration must be known before anything is spawned; without it neither
    // planning nor progress mapping is possible.
    job.duration_s = probe::probe_duration(ffmpeg, &job.input_path);
    let Some(duration_s) = job.duration_s else {
        return Err(JobError::ProbeFailed);
    };

    let encode_plan = plan::plan_for(job);
    debug!(job = %job.id, ?encode_plan, duration_s, "job planned");

    let outcome = match encode_plan {
        EncodePlan::Crf(crf) => run_phase(
            ffmpeg,
            &cmd::quality_args(job, crf),
            duration_s,
            (1.0, 100.0),
            "Converting",
            cancel,
            emit,
        )?,
        EncodePlan::Bitrate { video_kbps } => {
            let phases = (|| {
                let first = run_phase(
                    ffmpeg,
                    &cmd::pass1_args(job, video_kbps),
                    duration_s,
                    (1.0, 50.0),
                    "Analyzing",
                    cancel,
                    emit,
                )?;
                if first == PhaseOutcome::Cancelled {
                    return Ok(PhaseOutcome::Cancelled);
                }
                // Pass 2 consumes pass 1's statistics; it must never start
                // before pass 1 has fully exited.
                run_phase(
                    ffmpeg,
                    &cmd::pass2_args(job, video_kbps),
                    duration_s,
                    (51.0, 100.0),
                    "Converting",
                    cancel,
                    emit,
                )
            })();
            cleanup_pass_logs(Path::new("."));
            phases?
        }
    };

    if outcome == PhaseOutcome::Cancelled {
        // Partial output stays on disk; the caller asked us to stop, not to
        // undo what was already written.
        return Ok(Outcome::Stopped);
    }

    Ok(Outcome::Completed {
        achieved_reduction: achieved_reduction(job),
    })
}

/// Run one encoder invocation, streaming its merged output through the
/// progress mapper for this phase's sub-range. The cancellation flag is
/// polled at every line-read boundary.
fn run_phase(
    ffmpeg: &Path,
    args: &[OsString],
    duration_s: f64,
    range: (f64, f64),
    label: &str,
    cancel: &AtomicBool,
    emit: &mut dyn FnMut(JobEvent),
) -> Result<PhaseOutcome, JobError> {
    if cancel.load(Ordering::Relaxed) {
        return Ok(PhaseOutcome::Cancelled);
    }

    debug!("spawning: {} {}", ffmpeg.display(), cmd::render_args(args));
    let mut child = EncoderProcess::spawn(ffmpeg, args)?;
    let mut progress = PhaseProgress::new(duration_s, range.0, range.1);

    while let Some(line) = child.next_line() {
        if cancel.load(Ordering::Relaxed) {
            child.terminate();
            let _ = child.wait();
            return Ok(PhaseOutcome::Cancelled);
        }
        if let Some(pct) = progress.observe(&line) {
            emit(JobEvent::Progress(pct));
            emit(JobEvent::Status(format!("{label}… {pct:.1}%")));
        }
    }

    child
        .wait()
        .map_err(|e| JobError::Runtime(format!("waiting for encoder: {e}")))?;
    Ok(PhaseOutcome::Finished)
}

/// `100 * (1 - out/in)` when the destination exists, `None` otherwise; a
/// missing output downgrades the report, it does not fail the job.
fn achieved_reduction(job: &EncodeJob) -> Option<f64> {
    let out_size = fs::metadata(&job.output_path).ok()?.len();
    if job.source_size == 0 {
        return None;
    }
    Some(100.0 * (1.0 - out_size as f64 / job.source_size as f64))
}

/// Two-pass statistics land in the process working directory (ffmpeg's
/// default passlog location). Removal is best-effort and never escalated.
fn cleanup_pass_logs(dir: &Path) {
    for name in ["ffmpeg2pass-0.log", "ffmpeg2pass-0.log.mbtree"] {
        let path = dir.join(name);
        if let Err(e) = fs::remove_file(&path) {
            if e.kind() != io::ErrorKind::NotFound {
                debug!("could not remove {}: {e}", path.display());
            }
        }
    }
}
