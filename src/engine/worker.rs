// Background worker driving one encode job

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread::JoinHandle;

use super::job::run_job;
use super::types::{EncodeJob, JobEvent};

/// Handle to a running job: event stream out, cancellation request in.
pub struct JobHandle {
    /// Events in emission order. A status beginning with `Completed` or
    /// `Failed`, or exactly `Stopped`, is the job's last event; the channel
    /// closes once the worker exits.
    pub events: Receiver<JobEvent>,
    cancel: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Spawn a background worker for `job`. The worker blocks only on the
/// encoder's output and exit, never on the caller; events queue up on the
/// channel until drained.
pub fn start_job(job: EncodeJob, ffmpeg: PathBuf) -> JobHandle {
    let (tx, events) = mpsc::channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_flag = Arc::clone(&cancel);

    let thread = std::thread::spawn(move || {
        run_job(job, &ffmpeg, &cancel_flag, &mut |event| {
            // A caller that dropped the receiver no longer cares; keep
            // encoding rather than poisoning the run.
            let _ = tx.send(event);
        });
    });

    JobHandle {
        events,
        cancel,
        thread,
    }
}

impl JobHandle {
    /// Request cooperative cancellation. Observed between output-line
    /// reads, so latency is bounded by the encoder's own output cadence.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Wait for the worker thread to finish.
    pub fn join(self) {
        let _ = self.thread.join();
    }
}
