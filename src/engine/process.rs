//! Supervision of one encoder subprocess: merged output stream, forced
//! termination, exit reaping.

use std::ffi::OsString;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::debug;

/// The encoder binary could not be launched at all. Distinct from runtime
/// failures so callers can report a missing encoder as such.
#[derive(Debug, Error)]
#[error("encoder could not be started ({}): {source}", path.display())]
pub struct SpawnError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// A running encoder child with stdout and stderr merged into one line
/// stream. Two reader threads pump the pipes into a channel; the consumer
/// blocks on [`EncoderProcess::next_line`] between cancellation checks.
#[derive(Debug)]
pub struct EncoderProcess {
    child: Child,
    lines: Receiver<String>,
    readers: Vec<JoinHandle<()>>,
}

impl EncoderProcess {
    pub fn spawn(program: &Path, args: &[OsString]) -> Result<Self, SpawnError> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        suppress_console(&mut cmd);

        let mut child = cmd.spawn().map_err(|source| SpawnError {
            path: program.to_path_buf(),
            source,
        })?;

        let (tx, lines) = mpsc::channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx));
        }

        Ok(Self {
            child,
            lines,
            readers,
        })
    }

    /// Block until the next output line, or `None` once both pipes close.
    pub fn next_line(&mut self) -> Option<String> {
        self.lines.recv().ok()
    }

    /// Force-terminate the child. Best-effort; the process may already have
    /// exited on its own.
    pub fn terminate(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!("kill failed: {e}");
        }
    }

    /// Reap the child and join the reader threads.
    pub fn wait(&mut self) -> std::io::Result<ExitStatus> {
        let status = self.child.wait();
        for reader in self.readers.drain(..) {
            let _ = reader.join();
        }
        status
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: R, tx: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || pump_lines(pipe, &tx))
}

/// ffmpeg terminates its periodic stats lines with a bare carriage return,
/// so `BufRead::lines` would sit on them until the final newline. Split on
/// either terminator and drop empty segments.
fn pump_lines<R: Read>(pipe: R, tx: &Sender<String>) {
    let mut buf = Vec::new();
    for byte in BufReader::new(pipe).bytes() {
        let Ok(byte) = byte else { break };
        if byte == b'\n' || byte == b'\r' {
            if !buf.is_empty() {
                if tx.send(String::from_utf8_lossy(&buf).into_owned()).is_err() {
                    return;
                }
                buf.clear();
            }
        } else {
            buf.push(byte);
        }
    }
    if !buf.is_empty() {
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    }
}

/// Keep the child from flashing a console window on Windows.
#[cfg(windows)]
pub(crate) fn suppress_console(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
pub(crate) fn suppress_console(_cmd: &mut Command) {}
