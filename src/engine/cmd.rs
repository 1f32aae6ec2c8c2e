//! ffmpeg argument-vector construction. The exact argv of each invocation is
//! part of the external contract, so builders return plain vectors that tests
//! can compare verbatim.

use std::ffi::OsString;

use super::types::EncodeJob;

const PRESET: &str = "fast";

fn base_args(job: &EncodeJob) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        job.input_path.clone().into_os_string(),
        "-c:v".into(),
        job.codec.clone().into(),
        "-preset".into(),
        PRESET.into(),
    ]
}

fn push_audio(args: &mut Vec<OsString>) {
    for arg in ["-c:a", "aac", "-b:a", "128k"] {
        args.push(arg.into());
    }
}

/// Shell-style parsing so quoted values with spaces survive; falls back to
/// whitespace splitting on unbalanced quotes.
fn push_extra(args: &mut Vec<OsString>, extra: &str) {
    if extra.is_empty() {
        return;
    }
    if let Some(parsed) = shlex::split(extra) {
        args.extend(parsed.into_iter().map(OsString::from));
    } else {
        args.extend(extra.split_whitespace().map(OsString::from));
    }
}

/// Quality mode: single pass at a constant rate factor, audio re-encoded.
pub fn quality_args(job: &EncodeJob, crf: u32) -> Vec<OsString> {
    let mut args = base_args(job);
    args.push("-crf".into());
    args.push(crf.to_string().into());
    push_audio(&mut args);
    push_extra(&mut args, &job.extra_args);
    args.push(job.output_path.clone().into_os_string());
    args
}

/// Size mode, analysis pass: no audio, no playable output, statistics only.
pub fn pass1_args(job: &EncodeJob, video_kbps: u32) -> Vec<OsString> {
    let mut args = base_args(job);
    args.push("-b:v".into());
    args.push(format!("{video_kbps}k").into());
    args.push("-pass".into());
    args.push("1".into());
    args.push("-an".into());
    args.push("-f".into());
    args.push("null".into());
    args.push("-".into());
    args
}

/// Size mode, final pass: consumes pass 1 statistics, writes the real output.
pub fn pass2_args(job: &EncodeJob, video_kbps: u32) -> Vec<OsString> {
    let mut args = base_args(job);
    args.push("-b:v".into());
    args.push(format!("{video_kbps}k").into());
    args.push("-pass".into());
    args.push("2".into());
    push_audio(&mut args);
    push_extra(&mut args, &job.extra_args);
    args.push(job.output_path.clone().into_os_string());
    args
}

/// Render an argument vector for logs and tests, quoting arguments that
/// contain spaces.
pub fn render_args(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| {
            let s = arg.to_string_lossy();
            if s.contains(' ') {
                format!("\"{s}\"")
            } else {
                s.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
