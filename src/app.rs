use crate::cli::{Cli, Commands};
use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;
use vidopt::config::Config;
use vidopt::engine::{self, EncodeJob, JobEvent, Mode, locate, plan, probe};

struct EncodeRequest {
    input: PathBuf,
    output: Option<PathBuf>,
    reduce: Option<u32>,
    mode: Option<Mode>,
    codec: Option<String>,
    snap: bool,
    json: bool,
    extra_args: Option<String>,
}

pub fn run(cli: Cli) {
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Encode {
            input,
            output,
            reduce,
            mode,
            codec,
            snap,
            json,
            extra_args,
        } => handle_encode(EncodeRequest {
            input,
            output,
            reduce,
            mode,
            codec,
            snap,
            json,
            extra_args,
        }),
        Commands::Probe { file } => handle_probe(&file),
        Commands::CheckFfmpeg => handle_check_ffmpeg(),
        Commands::InitConfig => handle_init_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "vidopt=debug" } else { "vidopt=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn locate_ffmpeg(config: &Config) -> Result<PathBuf> {
    locate::find_ffmpeg(config.encoder.ffmpeg_path.as_deref()).context(
        "ffmpeg not found. Install it, add it to PATH, or set encoder.ffmpeg_path in the config",
    )
}

fn handle_encode(req: EncodeRequest) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let ffmpeg = locate_ffmpeg(&config)?;

    let mut reduction = req.reduce.unwrap_or(config.defaults.reduction);
    if req.snap {
        reduction = plan::snap(reduction, plan::REDUCTION_PRESETS, plan::SNAP_TOLERANCE);
    }
    let mode = req
        .mode
        .or_else(|| Mode::from_str(&config.defaults.mode).ok())
        .unwrap_or(Mode::Size);
    let codec = req.codec.unwrap_or(config.defaults.codec);
    let output = req
        .output
        .unwrap_or_else(|| derive_output_path(&req.input));

    let mut job = EncodeJob::new(req.input, output, reduction, mode, codec);
    job.extra_args = req.extra_args.unwrap_or(config.defaults.extra_args);

    let handle = engine::start_job(job, ffmpeg);
    let mut terminal = None;
    for event in &handle.events {
        if req.json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            render_event(&event);
        }
        if event.is_terminal() {
            if let JobEvent::Status(status) = &event {
                terminal = Some(status.clone());
            }
        }
    }
    handle.join();

    match terminal {
        Some(status) if status.starts_with("Failed") => process::exit(1),
        Some(_) => Ok(()),
        None => bail!("job ended without a terminal status"),
    }
}

fn render_event(event: &JobEvent) {
    match event {
        JobEvent::Progress(pct) => {
            print!("\rProgress: {pct:.1}%");
            std::io::stdout().flush().ok();
        }
        JobEvent::Status(status) if event.is_terminal() => {
            println!();
            println!("{status}");
        }
        // Phase statuses duplicate the progress line; the terminal one is
        // what the user needs to see.
        JobEvent::Status(_) => {}
    }
}

/// `clip.mp4` → `clip.compressed.mp4`; extensionless inputs get `.mp4`.
fn derive_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let ext = input
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("mp4");
    input.with_file_name(format!("{stem}.compressed.{ext}"))
}

fn handle_probe(file: &Path) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let ffmpeg = locate_ffmpeg(&config)?;

    match probe::probe_duration(&ffmpeg, file) {
        Some(duration) => {
            println!("Duration: {duration:.2}s");
            Ok(())
        }
        None => bail!("could not read duration from {}", file.display()),
    }
}

fn handle_check_ffmpeg() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    match locate::find_ffmpeg(config.encoder.ffmpeg_path.as_deref()) {
        Some(path) => {
            println!("✓ ffmpeg: {}", path.display());
            match probe::ffmpeg_version(&path) {
                Ok(version) => println!("  {version}"),
                Err(e) => println!("  (could not query version: {e})"),
            }
            Ok(())
        }
        None => bail!("✗ ffmpeg not found. Install it or add it to PATH"),
    }
}

fn handle_init_config() -> Result<()> {
    let path = Config::config_path()?;
    if path.exists() {
        println!("Config exists: {}", path.display());
    } else {
        let created = Config::default().save()?;
        println!("Created default config: {}", created.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_path_is_derived_beside_the_input() {
        assert_eq!(
            derive_output_path(Path::new("/videos/clip.mp4")),
            PathBuf::from("/videos/clip.compressed.mp4")
        );
        assert_eq!(
            derive_output_path(Path::new("clip")),
            PathBuf::from("clip.compressed.mp4")
        );
    }
}
