use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vidopt::engine::Mode;

#[derive(Parser)]
#[command(name = "vidopt")]
#[command(about = "Shrink videos to a target size or quality with ffmpeg", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug-level engine logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compress a video file
    Encode {
        /// Input video file
        input: PathBuf,

        /// Output file (defaults to <input>.compressed.<ext>)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Target reduction percentage
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(5..=80))]
        reduce: Option<u32>,

        /// "size" (two-pass bitrate target) or "quality" (single-pass CRF)
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Video codec passed to ffmpeg (e.g. libx264, libx265)
        #[arg(long)]
        codec: Option<String>,

        /// Snap the reduction to the nearest preset (10/20/30/40/50, within 2)
        #[arg(long)]
        snap: bool,

        /// Emit events as JSON lines instead of terminal progress
        #[arg(long)]
        json: bool,

        /// Extra ffmpeg arguments appended to the final encode
        #[arg(long)]
        extra_args: Option<String>,
    },

    /// Probe a video file for its duration
    Probe {
        /// Path to the video file
        file: PathBuf,
    },

    /// Check that the ffmpeg binary can be located
    CheckFfmpeg,

    /// Show config status and location, or create the default config if missing
    InitConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}
