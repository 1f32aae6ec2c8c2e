//! Discovery of the ffmpeg binary. Injected into the engine as a plain path
//! so embedders can substitute their own locator.

use std::env;
use std::path::{Path, PathBuf};

const BINARY: &str = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };

#[cfg(windows)]
const FALLBACK: &str = r"C:\ffmpeg\bin\ffmpeg.exe";

/// Locate ffmpeg: explicit override first, then the `PATH` entries, then the
/// conventional Windows install location. Checks the filesystem only; the
/// binary is not executed.
pub fn find_ffmpeg(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
    }

    let path_dirs: Vec<PathBuf> = env::var_os("PATH")
        .map(|paths| env::split_paths(&paths).collect())
        .unwrap_or_default();
    if let Some(found) = search_dirs(path_dirs.iter().map(PathBuf::as_path)) {
        return Some(found);
    }

    #[cfg(windows)]
    {
        let fallback = Path::new(FALLBACK);
        if fallback.is_file() {
            return Some(fallback.to_path_buf());
        }
    }

    None
}

fn search_dirs<'a>(dirs: impl Iterator<Item = &'a Path>) -> Option<PathBuf> {
    for dir in dirs {
        let candidate = dir.join(BINARY);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}
