//! Recording file locations

use chrono::{DateTime, Local, TimeZone};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const RECORDING_EXTENSION: &str = "mp4";

/// File name for a recording started at `started_at`, e.g. `20240131_235959.mp4`
pub fn recording_file_name<Tz: TimeZone>(started_at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}.{}",
        started_at.format("%Y%m%d_%H%M%S"),
        RECORDING_EXTENSION
    )
}

/// Path for a new recording in `dir`, creating the directory if needed
pub fn recording_file_path(dir: &Path, started_at: &DateTime<Local>) -> io::Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(dir.join(recording_file_name(started_at)))
}

/// Path for a recording starting now
pub fn new_recording_path(dir: &Path) -> io::Result<PathBuf> {
    recording_file_path(dir, &Local::now())
}
