use crate::run::RunId;
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("No prediction directories found")]
    NoRunDirectories,
    #[error("No predictions found")]
    NoPredictions,
    #[error("Failed to read prediction output: {0}")]
    Io(#[from] io::Error),
}

impl LocateError {
    pub fn is_missing(&self) -> bool {
        !matches!(self, LocateError::Io(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedResult {
    pub run: String,
    pub file: String,
}

impl LocatedResult {
    pub fn url(&self) -> String {
        format!(
            "/static/predictions/{}/{}",
            urlencoding::encode(&self.run),
            urlencoding::encode(&self.file)
        )
    }
}

fn created_at(path: &Path) -> io::Result<SystemTime> {
    let metadata = fs::metadata(path)?;
    metadata.created().or_else(|_| metadata.modified())
}

/// Subdirectory of `root` with the newest creation time.
pub fn latest_run_dir(root: &Path) -> Result<PathBuf, LocateError> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(LocateError::NoRunDirectories);
        }
        Err(e) => return Err(e.into()),
    };

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let created = created_at(&path)?;
        if latest.as_ref().is_none_or(|(newest, _)| created > *newest) {
            latest = Some((created, path));
        }
    }

    latest
        .map(|(_, path)| path)
        .ok_or(LocateError::NoRunDirectories)
}

/// First file in directory-listing order; no sorting.
pub fn first_file(dir: &Path) -> Result<String, LocateError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            return Ok(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Err(LocateError::NoPredictions)
}

fn located(dir: PathBuf) -> Result<LocatedResult, LocateError> {
    let file = first_file(&dir)?;
    let run = dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or(LocateError::NoRunDirectories)?;
    debug!("Located prediction {}/{}", run, file);
    Ok(LocatedResult { run, file })
}

/// Newest run under `root`, for requests that carry no run id.
pub fn locate_latest(root: &Path) -> Result<LocatedResult, LocateError> {
    located(latest_run_dir(root)?)
}

/// Output of the named run.
pub fn locate_run(root: &Path, run: &str) -> Result<LocatedResult, LocateError> {
    let run = RunId::parse(run).ok_or(LocateError::NoRunDirectories)?;
    let dir = root.join(run.as_str());
    if !dir.is_dir() {
        return Err(LocateError::NoRunDirectories);
    }
    located(dir)
}
