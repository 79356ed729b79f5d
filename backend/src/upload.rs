use actix_multipart::{Field, Multipart, MultipartError};
use actix_web::web;
use futures::TryStreamExt;
use log::{info, warn};
use shared::{AllowedExtension, MediaKind};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const FILE_FIELD: &str = "file";

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file part")]
    NoFilePart,
    #[error("No selected file")]
    NoSelectedFile,
    #[error("Invalid file type")]
    InvalidFileType,
    #[error("File too large")]
    FileTooLarge,
    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
    #[error("Upload worker failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}

impl UploadError {
    /// Rejections reported to the user as plain text.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            UploadError::NoFilePart
                | UploadError::NoSelectedFile
                | UploadError::InvalidFileType
                | UploadError::FileTooLarge
        )
    }
}

#[derive(Debug, Clone)]
pub struct SavedUpload {
    pub filename: String,
    pub path: PathBuf,
    pub kind: MediaKind,
}

/// Checks the submitted filename against the extension allow-list.
pub fn validate_filename(filename: &str) -> Result<AllowedExtension, UploadError> {
    if filename.is_empty() {
        return Err(UploadError::NoSelectedFile);
    }
    AllowedExtension::from_filename(filename).ok_or(UploadError::InvalidFileType)
}

/// Reduces a client-supplied filename to a safe single path component.
pub fn secure_filename(filename: &str) -> String {
    let joined = filename
        .replace(['/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    let mut name = filtered.trim_matches(|c| c == '.' || c == '_').to_string();

    let stem = name.split('.').next().unwrap_or_default().to_ascii_uppercase();
    if !stem.is_empty() && WINDOWS_DEVICE_NAMES.contains(&stem.as_str()) {
        name.insert(0, '_');
    }
    name
}

/// Sanitized name, falling back to `upload.<ext>` when nothing survives.
pub fn storage_name(filename: &str, ext: AllowedExtension) -> String {
    let name = secure_filename(filename);
    if name.is_empty() || AllowedExtension::from_filename(&name).is_none() {
        format!("upload.{}", ext.as_ref())
    } else {
        name
    }
}

/// Streams one field into `path` chunk by chunk; returns the number of bytes written.
async fn write_field(field: &mut Field, path: &Path, max_bytes: usize) -> Result<usize, UploadError> {
    let create_path = path.to_path_buf();
    let mut file = web::block(move || File::create(create_path)).await??;
    let mut size = 0usize;

    while let Some(chunk) = field.try_next().await? {
        if size + chunk.len() > max_bytes {
            return Err(UploadError::FileTooLarge);
        }
        size += chunk.len();
        file = web::block(move || file.write_all(&chunk).map(|_| file)).await??;
    }

    web::block(move || file.sync_all()).await??;
    Ok(size)
}

async fn remove_partial(path: &Path) -> Result<(), UploadError> {
    let path = path.to_path_buf();
    match web::block(move || std::fs::remove_file(path)).await? {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Reads the `file` part of a multipart form and writes it into `upload_dir`.
pub async fn receive(
    mut payload: Multipart,
    upload_dir: &Path,
    max_bytes: usize,
) -> Result<SavedUpload, UploadError> {
    while let Some(mut field) = payload.try_next().await? {
        let filename = match (
            field.name(),
            field.content_disposition().and_then(|cd| cd.get_filename()),
        ) {
            (Some(FILE_FIELD), Some(filename)) => Some(filename.to_string()),
            _ => None,
        };
        let Some(filename) = filename else {
            while field.try_next().await?.is_some() {}
            continue;
        };

        let ext = validate_filename(&filename)?;
        let stored = storage_name(&filename, ext);

        let path = upload_dir.join(&stored);
        let size = match write_field(&mut field, &path, max_bytes).await {
            Ok(size) => size,
            Err(e) => {
                if let Err(remove_err) = remove_partial(&path).await {
                    warn!("Failed to remove partial upload {}: {}", path.display(), remove_err);
                }
                if matches!(e, UploadError::FileTooLarge) {
                    warn!("Upload {} exceeds {} bytes", filename, max_bytes);
                }
                return Err(e);
            }
        };
        info!("Stored upload {} ({} bytes) at {}", filename, size, path.display());

        return Ok(SavedUpload {
            filename: stored,
            path,
            kind: ext.media_kind(),
        });
    }

    Err(UploadError::NoFilePart)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_extensions_any_case() {
        for name in ["a.jpg", "b.JPEG", "c.Png", "d.mp4", "e.AVI", "f.mkv"] {
            assert!(validate_filename(name).is_ok(), "{name} should be accepted");
        }
    }

    #[test]
    fn rejects_other_extensions() {
        for name in ["a.gif", "b.txt", "noext", "c.jpg.sh", "d."] {
            assert!(matches!(
                validate_filename(name),
                Err(UploadError::InvalidFileType)
            ));
        }
    }

    #[test]
    fn empty_filename_is_no_selected_file() {
        assert!(matches!(
            validate_filename(""),
            Err(UploadError::NoSelectedFile)
        ));
    }

    #[test]
    fn secure_filename_strips_paths_and_symbols() {
        assert_eq!(secure_filename("../../etc/passwd.jpg"), "etc_passwd.jpg");
        assert_eq!(secure_filename("my cat photo.png"), "my_cat_photo.png");
        assert_eq!(secure_filename("C:\\Users\\pool\\swim.mp4"), "C_Users_pool_swim.mp4");
        assert_eq!(secure_filename("piscina-été.jpg"), "piscina-t.jpg");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn secure_filename_guards_device_names() {
        assert_eq!(secure_filename("con.jpg"), "_con.jpg");
        assert_eq!(secure_filename("console.jpg"), "console.jpg");
    }

    #[test]
    fn storage_name_falls_back_when_nothing_survives() {
        assert_eq!(storage_name("çé.jpg", AllowedExtension::Jpg), "upload.jpg");
        assert_eq!(storage_name("ü.ü.png", AllowedExtension::Png), "upload.png");
        assert_eq!(storage_name("sample.jpg", AllowedExtension::Jpg), "sample.jpg");
    }

    #[test]
    fn rejections_are_distinguished_from_faults() {
        assert!(UploadError::InvalidFileType.is_rejection());
        assert!(!UploadError::Io(std::io::Error::other("disk")).is_rejection());
    }
}
