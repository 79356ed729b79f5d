use serde::Deserialize;
use strum_macros::{AsRefStr, EnumIter, EnumString};

/// Class name whose presence raises the drowning alert.
pub const TARGET_LABEL: &str = "drowning";

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, EnumIter, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AllowedExtension {
    Jpg,
    Jpeg,
    Png,
    Mp4,
    Avi,
    Mkv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl AllowedExtension {
    pub fn media_kind(&self) -> MediaKind {
        match self {
            AllowedExtension::Jpg | AllowedExtension::Jpeg | AllowedExtension::Png => {
                MediaKind::Image
            }
            AllowedExtension::Mp4 | AllowedExtension::Avi | AllowedExtension::Mkv => {
                MediaKind::Video
            }
        }
    }

    /// Extension after the last dot, matched case-insensitively.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, ext) = filename.rsplit_once('.')?;
        ext.parse().ok()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetectionOutcome {
    pub filename: String,
    pub run_id: String,
    pub drowning: bool,
    pub frames: usize,
}

/// Query string carried from `/predict` to `/result/<name>`.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct ResultQuery {
    pub drowning: Option<String>,
    pub run: Option<String>,
}

impl ResultQuery {
    pub fn drowning_flag(&self) -> bool {
        self.drowning.as_deref() == Some("True")
    }
}

pub fn flag_str(flag: bool) -> &'static str {
    if flag { "True" } else { "False" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_extension_parses_in_any_case() {
        for ext in AllowedExtension::iter() {
            let lower = format!("clip.{}", ext.as_ref());
            let upper = format!("clip.{}", ext.as_ref().to_uppercase());
            assert_eq!(AllowedExtension::from_filename(&lower), Some(ext));
            assert_eq!(AllowedExtension::from_filename(&upper), Some(ext));
        }
    }

    #[test]
    fn rejects_unknown_or_missing_extension() {
        assert_eq!(AllowedExtension::from_filename("notes.txt"), None);
        assert_eq!(AllowedExtension::from_filename("jpg"), None);
        assert_eq!(AllowedExtension::from_filename("archive.jpg.exe"), None);
        assert_eq!(AllowedExtension::from_filename("trailing."), None);
    }

    #[test]
    fn only_literal_true_sets_flag() {
        let query = |v: Option<&str>| ResultQuery {
            drowning: v.map(str::to_string),
            run: None,
        };
        assert!(query(Some("True")).drowning_flag());
        assert!(!query(Some("true")).drowning_flag());
        assert!(!query(Some("False")).drowning_flag());
        assert!(!query(None).drowning_flag());
    }

    #[test]
    fn media_kinds() {
        assert_eq!(AllowedExtension::Png.media_kind(), MediaKind::Image);
        assert_eq!(AllowedExtension::Mkv.media_kind(), MediaKind::Video);
    }
}
