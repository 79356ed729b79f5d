use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub model: ModelConfig,
    pub video: VideoConfig,
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub static_dir: PathBuf,
    pub template_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path: PathBuf,
    pub device: String,
    pub input_size: u32,
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub class_names: Vec<String>,
    pub target_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub ffmpeg: String,
    pub sample_fps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8081,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            static_dir: PathBuf::from("static"),
            template_dir: PathBuf::from("templates"),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/best.torchscript"),
            device: "auto".to_string(),
            input_size: 640,
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
            class_names: vec![
                "Drowning".to_string(),
                "Swimming".to_string(),
                "Out of water".to_string(),
            ],
            target_label: shared::TARGET_LABEL.to_string(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            sample_fps: 5,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 512 * 1024 * 1024,
        }
    }
}

impl PathsConfig {
    pub fn upload_dir(&self) -> PathBuf {
        self.static_dir.join("uploads")
    }

    pub fn prediction_dir(&self) -> PathBuf {
        self.static_dir.join("predictions")
    }
}

impl AppConfig {
    /// Loads the YAML config and applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            log::warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("APP_CONFIG") {
            return PathBuf::from(path);
        }
        match std::env::var("CARGO_MANIFEST_DIR") {
            Ok(manifest_dir) => PathBuf::from(format!("{}/../config/app.yaml", manifest_dir)),
            Err(_) => PathBuf::from("config/app.yaml"),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&config_str)
    }

    pub fn from_yaml_str(config_str: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_yaml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects model settings the detector cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let model = &self.model;
        if model.input_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "model.input_size",
                value: model.input_size.to_string(),
            });
        }
        for (key, value) in [
            ("model.conf_threshold", model.conf_threshold),
            ("model.iou_threshold", model.iou_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key: "PORT", value: port })?;
        }
        if let Some(model_path) = lookup("MODEL_PATH") {
            self.model.path = PathBuf::from(model_path);
        }
        if let Some(static_dir) = lookup("STATIC_DIR") {
            self.paths.static_dir = PathBuf::from(static_dir);
        }
        if let Some(template_dir) = lookup("TEMPLATE_DIR") {
            self.paths.template_dir = PathBuf::from(template_dir);
        }
        if let Some(ffmpeg) = lookup("FFMPEG_BIN") {
            self.video.ffmpeg = ffmpeg;
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
