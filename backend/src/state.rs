use crate::config::AppConfig;
use crate::detector::Detector;
use crate::templates::Templates;
use std::path::PathBuf;
use std::sync::Arc;

/// Process-wide context handed to every handler through `web::Data`.
pub struct AppState {
    pub config: AppConfig,
    pub detector: Arc<dyn Detector>,
    pub templates: Templates,
}

impl AppState {
    pub fn new(config: AppConfig, detector: Arc<dyn Detector>, templates: Templates) -> Self {
        Self {
            config,
            detector,
            templates,
        }
    }

    pub fn upload_dir(&self) -> PathBuf {
        self.config.paths.upload_dir()
    }

    pub fn prediction_dir(&self) -> PathBuf {
        self.config.paths.prediction_dir()
    }
}
