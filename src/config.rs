use anyhow::{Context, Result};
use faceval_vision::{model, FaceSelection, PipelineOptions};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub static CONFIG_PATH: Lazy<&'static Path> =
    Lazy::new(|| Path::new(option_env!("FACEVAL_CONFIG_PATH").unwrap_or("faceval.toml")));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dataset: PathBuf,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub face_selection: FaceSelection,
    pub detector_model: PathBuf,
    pub recognizer_model: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("dataset"),
            score_threshold: 0.6,
            nms_threshold: 0.3,
            face_selection: FaceSelection::Largest,
            detector_model: model::default_detector_path(),
            recognizer_model: model::default_recognizer_path(),
        }
    }
}

impl Config {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            detector_model: self.detector_model.clone(),
            recognizer_model: self.recognizer_model.clone(),
            score_threshold: self.score_threshold,
            nms_threshold: self.nms_threshold,
            selection: self.face_selection,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data).with_context(|| format!("writing config {}", path.display()))?;
    Ok(())
}
