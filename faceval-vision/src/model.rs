use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ort::{
    ep::{self, ExecutionProvider},
    session::{
        builder::{GraphOptimizationLevel, SessionBuilder},
        Session,
    },
};

pub const DETECTOR_FILE: &str = "face_detection_yunet_2023mar.onnx";
pub const RECOGNIZER_FILE: &str = "face_recognition_sface_2021dec.onnx";

/// Directory the model files are looked up in when no explicit path is configured.
pub fn model_dir() -> &'static Path {
    Path::new(option_env!("FACEVAL_MODEL_DIR").unwrap_or("models"))
}

pub fn default_detector_path() -> PathBuf {
    model_dir().join(DETECTOR_FILE)
}

pub fn default_recognizer_path() -> PathBuf {
    model_dir().join(RECOGNIZER_FILE)
}

pub fn session_builder() -> Result<SessionBuilder> {
    let mut builder =
        Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;

    #[cfg(feature = "openvino")]
    {
        let ep = ep::OpenVINO::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("openvino feature is enabled, onnx runtime not compiled with openvino")
        }
    }

    #[cfg(feature = "cuda")]
    {
        let ep = ep::CUDA::default();
        if ep.is_available()? {
            ep.register(&mut builder)?;
        } else {
            log::warn!("cuda feature is enabled, onnx runtime not compiled with cuda")
        }
    }

    Ok(builder)
}

fn load_session(path: &Path, what: &str) -> Result<Session> {
    if !path.exists() {
        anyhow::bail!("{} model not found at {}", what, path.display());
    }
    log::debug!("loading {} model from {}", what, path.display());
    session_builder()?
        .commit_from_file(path)
        .with_context(|| format!("load {} model {}", what, path.display()))
}

pub fn detector_session(path: &Path) -> Result<Session> {
    load_session(path, "detector")
}

pub fn recog_session(path: &Path) -> Result<Session> {
    load_session(path, "recognition")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_live_in_model_dir() {
        assert_eq!(default_detector_path().parent(), Some(model_dir()));
        assert!(default_recognizer_path().ends_with(RECOGNIZER_FILE));
    }

    #[test]
    fn missing_model_is_reported_with_path() {
        let err = match detector_session(Path::new("/nonexistent/yunet.onnx")) {
            Ok(_) => panic!("expected missing model error"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("/nonexistent/yunet.onnx"));
    }
}
