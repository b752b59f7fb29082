use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;
use ort::session::Session;

use crate::face::{Detection, Embedding, FaceSelection};
use crate::{align, detect, encode, model};

/// Produces at most one embedding per image.
///
/// `Ok(None)` means no face was found, which callers treat as a skip rather
/// than a failure.
pub trait Embedder {
    fn embed(&mut self, img: &DynamicImage) -> Result<Option<Embedding>>;
}

/// Load an image from disk and embed it.
pub fn embed_path<E: Embedder + ?Sized>(embedder: &mut E, path: &Path) -> Result<Option<Embedding>> {
    let img = image::open(path).with_context(|| format!("opening image {}", path.display()))?;
    embedder
        .embed(&img)
        .with_context(|| format!("embedding {}", path.display()))
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub detector_model: PathBuf,
    pub recognizer_model: PathBuf,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub selection: FaceSelection,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            detector_model: model::default_detector_path(),
            recognizer_model: model::default_recognizer_path(),
            score_threshold: 0.6,
            nms_threshold: 0.3,
            selection: FaceSelection::default(),
        }
    }
}

/// Full pipeline: detect faces → align → encode
pub struct Pipeline {
    pub detector: Session,
    pub encoder: Session,
    score_threshold: f32,
    nms_threshold: f32,
    selection: FaceSelection,
}

impl Pipeline {
    pub fn new(options: &PipelineOptions) -> Result<Self> {
        Ok(Self {
            detector: model::detector_session(&options.detector_model)?,
            encoder: model::recog_session(&options.recognizer_model)?,
            score_threshold: options.score_threshold,
            nms_threshold: options.nms_threshold,
            selection: options.selection,
        })
    }

    /// Detect, select one face, and return it with its embedding
    pub fn process_image(&mut self, img: &DynamicImage) -> Result<Option<(Detection, Embedding)>> {
        let detections = detect::detect_faces(
            &mut self.detector,
            img,
            self.score_threshold,
            self.nms_threshold,
        )
        .context("detecting faces")?;

        let Some(face) = self.selection.select(&detections) else {
            return Ok(None);
        };

        let crop = align::align_face(img, face, encode::RECOGNIZER_INPUT);
        let embedding = encode::encode_face(&mut self.encoder, &crop).context("encoding face")?;

        Ok(Some((face.clone(), embedding)))
    }
}

impl Embedder for Pipeline {
    fn embed(&mut self, img: &DynamicImage) -> Result<Option<Embedding>> {
        Ok(self.process_image(img)?.map(|(_, embedding)| embedding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(Option<Vec<f32>>);

    impl Embedder for Constant {
        fn embed(&mut self, _img: &DynamicImage) -> Result<Option<Embedding>> {
            Ok(self.0.clone().map(Embedding::from_vec))
        }
    }

    #[test]
    fn embed_path_reports_missing_file() {
        let mut e = Constant(Some(vec![1.0]));
        let err = embed_path(&mut e, Path::new("/nonexistent/a.jpg")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/a.jpg"));
    }

    #[test]
    fn embed_path_passes_through_missing_face() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.png");
        DynamicImage::new_rgb8(4, 4).save(&path).unwrap();

        let mut e = Constant(None);
        assert!(embed_path(&mut e, &path).unwrap().is_none());
    }
}
