use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::dataset::Split;
use crate::gallery::Gallery;
use crate::score::Score;
use crate::{embed_path, Embedder};

/// Run ended before any query could be compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("No training images with detected faces. Exiting.")]
    NoReferences,
}

#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub label: String,
    pub path: PathBuf,
    pub predicted: String,
    pub similarity: f32,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub references: usize,
    pub references_skipped: usize,
    pub queries_skipped: usize,
    pub score: Score,
    pub predictions: Vec<Prediction>,
}

impl Report {
    pub fn accuracy(&self) -> Option<f64> {
        self.score.accuracy()
    }

    /// Score per true label, sorted by label.
    pub fn per_person(&self) -> BTreeMap<&str, Score> {
        let mut out: BTreeMap<&str, Score> = BTreeMap::new();
        for p in &self.predictions {
            out.entry(p.label.as_str()).or_default().record(p.correct);
        }
        out
    }
}

/// Embed every reference into a gallery, skipping images without a face.
pub fn build_gallery<E: Embedder + ?Sized>(
    embedder: &mut E,
    split: &Split,
) -> Result<(Gallery, usize)> {
    let mut gallery = Gallery::new();
    let mut skipped = 0;
    for sample in &split.references {
        match embed_path(embedder, &sample.path)? {
            Some(embedding) => gallery.push(sample.label.clone(), &embedding)?,
            None => {
                warn!(
                    "Face not detected in training image {}. Skipping.",
                    sample.path.display()
                );
                skipped += 1;
            }
        }
    }
    Ok((gallery, skipped))
}

/// Classify every query against the reference gallery and score the result.
pub fn evaluate<E: Embedder + ?Sized>(embedder: &mut E, split: &Split) -> Result<Report> {
    let (gallery, references_skipped) = build_gallery(embedder, split)?;
    if gallery.is_empty() {
        return Err(EvalError::NoReferences.into());
    }
    info!(
        "{} reference embedding(s), {} query image(s)",
        gallery.len(),
        split.queries.len()
    );

    let mut score = Score::default();
    let mut predictions = Vec::with_capacity(split.queries.len());
    let mut queries_skipped = 0;

    for sample in &split.queries {
        let Some(embedding) = embed_path(embedder, &sample.path)? else {
            warn!(
                "Face not detected in test image {}. Skipping.",
                sample.path.display()
            );
            queries_skipped += 1;
            continue;
        };
        let Some((predicted, similarity)) = gallery.classify(&embedding) else {
            warn!(
                "No comparable reference for {}. Skipping.",
                sample.path.display()
            );
            queries_skipped += 1;
            continue;
        };

        let correct = predicted == sample.label;
        debug!(
            "{}: predicted {} ({:.4}), expected {}",
            sample.path.display(),
            predicted,
            similarity,
            sample.label
        );
        score.record(correct);
        predictions.push(Prediction {
            label: sample.label.clone(),
            path: sample.path.clone(),
            predicted: predicted.to_string(),
            similarity,
            correct,
        });
    }

    Ok(Report {
        references: gallery.len(),
        references_skipped,
        queries_skipped,
        score,
        predictions,
    })
}
