use anyhow::Result;
use ndarray::{Array1, Array2, Axis};

use crate::Embedding;

/// Reference embeddings, one row per label.
///
/// Rows and labels are only ever appended together, so `labels[i]` always
/// names row `i` of the matrix.
#[derive(Debug, Clone, Default)]
pub struct Gallery {
    labels: Vec<String>,
    embeddings: Option<Array2<f32>>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, embedding: &Embedding) -> Result<()> {
        match &mut self.embeddings {
            Some(matrix) => {
                if matrix.ncols() != embedding.dim() {
                    anyhow::bail!(
                        "embedding dimension {} does not match gallery dimension {}",
                        embedding.dim(),
                        matrix.ncols()
                    );
                }
                matrix.push_row(embedding.row())?;
            }
            None => self.embeddings = Some(embedding.vector.clone()),
        }
        self.labels.push(label.into());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn rows(&self) -> usize {
        self.embeddings.as_ref().map_or(0, |m| m.len_of(Axis(0)))
    }

    /// Cosine similarity of `query` against every reference, in gallery order.
    pub fn similarities(&self, query: &Embedding) -> Array1<f32> {
        match &self.embeddings {
            Some(matrix) => matrix
                .rows()
                .into_iter()
                .map(|row| faceval_vision::face::cosine_similarity(row, query.row()))
                .collect(),
            None => Array1::zeros(0),
        }
    }

    /// Label and similarity of the closest reference.
    pub fn classify(&self, query: &Embedding) -> Option<(&str, f32)> {
        let sims = self.similarities(query);
        let idx = argmax(sims.as_slice()?)?;
        Some((self.labels[idx].as_str(), sims[idx]))
    }
}

/// Index of the largest value. Ties go to the lowest index and NaN never wins.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if b >= v => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(v: &[f32]) -> Embedding {
        Embedding::from_vec(v.to_vec())
    }

    #[test]
    fn argmax_prefers_lowest_index_on_tie() {
        assert_eq!(argmax(&[0.2, 0.9, 0.9, 0.1]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[-0.3]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.1]), Some(1));
        assert_eq!(argmax(&[f32::NAN]), None);
    }

    #[test]
    fn labels_and_rows_stay_aligned() {
        let mut g = Gallery::new();
        assert!(g.is_empty());
        g.push("a", &emb(&[1.0, 0.0])).unwrap();
        g.push("b", &emb(&[0.0, 1.0])).unwrap();
        assert_eq!(g.len(), 2);
        assert_eq!(g.rows(), 2);

        assert!(g.push("c", &emb(&[1.0, 0.0, 0.0])).is_err());
        assert_eq!(g.len(), g.rows());
    }

    #[test]
    fn classify_picks_nearest() {
        let mut g = Gallery::new();
        g.push("a", &emb(&[1.0, 0.0])).unwrap();
        g.push("b", &emb(&[0.0, 1.0])).unwrap();

        let (label, sim) = g.classify(&emb(&[0.2, 0.9])).unwrap();
        assert_eq!(label, "b");
        assert!(sim > 0.9);

        let sims = g.similarities(&emb(&[1.0, 1.0]));
        assert!((sims[0] - sims[1]).abs() < 1e-6);
        assert_eq!(g.classify(&emb(&[1.0, 1.0])).unwrap().0, "a");
    }

    #[test]
    fn duplicate_reference_ties_resolve_first() {
        let mut g = Gallery::new();
        g.push("first", &emb(&[0.0, 1.0])).unwrap();
        g.push("second", &emb(&[0.0, 2.0])).unwrap();
        assert_eq!(g.classify(&emb(&[0.0, 3.0])).unwrap().0, "first");
    }

    #[test]
    fn empty_gallery_classifies_nothing() {
        let g = Gallery::new();
        assert!(g.classify(&emb(&[1.0])).is_none());
        assert_eq!(g.similarities(&emb(&[1.0])).len(), 0);
    }
}
