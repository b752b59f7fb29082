use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Lower bound applied to each vector norm in [`cosine_similarity`].
pub const NORM_EPS: f32 = 1e-8;

/// Detection result from YuNet, in original image pixel coordinates
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
    pub landmarks: [f32; 10], // 5 points: x1,y1,x2,y2,...,x5,y5
}

impl Detection {
    pub fn area(&self) -> f32 {
        self.bbox[2].max(0.0) * self.bbox[3].max(0.0)
    }
}

/// Which detection to embed when an image contains more than one face.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FaceSelection {
    /// Largest bounding box
    #[default]
    Largest,
    /// Highest detector confidence
    HighestScore,
}

impl FaceSelection {
    /// Pick one detection; ties keep the earliest one.
    pub fn select<'a>(&self, detections: &'a [Detection]) -> Option<&'a Detection> {
        let key = |d: &Detection| match self {
            FaceSelection::Largest => d.area(),
            FaceSelection::HighestScore => d.score,
        };
        let mut best: Option<&Detection> = None;
        for d in detections {
            match best {
                Some(b) if key(b) >= key(d) => {}
                _ => best = Some(d),
            }
        }
        best
    }
}

/// Face embedding, stored as a `1 x D` row
#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Array2<f32>,
}

impl Embedding {
    pub fn from_vec(values: Vec<f32>) -> Self {
        let dim = values.len();
        Self {
            vector: Array2::from_shape_vec((1, dim), values)
                .unwrap_or_else(|_| Array2::zeros((1, dim))),
        }
    }

    pub fn dim(&self) -> usize {
        self.vector.ncols()
    }

    pub fn row(&self) -> ArrayView1<'_, f32> {
        self.vector.row(0)
    }
}

/// Cosine similarity, with each norm clamped to [`NORM_EPS`] so zero vectors score 0.
pub fn cosine_similarity(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    let dot = a.dot(&b);
    let norm_a = a.dot(&a).sqrt().max(NORM_EPS);
    let norm_b = b.dot(&b).sqrt().max(NORM_EPS);
    dot / (norm_a * norm_b)
}

/// Compute cosine similarity between two embeddings
pub fn match_embedding(a: &Embedding, b: &Embedding) -> f32 {
    cosine_similarity(a.row(), b.row())
}
