//! YuNet output parsing and anchor-free decoding.
//!
//! The 2023mar export produces 12 tensors, four heads per stride (8, 16, 32),
//! in the order `cls_8, cls_16, cls_32, obj_*, bbox_*, kps_*`:
//! - cls / obj: `[1, H*W, 1]`, already passed through a sigmoid
//! - bbox: `[1, H*W, 4]` as (dx, dy, log w, log h) in stride units
//! - kps: `[1, H*W, 10]` as five (dx, dy) offsets in stride units
//!
//! Each grid cell `(row, col)` decodes to
//! `cx = (col + dx) * stride`, `w = exp(log w) * stride`, and the detection
//! score is `sqrt(clamp(cls) * clamp(obj))`.

use anyhow::Result;
use ndarray::Array2;

pub const STRIDES: [usize; 3] = [8, 16, 32];

#[derive(Debug, Clone)]
pub struct RawDetection {
    pub bbox: [f32; 4], // x, y, w, h (normalized [0,1])
    pub score: f32,
    pub landmarks: [f32; 10], // 5 points: x1,y1,x2,y2,...,x5,y5 (normalized [0,1])
}

/// Heads for a single stride, one row per grid cell.
#[derive(Debug, Clone)]
pub struct ScaleOutput {
    pub stride: usize,
    pub scores: Array2<f32>,
    pub bboxes: Array2<f32>,
    pub landmarks: Array2<f32>,
}

impl ScaleOutput {
    pub fn feature_size(&self, input_size: usize) -> usize {
        input_size / self.stride
    }
}

fn read_head(
    outputs: &[(&[i64], &[f32])],
    index: usize,
    cells: usize,
    width: usize,
    name: &str,
) -> Result<Array2<f32>> {
    let Some((shape, data)) = outputs.get(index) else {
        anyhow::bail!("Missing {} output at index {}", name, index);
    };
    if shape.len() != 3 || shape[0] != 1 || shape[1] as usize != cells || shape[2] as usize != width
    {
        anyhow::bail!(
            "Unexpected {} shape at index {}: {:?}, expected [1, {}, {}]",
            name,
            index,
            shape,
            cells,
            width
        );
    }
    Ok(Array2::from_shape_vec((cells, width), data.to_vec())?)
}

/// Split the flat model outputs into per-stride heads, folding cls and obj into one score.
pub fn parse_yunet_outputs(
    outputs: &[(&[i64], &[f32])],
    input_size: usize,
) -> Result<Vec<ScaleOutput>> {
    let n = STRIDES.len();
    STRIDES
        .iter()
        .enumerate()
        .map(|(i, &stride)| {
            let side = input_size / stride;
            let cells = side * side;
            let cls = read_head(outputs, i, cells, 1, "cls")?;
            let obj = read_head(outputs, i + n, cells, 1, "obj")?;
            let bboxes = read_head(outputs, i + 2 * n, cells, 4, "bbox")?;
            let landmarks = read_head(outputs, i + 3 * n, cells, 10, "kps")?;

            let mut scores = cls;
            ndarray::Zip::from(&mut scores)
                .and(&obj)
                .for_each(|c, &o| *c = combine_scores(*c, o));

            Ok::<_, anyhow::Error>(ScaleOutput {
                stride,
                scores,
                bboxes,
                landmarks,
            })
        })
        .collect()
}

/// Geometric mean of classification and objectness, each clamped to [0, 1].
pub fn combine_scores(cls: f32, obj: f32) -> f32 {
    (cls.clamp(0.0, 1.0) * obj.clamp(0.0, 1.0)).sqrt()
}

/// Decode every grid cell scoring at least `score_threshold`.
pub fn decode_detections(
    scales: &[ScaleOutput],
    score_threshold: f32,
    input_size: usize,
) -> Result<Vec<RawDetection>> {
    let norm = input_size as f32;
    let mut detections = Vec::new();

    for scale in scales {
        let side = scale.feature_size(input_size);
        let cells = scale.scores.nrows();
        if cells != side * side {
            anyhow::bail!(
                "Expected {} cells for stride {} ({}x{} grid), got {}",
                side * side,
                scale.stride,
                side,
                side,
                cells
            );
        }
        let stride = scale.stride as f32;

        for row in 0..side {
            for col in 0..side {
                let idx = row * side + col;
                let score = scale.scores[[idx, 0]];
                if score < score_threshold {
                    continue;
                }

                let cx = (col as f32 + scale.bboxes[[idx, 0]]) * stride;
                let cy = (row as f32 + scale.bboxes[[idx, 1]]) * stride;
                let w = scale.bboxes[[idx, 2]].exp() * stride;
                let h = scale.bboxes[[idx, 3]].exp() * stride;

                let mut landmarks = [0.0f32; 10];
                for k in 0..5 {
                    landmarks[k * 2] =
                        (col as f32 + scale.landmarks[[idx, k * 2]]) * stride / norm;
                    landmarks[k * 2 + 1] =
                        (row as f32 + scale.landmarks[[idx, k * 2 + 1]]) * stride / norm;
                }

                detections.push(RawDetection {
                    bbox: [
                        (cx - w / 2.0) / norm,
                        (cy - h / 2.0) / norm,
                        w / norm,
                        h / norm,
                    ],
                    score,
                    landmarks,
                });
            }
        }
    }

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_scale(stride: usize, input_size: usize) -> ScaleOutput {
        let side = input_size / stride;
        let cells = side * side;
        ScaleOutput {
            stride,
            scores: Array2::zeros((cells, 1)),
            bboxes: Array2::zeros((cells, 4)),
            landmarks: Array2::zeros((cells, 10)),
        }
    }

    #[test]
    fn test_combine_scores() {
        assert!((combine_scores(0.81, 1.0) - 0.9).abs() < 1e-6);
        assert_eq!(combine_scores(-0.5, 0.9), 0.0);
        assert!((combine_scores(2.0, 0.25) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_grid_based() {
        let input_size = 640;
        let mut scales: Vec<ScaleOutput> =
            STRIDES.iter().map(|&s| empty_scale(s, input_size)).collect();

        // One confident cell at row 10, col 10 of the stride-32 grid
        let scale = &mut scales[2];
        let idx = 10 * 20 + 10;
        scale.scores[[idx, 0]] = 0.9;
        scale.bboxes[[idx, 0]] = 0.5;
        scale.bboxes[[idx, 1]] = 0.3;
        scale.bboxes[[idx, 2]] = 4.0f32.ln();
        scale.bboxes[[idx, 3]] = 4.0f32.ln();

        let detections = decode_detections(&scales, 0.5, input_size).unwrap();
        assert_eq!(detections.len(), 1);
        let det = &detections[0];

        // cx = 10.5 * 32 / 640 = 0.525, cy = 10.3 * 32 / 640 = 0.515, w = h = 128 / 640 = 0.2
        assert!((det.bbox[0] - 0.425).abs() < 1e-5);
        assert!((det.bbox[1] - 0.415).abs() < 1e-5);
        assert!((det.bbox[2] - 0.2).abs() < 1e-5);
        assert!((det.bbox[3] - 0.2).abs() < 1e-5);
        assert!((det.score - 0.9).abs() < 1e-6);
        assert!((det.landmarks[0] - 0.5).abs() < 1e-5);
        assert!((det.landmarks[1] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_parse_rejects_bad_shape() {
        let shape = [1i64, 7, 1];
        let data = [0.0f32; 7];
        let outputs = vec![(&shape[..], &data[..])];
        let err = parse_yunet_outputs(&outputs, 640).unwrap_err();
        assert!(err.to_string().contains("Unexpected cls shape"));
    }

    #[test]
    fn test_parse_combines_cls_and_obj() {
        let input_size = 64;
        let mut shapes = Vec::new();
        let mut datas = Vec::new();
        for (width, fill) in [(1usize, 0.64f32), (1, 0.25), (4, 0.0), (10, 0.0)] {
            for &stride in &STRIDES {
                let cells = (input_size / stride).pow(2);
                shapes.push(vec![1i64, cells as i64, width as i64]);
                datas.push(vec![fill; cells * width]);
            }
        }
        let outputs: Vec<(&[i64], &[f32])> = shapes
            .iter()
            .zip(datas.iter())
            .map(|(s, d)| (s.as_slice(), d.as_slice()))
            .collect();

        let scales = parse_yunet_outputs(&outputs, input_size).unwrap();
        assert_eq!(scales.len(), 3);
        assert_eq!(scales[0].scores.nrows(), 64);
        assert!((scales[2].scores[[0, 0]] - 0.4).abs() < 1e-6);
    }
}
