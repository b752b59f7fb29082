use anyhow::{Context, Result};
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;
use ort::{session::Session, value::Value};

use crate::face::Detection;
use crate::yunet;

/// YuNet is exported with a fixed `[1, 3, 640, 640]` input.
pub const DETECTOR_INPUT: u32 = 640;

/// Placement of the source image inside the square detector canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl Letterbox {
    pub fn fit(width: u32, height: u32, target: u32) -> Self {
        let scale = target as f32 / width.max(height).max(1) as f32;
        let new_w = ((width as f32 * scale) as u32).min(target);
        let new_h = ((height as f32 * scale) as u32).min(target);
        Self {
            scale,
            offset_x: (target - new_w) / 2,
            offset_y: (target - new_h) / 2,
        }
    }

    /// Map a canvas pixel coordinate back onto the source image.
    pub fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.offset_x as f32) / self.scale,
            (y - self.offset_y as f32) / self.scale,
        )
    }

    fn apply(&self, img: &DynamicImage, target: u32) -> RgbImage {
        let (w, h) = img.dimensions();
        let new_w = ((w as f32 * self.scale) as u32).clamp(1, target);
        let new_h = ((h as f32 * self.scale) as u32).clamp(1, target);
        let resized = img
            .resize_exact(new_w, new_h, image::imageops::FilterType::Triangle)
            .to_rgb8();
        let mut canvas = RgbImage::new(target, target);
        image::imageops::overlay(
            &mut canvas,
            &resized,
            self.offset_x as i64,
            self.offset_y as i64,
        );
        canvas
    }
}

/// Planar BGR `[1, 3, H, W]` tensor with raw 0..255 values.
pub fn bgr_planar(img: &RgbImage) -> Result<Array4<f32>> {
    let (w, h) = img.dimensions();
    let plane = (w * h) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    for (i, px) in img.pixels().enumerate() {
        data[i] = px[2] as f32;
        data[plane + i] = px[1] as f32;
        data[2 * plane + i] = px[0] as f32;
    }
    Ok(Array4::from_shape_vec((1, 3, h as usize, w as usize), data)?)
}

/// Detect faces in an image using YuNet detector
pub fn detect_faces(
    session: &mut Session,
    img: &DynamicImage,
    score_threshold: f32,
    nms_threshold: f32,
) -> Result<Vec<Detection>> {
    let target = DETECTOR_INPUT;
    let (width, height) = img.dimensions();
    let letterbox = Letterbox::fit(width, height, target);
    let canvas = letterbox.apply(img, target);

    let input_tensor = Value::from_array(bgr_planar(&canvas)?)?;
    let outputs = session
        .run(ort::inputs![input_tensor])
        .context("running detector")?;

    let mut output_data: Vec<(Vec<i64>, Vec<f32>)> = Vec::new();
    for (_name, output) in outputs.iter() {
        let (shape, data) = output.try_extract_tensor::<f32>()?;
        output_data.push((shape.iter().copied().collect(), data.to_vec()));
    }
    let output_refs: Vec<(&[i64], &[f32])> = output_data
        .iter()
        .map(|(s, d)| (s.as_slice(), d.as_slice()))
        .collect();

    let scales = yunet::parse_yunet_outputs(&output_refs, target as usize)?;
    let raw = yunet::decode_detections(&scales, score_threshold, target as usize)?;

    let side = target as f32;
    let detections: Vec<Detection> = raw
        .into_iter()
        .map(|d| {
            let (x, y) = letterbox.unmap(d.bbox[0] * side, d.bbox[1] * side);
            let mut landmarks = [0.0f32; 10];
            for k in 0..5 {
                let (lx, ly) =
                    letterbox.unmap(d.landmarks[k * 2] * side, d.landmarks[k * 2 + 1] * side);
                landmarks[k * 2] = lx;
                landmarks[k * 2 + 1] = ly;
            }
            Detection {
                bbox: [
                    x,
                    y,
                    d.bbox[2] * side / letterbox.scale,
                    d.bbox[3] * side / letterbox.scale,
                ],
                score: d.score,
                landmarks,
            }
        })
        .collect();

    log::debug!("{} candidate face(s) above {}", detections.len(), score_threshold);

    if nms_threshold < 1.0 {
        Ok(nms(&detections, nms_threshold))
    } else {
        Ok(detections)
    }
}

/// Greedy non-maximum suppression, highest score first
pub fn nms(detections: &[Detection], iou_threshold: f32) -> Vec<Detection> {
    let mut sorted = detections.to_vec();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<Detection> = Vec::new();
    for candidate in sorted {
        if keep
            .iter()
            .all(|k| compute_iou(&k.bbox, &candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = (x2 - x1) * (y2 - y1);
    inter / (a[2] * a[3] + b[2] * b[3] - inter)
}
