//! Eye-landmark alignment onto the ArcFace 112x112 template.

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use crate::face::Detection;

/// Template eye centres for a 112x112 crop.
const REF_LEFT_EYE: (f32, f32) = (38.2946, 51.6963);
const REF_RIGHT_EYE: (f32, f32) = (73.5318, 51.5014);
const REF_SIZE: f32 = 112.0;

/// `out = [a b; -b a] * in + t`, a rotation plus uniform scale plus shift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub a: f32,
    pub b: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Similarity {
    /// Transform taking the detected eyes onto the template eyes of a `size` crop.
    pub fn from_eyes(left: (f32, f32), right: (f32, f32), size: u32) -> Self {
        let k = size as f32 / REF_SIZE;
        let ref_l = (REF_LEFT_EYE.0 * k, REF_LEFT_EYE.1 * k);
        let ref_r = (REF_RIGHT_EYE.0 * k, REF_RIGHT_EYE.1 * k);

        let (dx, dy) = (right.0 - left.0, right.1 - left.1);
        let (rdx, rdy) = (ref_r.0 - ref_l.0, ref_r.1 - ref_l.1);
        let dist = (dx * dx + dy * dy).sqrt().max(f32::EPSILON);
        let ref_dist = (rdx * rdx + rdy * rdy).sqrt();
        let scale = ref_dist / dist;
        let angle = rdy.atan2(rdx) - dy.atan2(dx);

        let a = scale * angle.cos();
        let b = scale * angle.sin();

        let center = ((left.0 + right.0) / 2.0, (left.1 + right.1) / 2.0);
        let ref_center = ((ref_l.0 + ref_r.0) / 2.0, (ref_l.1 + ref_r.1) / 2.0);

        Self {
            a,
            b,
            tx: ref_center.0 - (a * center.0 - b * center.1),
            ty: ref_center.1 - (b * center.0 + a * center.1),
        }
    }

    pub fn forward(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    pub fn inverse(&self, x: f32, y: f32) -> (f32, f32) {
        let det = self.a * self.a + self.b * self.b;
        let (px, py) = (x - self.tx, y - self.ty);
        (
            (self.a * px + self.b * py) / det,
            (-self.b * px + self.a * py) / det,
        )
    }
}

fn sample_bilinear(img: &DynamicImage, x: f32, y: f32) -> Option<Rgb<u8>> {
    let (w, h) = img.dimensions();
    if x < 0.0 || y < 0.0 || x >= w as f32 || y >= h as f32 {
        return None;
    }
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let corners = [
        (img.get_pixel(x0, y0), (1.0 - fx) * (1.0 - fy)),
        (img.get_pixel(x1, y0), fx * (1.0 - fy)),
        (img.get_pixel(x0, y1), (1.0 - fx) * fy),
        (img.get_pixel(x1, y1), fx * fy),
    ];
    let mut out = [0u8; 3];
    for (c, slot) in out.iter_mut().enumerate() {
        let v: f32 = corners.iter().map(|(p, w)| p[c] as f32 * w).sum();
        *slot = v.round().clamp(0.0, 255.0) as u8;
    }
    Some(Rgb(out))
}

/// Warp the detected face into a `size` x `size` crop; pixels outside the source stay black.
pub fn align_face(img: &DynamicImage, detection: &Detection, size: u32) -> DynamicImage {
    let left = (detection.landmarks[0], detection.landmarks[1]);
    let right = (detection.landmarks[2], detection.landmarks[3]);
    let transform = Similarity::from_eyes(left, right, size);

    let mut output = RgbImage::new(size, size);
    for (x, y, px) in output.enumerate_pixels_mut() {
        let (sx, sy) = transform.inverse(x as f32, y as f32);
        if let Some(v) = sample_bilinear(img, sx, sy) {
            *px = v;
        }
    }
    DynamicImage::ImageRgb8(output)
}
