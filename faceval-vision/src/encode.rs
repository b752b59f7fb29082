use anyhow::{Context, Result};
use image::DynamicImage;
use ort::{session::Session, value::Value};

use crate::detect::bgr_planar;
use crate::face::Embedding;

/// SFace input side.
pub const RECOGNIZER_INPUT: u32 = 112;

/// Encode face image to embedding using SFace
pub fn encode_face(session: &mut Session, face_img: &DynamicImage) -> Result<Embedding> {
    let size = RECOGNIZER_INPUT;
    let face = face_img
        .resize_exact(size, size, image::imageops::FilterType::Triangle)
        .to_rgb8();

    let input_tensor = Value::from_array(bgr_planar(&face)?)?;
    let outputs = session
        .run(ort::inputs![input_tensor])
        .context("running recognizer")?;
    let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;

    // Expecting shape [1, 128]
    let dim = if shape.len() == 2 {
        shape[1] as usize
    } else {
        data.len()
    };
    if dim == 0 || dim > data.len() {
        anyhow::bail!("recognizer returned an empty embedding (shape {:?})", shape);
    }

    let mut values = data[..dim].to_vec();
    l2_normalize(&mut values);
    Ok(Embedding::from_vec(values))
}

/// L2 normalize a vector in place; zero vectors are left as is.
pub fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter_mut().for_each(|x| *x /= norm);
    }
}
