//! ONNX Runtime face engine.
//!
//! Pairs an SCRFD-style anchor-free detector with an ArcFace-style
//! recognizer, both loaded as ONNX sessions. The detector runs on a 640x640
//! letterboxed RGB tensor and decodes three stride levels; the recognizer
//! consumes 112x112 face crops and emits L2-normalized embeddings.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use tracing::{debug, info};

use super::{Embedding, FaceEngine, FaceLocation};
use crate::error::EngineError;

const DETECT_INPUT_SIZE: u32 = 640;
const DETECT_MEAN: f32 = 127.5;
const DETECT_STD: f32 = 128.0;
const DETECT_SCORE_THRESHOLD: f32 = 0.5;
const DETECT_NMS_IOU: f32 = 0.4;
const DETECT_STRIDES: [u32; 3] = [8, 16, 32];
const ANCHORS_PER_CELL: usize = 2;

const EMBED_INPUT_SIZE: u32 = 112;
const EMBED_MEAN: f32 = 127.5;
// ArcFace normalization is symmetric, unlike the detector's.
const EMBED_STD: f32 = 127.5;

impl From<ort::Error> for EngineError {
    fn from(err: ort::Error) -> Self {
        EngineError::Inference(err.to_string())
    }
}

/// Letterbox parameters for mapping detections back to source coordinates.
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

/// A raw detection in source-image coordinates, before NMS.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
}

/// Face engine backed by two ONNX sessions.
///
/// Sessions require exclusive access to run, so each sits behind a mutex;
/// requests serialize on the model, which matches the one-request-at-a-time
/// cost profile of CPU inference.
pub struct OnnxFaceEngine {
    detector: Mutex<Session>,
    recognizer: Mutex<Session>,
}

impl OnnxFaceEngine {
    /// Load both models from disk.
    ///
    /// The detector must export outputs in the standard SCRFD positional
    /// order: scores for strides 8/16/32 first, then the matching bbox
    /// offsets (landmark outputs, if present, are ignored).
    pub fn load(
        detector_path: impl AsRef<Path>,
        recognizer_path: impl AsRef<Path>,
    ) -> Result<Self, EngineError> {
        let detector = load_session(detector_path.as_ref())?;
        let recognizer = load_session(recognizer_path.as_ref())?;

        let num_outputs = detector.outputs().len();
        if num_outputs < DETECT_STRIDES.len() * 2 {
            return Err(EngineError::Inference(format!(
                "detector model must export score and bbox tensors for {} strides, got {} outputs",
                DETECT_STRIDES.len(),
                num_outputs
            )));
        }

        Ok(Self {
            detector: Mutex::new(detector),
            recognizer: Mutex::new(recognizer),
        })
    }
}

fn load_session(path: &Path) -> Result<Session, EngineError> {
    if !path.exists() {
        return Err(EngineError::ModelNotFound(path.display().to_string()));
    }

    let session = Session::builder()?
        .with_intra_threads(2)?
        .commit_from_file(path)?;

    info!(
        path = %path.display(),
        outputs = ?session.outputs().iter().map(|o| o.name().to_string()).collect::<Vec<_>>(),
        "loaded ONNX model"
    );

    Ok(session)
}

/// Lock a session, recovering from a poisoned mutex (sessions hold no
/// invariants that a panicked request could corrupt).
fn lock(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FaceEngine for OnnxFaceEngine {
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceLocation>, EngineError> {
        let (tensor, letterbox) = preprocess_detect(image);

        let mut session = lock(&self.detector);
        let outputs = session.run(ort::inputs![TensorRef::from_array_view(tensor.view())?])?;

        let mut candidates = Vec::new();
        for (pos, &stride) in DETECT_STRIDES.iter().enumerate() {
            let (_, scores) = outputs[pos]
                .try_extract_tensor::<f32>()
                .map_err(|e| EngineError::Inference(format!("scores stride {stride}: {e}")))?;
            let (_, boxes) = outputs[pos + DETECT_STRIDES.len()]
                .try_extract_tensor::<f32>()
                .map_err(|e| EngineError::Inference(format!("bboxes stride {stride}: {e}")))?;

            candidates.extend(decode_stride(scores, boxes, stride, &letterbox));
        }
        drop(outputs);
        drop(session);

        let kept = nms(candidates, DETECT_NMS_IOU);
        debug!(faces = kept.len(), "detection pass complete");

        let (width, height) = image.dimensions();
        Ok(kept
            .iter()
            .filter_map(|c| to_face_location(c, width, height))
            .collect())
    }

    fn embed(
        &self,
        image: &RgbImage,
        faces: &[FaceLocation],
    ) -> Result<Vec<Embedding>, EngineError> {
        let mut embeddings = Vec::with_capacity(faces.len());

        for face in faces {
            if face.width() == 0 || face.height() == 0 {
                continue;
            }

            let crop = imageops::crop_imm(image, face.left, face.top, face.width(), face.height())
                .to_image();
            let aligned = imageops::resize(
                &crop,
                EMBED_INPUT_SIZE,
                EMBED_INPUT_SIZE,
                FilterType::Triangle,
            );
            let tensor = preprocess_embed(&aligned);

            let mut session = lock(&self.recognizer);
            let outputs = session.run(ort::inputs![TensorRef::from_array_view(tensor.view())?])?;
            let (_, raw) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| EngineError::Inference(format!("embedding extraction: {e}")))?;

            if raw.is_empty() {
                return Err(EngineError::Inference(
                    "recognizer produced an empty embedding".to_string(),
                ));
            }

            embeddings.push(Embedding::new(l2_normalize(raw)));
        }

        Ok(embeddings)
    }
}

/// Letterbox-resize into a normalized NCHW tensor.
///
/// Padding is left at 0.0, which is exactly the normalized value of the
/// detector mean.
fn preprocess_detect(image: &RgbImage) -> (Array4<f32>, Letterbox) {
    let (width, height) = image.dimensions();
    let size = DETECT_INPUT_SIZE;

    let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
    let new_w = ((width as f32 * scale).round() as u32).max(1);
    let new_h = ((height as f32 * scale).round() as u32).max(1);
    let pad_x = (size - new_w) as f32 / 2.0;
    let pad_y = (size - new_h) as f32 / 2.0;

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
    let x_off = pad_x.floor() as usize;
    let y_off = pad_y.floor() as usize;

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize + y_off, x as usize + x_off]] =
                (pixel[c] as f32 - DETECT_MEAN) / DETECT_STD;
        }
    }

    (tensor, Letterbox { scale, pad_x, pad_y })
}

/// Normalize a 112x112 RGB crop into an NCHW tensor.
fn preprocess_embed(crop: &RgbImage) -> Array4<f32> {
    let size = EMBED_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));

    for (x, y, pixel) in crop.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 - EMBED_MEAN) / EMBED_STD;
        }
    }

    tensor
}

/// Decode anchor-free detections for one stride level back into source
/// coordinates.
fn decode_stride(scores: &[f32], boxes: &[f32], stride: u32, letterbox: &Letterbox) -> Vec<Candidate> {
    let grid = (DETECT_INPUT_SIZE / stride) as usize;
    let num_anchors = grid * grid * ANCHORS_PER_CELL;
    let stride = stride as f32;

    let mut candidates = Vec::new();

    for idx in 0..num_anchors {
        let score = scores.get(idx).copied().unwrap_or(0.0);
        if score <= DETECT_SCORE_THRESHOLD {
            continue;
        }

        let cell = idx / ANCHORS_PER_CELL;
        let anchor_cx = (cell % grid) as f32 * stride;
        let anchor_cy = (cell / grid) as f32 * stride;

        let off = idx * 4;
        if off + 3 >= boxes.len() {
            continue;
        }

        // Offsets are distances from the anchor center to each edge, in
        // stride units.
        let x1 = anchor_cx - boxes[off] * stride;
        let y1 = anchor_cy - boxes[off + 1] * stride;
        let x2 = anchor_cx + boxes[off + 2] * stride;
        let y2 = anchor_cy + boxes[off + 3] * stride;

        candidates.push(Candidate {
            x1: (x1 - letterbox.pad_x) / letterbox.scale,
            y1: (y1 - letterbox.pad_y) / letterbox.scale,
            x2: (x2 - letterbox.pad_x) / letterbox.scale,
            y2: (y2 - letterbox.pad_y) / letterbox.scale,
            score,
        });
    }

    candidates
}

/// Non-maximum suppression, highest score first.
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let inter_w = (a.x2.min(b.x2) - a.x1.max(b.x1)).max(0.0);
    let inter_h = (a.y2.min(b.y2) - a.y1.max(b.y1)).max(0.0);
    let inter = inter_w * inter_h;

    let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
    let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);
    let union = area_a + area_b - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Clamp a candidate to image bounds; drops boxes that collapse to zero area.
fn to_face_location(candidate: &Candidate, width: u32, height: u32) -> Option<FaceLocation> {
    let left = candidate.x1.round().clamp(0.0, width as f32) as u32;
    let top = candidate.y1.round().clamp(0.0, height as f32) as u32;
    let right = candidate.x2.round().clamp(0.0, width as f32) as u32;
    let bottom = candidate.y2.round().clamp(0.0, height as f32) as u32;

    if right <= left || bottom <= top {
        return None;
    }

    Some(FaceLocation::new(top, right, bottom, left))
}

fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}
