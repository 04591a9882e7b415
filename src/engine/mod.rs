//! Face engine abstraction.
//!
//! The vision backend (face detection + embedding extraction) is an external
//! collaborator reached through the [`FaceEngine`] trait. The service never
//! depends on a concrete model; handlers, encoder, and comparator work
//! against this seam so a mock engine can drive the full HTTP stack in
//! tests.
//!
//! The crate ships one real implementation, [`OnnxFaceEngine`], behind the
//! `onnx` feature.

#[cfg(feature = "onnx")]
mod onnx;

#[cfg(feature = "onnx")]
pub use onnx::OnnxFaceEngine;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A face bounding box in pixel coordinates.
///
/// Follows the `(top, right, bottom, left)` convention and serializes on the
/// wire as a 4-element array in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceLocation {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl FaceLocation {
    pub fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Wire representation: `[top, right, bottom, left]`.
    pub fn as_array(&self) -> [u32; 4] {
        [self.top, self.right, self.bottom, self.left]
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }
}

/// A face embedding vector.
///
/// Dimensionality is fixed by the model that produced it (512 for ArcFace);
/// the service itself is agnostic and only requires both sides of a
/// comparison to agree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean distance to another embedding of the same dimensionality.
    ///
    /// Accumulates in f64 so the reported distance is stable regardless of
    /// vector length.
    pub fn euclidean_distance(&self, other: &Embedding) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| {
                let d = f64::from(*a) - f64::from(*b);
                d * d
            })
            .sum::<f64>()
            .sqrt()
    }
}

/// The vision backend seam.
///
/// Implementations are shared across requests behind an `Arc` and must be
/// safe to call concurrently. Both methods are synchronous CPU work; the
/// encoder runs them on the blocking thread pool.
pub trait FaceEngine: Send + Sync + 'static {
    /// Detect faces in an image, returning zero or more bounding boxes.
    fn detect(&self, image: &RgbImage) -> Result<Vec<FaceLocation>, EngineError>;

    /// Compute one embedding per given face location.
    ///
    /// May return fewer embeddings than locations if extraction fails for
    /// some faces; callers decide how to treat that.
    fn embed(
        &self,
        image: &RgbImage,
        faces: &[FaceLocation],
    ) -> Result<Vec<Embedding>, EngineError>;
}
