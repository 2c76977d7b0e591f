// Frame-to-prediction conversion and degraded-mode synthesis

use crate::core::model_manager::ModelHandle;
use crate::models::frame::{PixelFormat, RawFrame};
use crate::models::pose::{ClassificationResult, InferenceError, InferenceResult, LabelSet};
use rand::Rng;

/// Confidence range for synthetic results.
const SYNTHETIC_CONFIDENCE_MIN: f32 = 0.30;
const SYNTHETIC_CONFIDENCE_MAX: f32 = 0.95;

/// Converts raw camera frames into classification results. Stateless: every
/// call allocates its own preprocessing buffers and releases them on return,
/// success or failure.
pub struct InferenceEngine;

impl InferenceEngine {
    pub fn new() -> Self {
        Self
    }

    /// Classify a frame against the given handle.
    ///
    /// Fails with `InferenceError::Unavailable` only when the handle is
    /// unavailable; callers substitute a synthetic result in that case.
    pub fn classify(
        &self,
        frame: &RawFrame,
        handle: &ModelHandle,
    ) -> InferenceResult<ClassificationResult> {
        let model = match handle {
            ModelHandle::Loaded(model) => model,
            ModelHandle::Unavailable => return Err(InferenceError::Unavailable),
        };

        let input = Self::preprocess(
            frame,
            model.classifier.input_width(),
            model.classifier.input_height(),
        )?;

        let scores = model.classifier.predict(&input)?;

        let (index, confidence) =
            Self::argmax(&scores).ok_or_else(|| InferenceError::Predict("empty output".into()))?;

        let label = model
            .labels
            .get(index)
            .ok_or(InferenceError::LabelIndex(index))?;

        Ok(ClassificationResult::from_model(label, confidence))
    }

    /// Fixed, deterministic preprocessing: RGB conversion, bilinear resize to
    /// the classifier's resolution, normalization to [0, 1], single-item
    /// batch. All intermediates are scoped locals.
    fn preprocess(frame: &RawFrame, width: u32, height: u32) -> InferenceResult<Vec<f32>> {
        let expected_len = frame.width as usize * frame.height as usize * 4;
        if frame.data.len() < expected_len {
            return Err(InferenceError::Preprocess(format!(
                "frame buffer has {} bytes, expected {}",
                frame.data.len(),
                expected_len
            )));
        }

        let mut rgba = frame.data[..expected_len].to_vec();
        if frame.format == PixelFormat::Bgra8 {
            for px in rgba.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }

        let img = image::RgbaImage::from_raw(frame.width, frame.height, rgba)
            .ok_or_else(|| InferenceError::Preprocess("frame dimension mismatch".into()))?;

        let resized =
            image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle);

        let mut input = Vec::with_capacity((width * height * 3) as usize);
        for px in resized.pixels() {
            input.push(px[0] as f32 / 255.0);
            input.push(px[1] as f32 / 255.0);
            input.push(px[2] as f32 / 255.0);
        }

        Ok(input)
    }

    /// Highest score wins; ties resolve to the lowest class index.
    fn argmax(scores: &[f32]) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &score) in scores.iter().enumerate() {
            match best {
                Some((_, current)) if score <= current => {}
                _ => best = Some((i, score)),
            }
        }
        best
    }

    /// Stand-in result for fully degraded operation: uniform label from the
    /// active set, confidence uniform in [0.30, 0.95], tagged synthetic so
    /// the UI and tests can tell it apart from real inference.
    pub fn synthetic_result(&self, labels: &LabelSet) -> ClassificationResult {
        let mut rng = rand::thread_rng();
        let index = rng.gen_range(0..labels.len());
        let confidence = rng.gen_range(SYNTHETIC_CONFIDENCE_MIN..=SYNTHETIC_CONFIDENCE_MAX);

        let label = labels.get(index).unwrap_or("Pose1");
        ClassificationResult::synthetic(label, confidence)
    }
}

impl Default for InferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}
