// Classifier backends: remote-descriptor linear model and the built-in fallback

use crate::models::model::{ModelDescriptor, ModelError, ModelResult};
use crate::models::pose::{InferenceError, InferenceResult};

/// A loaded pose classifier. Implementations are read-only once constructed;
/// the model manager replaces the whole instance rather than mutating it.
pub trait Classifier: Send + Sync {
    /// Expected input resolution.
    fn input_width(&self) -> u32;
    fn input_height(&self) -> u32;

    /// Number of output classes.
    fn num_classes(&self) -> usize;

    /// Run a prediction over a flattened normalized RGB image
    /// (`input_width * input_height * 3` values in [0, 1]).
    /// Returns one score per class, each in [0, 1].
    fn predict(&self, input: &[f32]) -> InferenceResult<Vec<f32>>;
}

/// Softmax in place, guarding against overflow by shifting by the max score.
pub(crate) fn softmax(scores: &mut [f32]) {
    if scores.is_empty() {
        return;
    }

    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for s in scores.iter_mut() {
        *s = (*s - max).exp();
        sum += *s;
    }
    if sum > 0.0 {
        for s in scores.iter_mut() {
            *s /= sum;
        }
    }
}

// ==============================================================================
// Linear Classifier (remote descriptor)
// ==============================================================================

/// Classifier built from a fetched `ModelDescriptor`: one weight vector and
/// bias per class over the flattened image, softmax outputs.
pub struct LinearClassifier {
    input_width: u32,
    input_height: u32,
    weights: Vec<Vec<f32>>,
    bias: Vec<f32>,
}

impl LinearClassifier {
    pub fn from_descriptor(descriptor: ModelDescriptor) -> ModelResult<Self> {
        if descriptor.input_width == 0 || descriptor.input_height == 0 {
            return Err(ModelError::Parse("zero input resolution".to_string()));
        }

        if descriptor.weights.is_empty() {
            return Err(ModelError::Parse("descriptor has no classes".to_string()));
        }

        if descriptor.weights.len() != descriptor.bias.len() {
            return Err(ModelError::Parse(format!(
                "{} weight vectors but {} biases",
                descriptor.weights.len(),
                descriptor.bias.len()
            )));
        }

        let expected = (descriptor.input_width * descriptor.input_height * 3) as usize;
        for (class, row) in descriptor.weights.iter().enumerate() {
            if row.len() != expected {
                return Err(ModelError::Parse(format!(
                    "class {} weight vector has {} values, expected {}",
                    class,
                    row.len(),
                    expected
                )));
            }
        }

        Ok(Self {
            input_width: descriptor.input_width,
            input_height: descriptor.input_height,
            weights: descriptor.weights,
            bias: descriptor.bias,
        })
    }
}

impl Classifier for LinearClassifier {
    fn input_width(&self) -> u32 {
        self.input_width
    }

    fn input_height(&self) -> u32 {
        self.input_height
    }

    fn num_classes(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, input: &[f32]) -> InferenceResult<Vec<f32>> {
        let expected = (self.input_width * self.input_height * 3) as usize;
        if input.len() != expected {
            return Err(InferenceError::Predict(format!(
                "input has {} values, expected {}",
                input.len(),
                expected
            )));
        }

        let mut scores: Vec<f32> = self
            .weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect();

        softmax(&mut scores);
        Ok(scores)
    }
}

// ==============================================================================
// Fallback Classifier (built-in)
// ==============================================================================

const FALLBACK_INPUT_SIZE: u32 = 224;
const FALLBACK_CLASSES: usize = 3;

// Fixed weights over three luminance-band features (top, middle, bottom third
// of the frame). Crude, but deterministic and shaped like the real output.
const FALLBACK_WEIGHTS: [[f32; 3]; FALLBACK_CLASSES] = [
    [2.0, -1.0, -1.0],
    [-1.0, 2.0, -1.0],
    [-1.0, -1.0, 2.0],
];
const FALLBACK_BIAS: [f32; FALLBACK_CLASSES] = [0.05, 0.0, -0.05];

/// Minimal built-in classifier over the default label set, used when the
/// remote model cannot be loaded.
pub struct FallbackClassifier;

impl FallbackClassifier {
    pub fn new() -> ModelResult<Self> {
        Ok(Self)
    }

    fn band_luminance(input: &[f32], band: usize) -> f32 {
        let size = FALLBACK_INPUT_SIZE as usize;
        let rows_per_band = size / FALLBACK_CLASSES;
        let row_start = band * rows_per_band;
        let row_end = if band == FALLBACK_CLASSES - 1 {
            size
        } else {
            row_start + rows_per_band
        };

        let mut sum = 0.0f32;
        let mut count = 0usize;
        for row in row_start..row_end {
            let offset = row * size * 3;
            for px in input[offset..offset + size * 3].chunks_exact(3) {
                sum += 0.299 * px[0] + 0.587 * px[1] + 0.114 * px[2];
                count += 1;
            }
        }

        if count > 0 {
            sum / count as f32
        } else {
            0.0
        }
    }
}

impl Classifier for FallbackClassifier {
    fn input_width(&self) -> u32 {
        FALLBACK_INPUT_SIZE
    }

    fn input_height(&self) -> u32 {
        FALLBACK_INPUT_SIZE
    }

    fn num_classes(&self) -> usize {
        FALLBACK_CLASSES
    }

    fn predict(&self, input: &[f32]) -> InferenceResult<Vec<f32>> {
        let expected = (FALLBACK_INPUT_SIZE * FALLBACK_INPUT_SIZE * 3) as usize;
        if input.len() != expected {
            return Err(InferenceError::Predict(format!(
                "input has {} values, expected {}",
                input.len(),
                expected
            )));
        }

        let features: Vec<f32> = (0..FALLBACK_CLASSES)
            .map(|band| Self::band_luminance(input, band))
            .collect();

        let mut scores: Vec<f32> = FALLBACK_WEIGHTS
            .iter()
            .zip(FALLBACK_BIAS.iter())
            .map(|(row, b)| {
                row.iter()
                    .zip(&features)
                    .map(|(w, f)| w * f)
                    .sum::<f32>()
                    + b
            })
            .collect();

        softmax(&mut scores);
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_descriptor() -> ModelDescriptor {
        // 1x1 input, two classes
        ModelDescriptor {
            input_width: 1,
            input_height: 1,
            weights: vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
            bias: vec![0.0, 0.0],
        }
    }

    #[test]
    fn test_softmax_normalizes() {
        let mut scores = vec![1.0, 2.0, 3.0];
        softmax(&mut scores);
        let sum: f32 = scores.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(scores[2] > scores[1] && scores[1] > scores[0]);
    }

    #[test]
    fn test_linear_classifier_rejects_bad_shapes() {
        let mut descriptor = tiny_descriptor();
        descriptor.bias = vec![0.0];
        assert!(LinearClassifier::from_descriptor(descriptor).is_err());

        let mut descriptor = tiny_descriptor();
        descriptor.weights[0].pop();
        assert!(LinearClassifier::from_descriptor(descriptor).is_err());

        let mut descriptor = tiny_descriptor();
        descriptor.weights.clear();
        descriptor.bias.clear();
        assert!(LinearClassifier::from_descriptor(descriptor).is_err());
    }

    #[test]
    fn test_linear_classifier_predicts() {
        let classifier = LinearClassifier::from_descriptor(tiny_descriptor()).unwrap();
        // Red pixel favors class 0, green pixel favors class 1
        let red = classifier.predict(&[1.0, 0.0, 0.0]).unwrap();
        assert!(red[0] > red[1]);

        let green = classifier.predict(&[0.0, 1.0, 0.0]).unwrap();
        assert!(green[1] > green[0]);

        let sum: f32 = red.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_linear_classifier_rejects_wrong_input_len() {
        let classifier = LinearClassifier::from_descriptor(tiny_descriptor()).unwrap();
        assert!(matches!(
            classifier.predict(&[0.0; 5]),
            Err(InferenceError::Predict(_))
        ));
    }

    #[test]
    fn test_fallback_classifier_deterministic() {
        let classifier = FallbackClassifier::new().unwrap();
        let input = vec![0.5f32; (224 * 224 * 3) as usize];

        let a = classifier.predict(&input).unwrap();
        let b = classifier.predict(&input).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);

        let sum: f32 = a.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_fallback_classifier_rejects_wrong_input_len() {
        let classifier = FallbackClassifier::new().unwrap();
        assert!(classifier.predict(&[0.0; 12]).is_err());
    }
}
