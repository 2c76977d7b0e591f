// Data structures for camera frame acquisition

use serde::{Deserialize, Serialize};

/// A captured frame from the camera
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub timestamp: i64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: PixelFormat,
}

/// Pixel format of captured frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Rgba8,
    Bgra8,
}

/// Preferred camera orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraFacing {
    Front,
    Back,
    Any,
}

/// Capture constraints requested from the camera backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraConstraints {
    pub width: u32,
    pub height: u32,
    pub facing: CameraFacing,
}

impl CameraConstraints {
    /// The preferred request: 640x480, front-facing.
    pub fn preferred() -> Self {
        Self {
            width: 640,
            height: 480,
            facing: CameraFacing::Front,
        }
    }

    /// Progressively relaxed constraint tiers for bounded acquisition retry.
    /// Same resolution with any orientation first, then fully unconstrained.
    pub fn relaxation_tiers() -> Vec<Self> {
        vec![
            Self::preferred(),
            Self {
                width: 640,
                height: 480,
                facing: CameraFacing::Any,
            },
            Self {
                width: 0,
                height: 0,
                facing: CameraFacing::Any,
            },
        ]
    }

    pub fn is_unconstrained(&self) -> bool {
        self.width == 0 && self.height == 0 && self.facing == CameraFacing::Any
    }
}

/// Error types for camera operations
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("camera acquisition failed: {0}")]
    AcquisitionFailed(String),

    #[error("camera acquisition exhausted after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("frame capture failed: {0}")]
    FrameFailed(String),

    #[error("camera not acquired")]
    NotAcquired,
}

pub type CameraResult<T> = Result<T, CameraError>;
