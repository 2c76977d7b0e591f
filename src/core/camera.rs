// Camera acquisition with bounded constraint relaxation

use crate::models::frame::{
    CameraConstraints, CameraError, CameraResult, PixelFormat, RawFrame,
};
use async_trait::async_trait;

/// Maximum acquisition attempts before giving up. Matches the number of
/// constraint relaxation tiers.
const MAX_ACQUIRE_ATTEMPTS: u32 = 3;

/// An open capture stream. One frame at a time, pull-based.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn next_frame(&mut self) -> CameraResult<RawFrame>;
    async fn close(&mut self);
}

/// Platform seam for opening a capture stream against a set of constraints.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    async fn open(&self, constraints: &CameraConstraints) -> CameraResult<Box<dyn FrameSource>>;
}

/// Owns camera acquisition and release. Retries with progressively relaxed
/// constraints so a missing front camera or unsupported resolution does not
/// block a session on hardware that could still capture something.
pub struct CameraSource {
    backend: Box<dyn CameraBackend>,
    source: Option<Box<dyn FrameSource>>,
}

impl CameraSource {
    pub fn new(backend: Box<dyn CameraBackend>) -> Self {
        Self {
            backend,
            source: None,
        }
    }

    /// Open a capture stream. Walks the relaxation tiers, one attempt each,
    /// up to three attempts total. Reacquiring while already open releases
    /// the previous stream first.
    pub async fn acquire(&mut self) -> CameraResult<()> {
        self.release().await;

        let mut attempts = 0u32;
        for constraints in CameraConstraints::relaxation_tiers() {
            if attempts >= MAX_ACQUIRE_ATTEMPTS {
                break;
            }
            attempts += 1;

            match self.backend.open(&constraints).await {
                Ok(source) => {
                    if constraints.is_unconstrained() {
                        println!("Camera acquired (unconstrained, attempt {})", attempts);
                    } else {
                        println!(
                            "Camera acquired ({}x{}, attempt {})",
                            constraints.width, constraints.height, attempts
                        );
                    }
                    self.source = Some(source);
                    return Ok(());
                }
                Err(e) => {
                    eprintln!("Camera open failed on attempt {}: {}", attempts, e);
                }
            }
        }

        Err(CameraError::Exhausted { attempts })
    }

    pub fn is_acquired(&self) -> bool {
        self.source.is_some()
    }

    /// Capture one frame from the open stream.
    pub async fn next_frame(&mut self) -> CameraResult<RawFrame> {
        match self.source.as_mut() {
            Some(source) => source.next_frame().await,
            None => Err(CameraError::NotAcquired),
        }
    }

    /// Close the stream if open. Idempotent.
    pub async fn release(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close().await;
            println!("Camera released");
        }
    }
}

// ==============================================================================
// Synthetic Backend
// ==============================================================================

/// Backend producing flat gray frames, used when no real capture device is
/// wired in and by tests.
pub struct SyntheticCamera;

struct SyntheticStream {
    width: u32,
    height: u32,
}

#[async_trait]
impl FrameSource for SyntheticStream {
    async fn next_frame(&mut self) -> CameraResult<RawFrame> {
        Ok(RawFrame {
            timestamp: chrono::Utc::now().timestamp_millis(),
            width: self.width,
            height: self.height,
            data: vec![128u8; (self.width * self.height * 4) as usize],
            format: PixelFormat::Rgba8,
        })
    }

    async fn close(&mut self) {}
}

#[async_trait]
impl CameraBackend for SyntheticCamera {
    async fn open(&self, constraints: &CameraConstraints) -> CameraResult<Box<dyn FrameSource>> {
        let (width, height) = if constraints.is_unconstrained() {
            (640, 480)
        } else {
            (constraints.width, constraints.height)
        };
        Ok(Box::new(SyntheticStream { width, height }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Backend that fails the first `failures` opens, then succeeds.
    struct FlakyBackend {
        failures: std::sync::atomic::AtomicU32,
    }

    impl FlakyBackend {
        fn failing(failures: u32) -> Self {
            Self {
                failures: std::sync::atomic::AtomicU32::new(failures),
            }
        }
    }

    #[async_trait]
    impl CameraBackend for FlakyBackend {
        async fn open(
            &self,
            constraints: &CameraConstraints,
        ) -> CameraResult<Box<dyn FrameSource>> {
            use std::sync::atomic::Ordering;
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(CameraError::AcquisitionFailed("no device".to_string()));
            }
            SyntheticCamera.open(constraints).await
        }
    }

    #[tokio::test]
    async fn test_acquire_succeeds_first_try() {
        let mut camera = CameraSource::new(Box::new(SyntheticCamera));
        camera.acquire().await.unwrap();
        assert!(camera.is_acquired());

        let frame = camera.next_frame().await.unwrap();
        assert_eq!(frame.width, 640);
        assert_eq!(frame.height, 480);
        assert_eq!(frame.data.len(), 640 * 480 * 4);
    }

    #[tokio::test]
    async fn test_acquire_relaxes_after_failures() {
        // First two tiers fail, the unconstrained tier succeeds
        let mut camera = CameraSource::new(Box::new(FlakyBackend::failing(2)));
        camera.acquire().await.unwrap();
        assert!(camera.is_acquired());
    }

    #[tokio::test]
    async fn test_acquire_exhausts_after_three_attempts() {
        let mut camera = CameraSource::new(Box::new(FlakyBackend::failing(10)));
        match camera.acquire().await {
            Err(CameraError::Exhausted { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {:?}", other.map(|_| ())),
        }
        assert!(!camera.is_acquired());
    }

    #[tokio::test]
    async fn test_next_frame_requires_acquisition() {
        let mut camera = CameraSource::new(Box::new(SyntheticCamera));
        assert!(matches!(
            camera.next_frame().await,
            Err(CameraError::NotAcquired)
        ));
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let mut camera = CameraSource::new(Box::new(SyntheticCamera));
        camera.acquire().await.unwrap();
        camera.release().await;
        camera.release().await;
        assert!(!camera.is_acquired());
    }
}
