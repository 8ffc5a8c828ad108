//! Signal source adapters.
//!
//! The engine does not run perception itself. Each tick it pulls the
//! current frame, asks a face detector about it and reads the speech
//! activity flag through these traits. Implementations wrap whatever the
//! host uses: an in-browser model bridge, a remote inference service, or
//! readings pushed over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use proctor_types::Snapshot;
use serde::{Deserialize, Serialize};

use crate::error::MonitorResult;

/// A decoded video frame handed to the face detector.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Monotonic frame counter from the capture device.
    pub sequence: u64,

    pub width: u32,

    pub height: u32,

    pub captured_at: DateTime<Utc>,

    /// Raw or encoded pixels; opaque to the engine.
    pub data: Bytes,
}

/// A 2D point in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned face box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Landmark anchors used for the gaze estimate.
///
/// `nose` is the top of the nose bridge, `left_eye` the outer corner of the
/// left eye and `right_eye` the outer corner of the right eye (points 27, 36
/// and 45 of the usual 68-point layout).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceLandmarks {
    pub nose: Point,
    pub left_eye: Point,
    pub right_eye: Point,
}

/// One detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub bounding_box: BoundingBox,

    #[serde(default)]
    pub landmarks: Option<FaceLandmarks>,
}

/// Current state of the speech activity detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechReading {
    pub is_quiet: bool,

    /// Last accepted utterance; empty if none yet.
    pub last_utterance_text: String,

    pub last_utterance_at: Option<DateTime<Utc>>,
}

impl SpeechReading {
    /// Reading for a channel that has heard nothing.
    pub fn quiet() -> Self {
        Self {
            is_quiet: true,
            last_utterance_text: String::new(),
            last_utterance_at: None,
        }
    }
}

impl Default for SpeechReading {
    fn default() -> Self {
        Self::quiet()
    }
}

/// Camera feed access.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Current frame, or `None` when the camera is not ready yet.
    async fn current_frame(&self) -> MonitorResult<Option<VideoFrame>>;

    /// Lossy still of the current frame for evidence.
    async fn capture_snapshot(&self, quality: f32) -> MonitorResult<Option<Snapshot>>;
}

/// Face and landmark detector.
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// Whether models are loaded and detection can run.
    async fn is_ready(&self) -> bool {
        true
    }

    /// Detect zero, one or many faces in `frame`.
    async fn detect_faces(&self, frame: &VideoFrame) -> MonitorResult<Vec<FaceObservation>>;
}

/// Speech activity detector.
#[async_trait]
pub trait SpeechActivity: Send + Sync {
    async fn speech_state(&self) -> MonitorResult<SpeechReading>;
}

/// The set of adapters a session samples from.
#[derive(Clone)]
pub struct SignalSources {
    pub frames: Arc<dyn FrameSource>,
    pub faces: Arc<dyn FaceDetector>,
    pub speech: Arc<dyn SpeechActivity>,
}

impl SignalSources {
    pub fn new(
        frames: Arc<dyn FrameSource>,
        faces: Arc<dyn FaceDetector>,
        speech: Arc<dyn SpeechActivity>,
    ) -> Self {
        Self {
            frames,
            faces,
            speech,
        }
    }
}
