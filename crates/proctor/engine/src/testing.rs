//! Scripted signal sources for tests.
//!
//! Available under `cfg(test)` and with the `test-utils` feature so that
//! downstream crates can drive sessions without real perception.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use proctor_types::Snapshot;

use crate::error::{MonitorError, MonitorResult};
use crate::sources::{
    BoundingBox, FaceDetector, FaceLandmarks, FaceObservation, FrameSource, Point, SignalSources,
    SpeechActivity, SpeechReading, VideoFrame,
};

/// A frontal face with centred landmarks.
pub fn centred_face() -> FaceObservation {
    face_with_nose(50.0)
}

/// A face turned far enough to fail the gaze band.
pub fn turned_face() -> FaceObservation {
    face_with_nose(25.0)
}

fn face_with_nose(nose_x: f64) -> FaceObservation {
    FaceObservation {
        bounding_box: BoundingBox {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        },
        landmarks: Some(FaceLandmarks {
            nose: Point::new(nose_x, 40.0),
            left_eye: Point::new(20.0, 30.0),
            right_eye: Point::new(80.0, 30.0),
        }),
    }
}

/// Frame source with a fixed frame and configurable snapshots.
#[derive(Debug, Default)]
pub struct StaticFrameSource {
    no_frames: AtomicBool,
    fail_snapshots: bool,
    snapshot: Option<Snapshot>,
    sequence: AtomicU64,
    snapshot_calls: AtomicUsize,
}

impl StaticFrameSource {
    /// Always has a frame; snapshots are unavailable.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Some(snapshot),
            ..Self::default()
        }
    }

    pub fn failing_snapshots() -> Self {
        Self {
            fail_snapshots: true,
            ..Self::default()
        }
    }

    /// Toggle whether `current_frame` returns `None`.
    pub fn set_frames_available(&self, available: bool) {
        self.no_frames.store(!available, Ordering::SeqCst);
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameSource for StaticFrameSource {
    async fn current_frame(&self) -> MonitorResult<Option<VideoFrame>> {
        if self.no_frames.load(Ordering::SeqCst) {
            return Ok(None);
        }

        Ok(Some(VideoFrame {
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
            width: 640,
            height: 480,
            captured_at: Utc::now(),
            data: Bytes::new(),
        }))
    }

    async fn capture_snapshot(&self, _quality: f32) -> MonitorResult<Option<Snapshot>> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_snapshots {
            return Err(MonitorError::SnapshotFailed("camera busy".to_string()));
        }

        Ok(self.snapshot.clone())
    }
}

/// Face detector returning whatever faces were last set.
#[derive(Debug)]
pub struct ScriptedFaceDetector {
    ready: AtomicBool,
    failing: AtomicBool,
    latency: Mutex<Duration>,
    faces: Mutex<Vec<FaceObservation>>,
}

impl ScriptedFaceDetector {
    /// Ready, reporting one centred face.
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            latency: Mutex::new(Duration::ZERO),
            faces: Mutex::new(vec![centred_face()]),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Make detection fail until cleared.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Time each detection takes before returning.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = latency;
    }

    pub fn set_faces(&self, faces: Vec<FaceObservation>) {
        *self.faces.lock().unwrap() = faces;
    }
}

impl Default for ScriptedFaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaceDetector for ScriptedFaceDetector {
    async fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn detect_faces(&self, _frame: &VideoFrame) -> MonitorResult<Vec<FaceObservation>> {
        let latency = *self.latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(MonitorError::DetectionFailed("model error".to_string()));
        }

        Ok(self.faces.lock().unwrap().clone())
    }
}

/// Speech source returning a fixed reading.
#[derive(Debug, Default)]
pub struct ScriptedSpeech {
    reading: Mutex<SpeechReading>,
}

impl ScriptedSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reading(&self, reading: SpeechReading) {
        *self.reading.lock().unwrap() = reading;
    }

    /// Report continuous speech of `text`.
    pub fn speaking(&self, text: &str) {
        self.set_reading(SpeechReading {
            is_quiet: false,
            last_utterance_text: text.to_string(),
            last_utterance_at: Some(Utc::now()),
        });
    }

    pub fn silence(&self) {
        self.set_reading(SpeechReading::quiet());
    }
}

#[async_trait]
impl SpeechActivity for ScriptedSpeech {
    async fn speech_state(&self) -> MonitorResult<SpeechReading> {
        Ok(self.reading.lock().unwrap().clone())
    }
}

/// A full set of scripted sources with handles kept for steering.
#[derive(Clone)]
pub struct ScriptedSources {
    pub frames: Arc<StaticFrameSource>,
    pub faces: Arc<ScriptedFaceDetector>,
    pub speech: Arc<ScriptedSpeech>,
}

impl ScriptedSources {
    pub fn new() -> Self {
        Self::with_frames(StaticFrameSource::with_snapshot(Snapshot::jpeg(
            64,
            48,
            vec![0xff, 0xd8, 0xff, 0xd9],
        )))
    }

    pub fn with_frames(frames: StaticFrameSource) -> Self {
        Self {
            frames: Arc::new(frames),
            faces: Arc::new(ScriptedFaceDetector::new()),
            speech: Arc::new(ScriptedSpeech::new()),
        }
    }

    pub fn signal_sources(&self) -> SignalSources {
        SignalSources::new(self.frames.clone(), self.faces.clone(), self.speech.clone())
    }
}

impl Default for ScriptedSources {
    fn default() -> Self {
        Self::new()
    }
}
