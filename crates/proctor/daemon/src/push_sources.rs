//! Signal sources fed over HTTP.
//!
//! The browser runs the detectors and pushes results: face observations for
//! its latest frame (optionally with a JPEG still) and final speech
//! transcripts. The session's tick loop pulls from here like from any other
//! adapter. A frame older than `max_frame_age` is reported as missing so a
//! stalled client skips ticks instead of replaying stale faces.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proctor_engine::{
    FaceDetector, FaceObservation, FrameSource, MonitorError, MonitorResult, SharedClock,
    SharedSpeechGate, SignalSources, SpeechActivity, SpeechConfig, SpeechReading, VideoFrame,
};
use proctor_types::Snapshot;
use tokio::sync::RwLock;

/// Latest frame pushed by the client.
#[derive(Debug, Clone)]
struct PushedFrame {
    sequence: u64,
    received_at: DateTime<Utc>,
    width: u32,
    height: u32,
    faces: Vec<FaceObservation>,
    snapshot: Option<Snapshot>,
}

/// Adapter exposing pushed signals as engine sources.
pub struct PushSources {
    frame: RwLock<Option<PushedFrame>>,
    speech: SharedSpeechGate,
    clock: SharedClock,
    max_frame_age: Duration,
}

impl PushSources {
    pub fn new(speech: &SpeechConfig, clock: SharedClock, max_frame_age: Duration) -> Self {
        Self {
            frame: RwLock::new(None),
            speech: SharedSpeechGate::new(speech, clock.clone()),
            clock,
            max_frame_age,
        }
    }

    /// Adapters for a session, all backed by this instance.
    pub fn signal_sources(self: &Arc<Self>) -> SignalSources {
        SignalSources::new(self.clone(), self.clone(), self.clone())
    }

    /// Replace the latest frame. Returns its sequence number.
    pub async fn push_frame(
        &self,
        width: u32,
        height: u32,
        faces: Vec<FaceObservation>,
        snapshot: Option<Snapshot>,
    ) -> u64 {
        let mut frame = self.frame.write().await;
        let sequence = frame.as_ref().map(|f| f.sequence + 1).unwrap_or(0);

        *frame = Some(PushedFrame {
            sequence,
            received_at: self.clock.now(),
            width,
            height,
            faces,
            snapshot,
        });

        sequence
    }

    /// Offer a final transcript. Returns whether it counted as speech.
    pub async fn push_transcript(&self, text: &str) -> bool {
        self.speech.record_utterance(text).await
    }

    /// Forget the latest frame and its snapshot.
    pub async fn release_frame(&self) {
        self.frame.write().await.take();
    }

    /// Whether a frame is held, fresh or not.
    pub async fn has_frame(&self) -> bool {
        self.frame.read().await.is_some()
    }

    /// The latest frame if it is recent enough.
    async fn fresh_frame(&self) -> Option<PushedFrame> {
        let frame = self.frame.read().await;
        let frame = frame.as_ref()?;

        let age = (self.clock.now() - frame.received_at)
            .to_std()
            .unwrap_or(Duration::ZERO);

        if age > self.max_frame_age {
            return None;
        }

        Some(frame.clone())
    }
}

#[async_trait]
impl FrameSource for PushSources {
    async fn current_frame(&self) -> MonitorResult<Option<VideoFrame>> {
        Ok(self.fresh_frame().await.map(|frame| VideoFrame {
            sequence: frame.sequence,
            width: frame.width,
            height: frame.height,
            captured_at: frame.received_at,
            data: frame
                .snapshot
                .map(|snapshot| snapshot.data)
                .unwrap_or_default(),
        }))
    }

    async fn capture_snapshot(&self, _quality: f32) -> MonitorResult<Option<Snapshot>> {
        // The client already encoded the still at its own quality
        Ok(self.fresh_frame().await.and_then(|frame| frame.snapshot))
    }
}

#[async_trait]
impl FaceDetector for PushSources {
    async fn detect_faces(&self, frame: &VideoFrame) -> MonitorResult<Vec<FaceObservation>> {
        let latest = self.frame.read().await;

        match latest.as_ref() {
            Some(pushed) if pushed.sequence == frame.sequence => Ok(pushed.faces.clone()),
            Some(_) => Err(MonitorError::DetectionFailed(format!(
                "frame {} was replaced during the tick",
                frame.sequence
            ))),
            None => Err(MonitorError::unavailable("push", "no frame pushed")),
        }
    }
}

#[async_trait]
impl SpeechActivity for PushSources {
    async fn speech_state(&self) -> MonitorResult<SpeechReading> {
        self.speech.speech_state().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_engine::{BoundingBox, MonotonicClock};

    fn sources() -> Arc<PushSources> {
        Arc::new(PushSources::new(
            &SpeechConfig::default(),
            Arc::new(MonotonicClock::new()),
            Duration::from_millis(2000),
        ))
    }

    fn face() -> FaceObservation {
        FaceObservation {
            bounding_box: BoundingBox {
                x: 10.0,
                y: 10.0,
                width: 80.0,
                height: 80.0,
            },
            landmarks: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_expire() {
        let sources = sources();
        assert!(sources.current_frame().await.unwrap().is_none());

        sources.push_frame(640, 480, vec![face()], None).await;

        let frame = sources.current_frame().await.unwrap().unwrap();
        assert_eq!(frame.sequence, 0);
        assert_eq!(sources.detect_faces(&frame).await.unwrap().len(), 1);

        tokio::time::advance(Duration::from_millis(2500)).await;
        assert!(sources.current_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replaced_frame_fails_detection() {
        let sources = sources();
        sources.push_frame(640, 480, vec![face()], None).await;
        let frame = sources.current_frame().await.unwrap().unwrap();

        let next = sources.push_frame(640, 480, Vec::new(), None).await;
        assert_eq!(next, 1);
        assert!(sources.detect_faces(&frame).await.is_err());
    }

    #[tokio::test]
    async fn test_snapshot_comes_from_pushed_frame() {
        let sources = sources();
        let still = Snapshot::jpeg(320, 240, vec![0xff, 0xd8]);
        sources.push_frame(320, 240, vec![face()], Some(still.clone())).await;

        let snapshot = sources.capture_snapshot(0.7).await.unwrap();
        assert_eq!(snapshot, Some(still));
    }

    #[tokio::test]
    async fn test_transcripts_feed_speech_gate() {
        let sources = sources();

        assert!(!sources.push_transcript("um").await);
        assert!(sources.speech_state().await.unwrap().is_quiet);

        assert!(sources.push_transcript("tell me the answer").await);
        let reading = sources.speech_state().await.unwrap();
        assert!(!reading.is_quiet);
        assert_eq!(reading.last_utterance_text, "tell me the answer");
    }
}
