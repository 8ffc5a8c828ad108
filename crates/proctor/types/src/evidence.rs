//! Evidence attached to confirmed violations.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::condition::ConditionType;

/// Semantic category of an evidence record.
///
/// Visual conditions map one-to-one; `noise` is recorded as `voice` since
/// the evidence is what was said, not the noise level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvidenceKind {
    FaceMissing,
    NotFocus,
    MultiplePeople,
    Voice,
}

impl From<ConditionType> for EvidenceKind {
    fn from(condition: ConditionType) -> Self {
        match condition {
            ConditionType::FaceMissing => EvidenceKind::FaceMissing,
            ConditionType::NotFocus => EvidenceKind::NotFocus,
            ConditionType::MultiplePeople => EvidenceKind::MultiplePeople,
            ConditionType::Noise => EvidenceKind::Voice,
        }
    }
}

impl fmt::Display for EvidenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvidenceKind::FaceMissing => write!(f, "faceMissing"),
            EvidenceKind::NotFocus => write!(f, "notFocus"),
            EvidenceKind::MultiplePeople => write!(f, "multiplePeople"),
            EvidenceKind::Voice => write!(f, "voice"),
        }
    }
}

/// Lossy still image taken from the camera feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// MIME type of `data`, normally `image/jpeg`.
    pub mime_type: String,

    pub width: u32,

    pub height: u32,

    /// When the underlying frame was captured.
    pub captured_at: DateTime<Utc>,

    /// Encoded image bytes (base64 on the wire).
    #[serde(with = "base64_bytes")]
    pub data: Bytes,
}

impl Snapshot {
    /// Create a JPEG snapshot.
    pub fn jpeg(width: u32, height: u32, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            width,
            height,
            captured_at: Utc::now(),
            data: data.into(),
        }
    }

    /// Render as a `data:` URL suitable for direct display.
    pub fn to_data_url(&self) -> String {
        use base64::Engine;
        format!(
            "data:{};base64,{}",
            self.mime_type,
            base64::engine::general_purpose::STANDARD.encode(&self.data)
        )
    }
}

/// Artifact supporting a violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EvidencePayload {
    /// Camera still taken when the violation was confirmed.
    Snapshot(Snapshot),

    /// What the microphone picked up.
    Audio {
        transcript: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        audio_ref: Option<String>,
    },
}

/// One entry of the rolling evidence log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Semantic category, used for deduplication.
    pub kind: EvidenceKind,

    /// Condition whose confirmation produced this record.
    pub condition: ConditionType,

    pub timestamp: DateTime<Utc>,

    /// Human-readable description, used for deduplication.
    pub description: String,

    /// `None` when capture was unavailable.
    pub payload: Option<EvidencePayload>,

    /// Violation score after the confirmation that produced this record.
    pub score_at_capture: u32,
}

impl EvidenceRecord {
    /// Whether `other` would be a duplicate capture of this record.
    pub fn same_capture(&self, kind: EvidenceKind, description: &str) -> bool {
        self.kind == kind && self.description == description
    }
}

mod base64_bytes {
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noise_records_as_voice() {
        assert_eq!(EvidenceKind::from(ConditionType::Noise), EvidenceKind::Voice);
        assert_eq!(
            EvidenceKind::from(ConditionType::MultiplePeople),
            EvidenceKind::MultiplePeople
        );
        assert_eq!(EvidenceKind::Voice.to_string(), "voice");
    }

    #[test]
    fn test_snapshot_data_is_base64_on_the_wire() {
        let snapshot = Snapshot::jpeg(2, 2, vec![0xff, 0xd8, 0xff]);
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["data"], "/9j/");
        assert_eq!(snapshot.to_data_url(), "data:image/jpeg;base64,/9j/");

        let parsed: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.data, snapshot.data);
    }

    #[test]
    fn test_same_capture_compares_kind_and_description() {
        let record = EvidenceRecord {
            kind: EvidenceKind::FaceMissing,
            condition: ConditionType::FaceMissing,
            timestamp: Utc::now(),
            description: "Face not detected".to_string(),
            payload: None,
            score_at_capture: 1,
        };

        assert!(record.same_capture(EvidenceKind::FaceMissing, "Face not detected"));
        assert!(!record.same_capture(EvidenceKind::NotFocus, "Face not detected"));
        assert!(!record.same_capture(EvidenceKind::FaceMissing, "2 people detected"));
    }
}
