//! Evidence collection.
//!
//! [`EvidenceLog`] is the bounded, newest-first, deduplicated record list.
//! [`EvidenceCollector`] builds a record for a confirmed violation, taking a
//! snapshot from the frame source when no explicit payload is supplied, and
//! appends it only once it is complete.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use proctor_types::{ConditionType, EvidenceKind, EvidencePayload, EvidenceRecord};
use tracing::{debug, warn};

use crate::config::EvidenceConfig;
use crate::sources::FrameSource;

/// Rolling evidence log, newest first.
#[derive(Debug, Clone)]
pub struct EvidenceLog {
    records: VecDeque<EvidenceRecord>,
    max_records: usize,
}

impl EvidenceLog {
    pub fn new(max_records: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(max_records),
            max_records,
        }
    }

    /// Whether a capture of `(kind, description)` would duplicate the
    /// newest record.
    pub fn is_duplicate(&self, kind: EvidenceKind, description: &str) -> bool {
        self.records
            .front()
            .map(|newest| newest.same_capture(kind, description))
            .unwrap_or(false)
    }

    /// Insert at the front and drop the oldest past capacity. Returns
    /// `false` for a duplicate of the newest record.
    pub fn push(&mut self, record: EvidenceRecord) -> bool {
        if self.is_duplicate(record.kind, &record.description) {
            return false;
        }

        self.records.push_front(record);
        self.records.truncate(self.max_records);
        true
    }

    pub fn newest(&self) -> Option<&EvidenceRecord> {
        self.records.front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn max_records(&self) -> usize {
        self.max_records
    }

    /// Copy of the log, newest first.
    pub fn to_vec(&self) -> Vec<EvidenceRecord> {
        self.records.iter().cloned().collect()
    }
}

/// Captures evidence for confirmed violations.
pub struct EvidenceCollector {
    frames: Arc<dyn FrameSource>,
    snapshot_quality: f32,
    log: EvidenceLog,
}

impl EvidenceCollector {
    pub fn new(frames: Arc<dyn FrameSource>, config: &EvidenceConfig) -> Self {
        Self {
            frames,
            snapshot_quality: config.snapshot_quality,
            log: EvidenceLog::new(config.max_records),
        }
    }

    pub fn log(&self) -> &EvidenceLog {
        &self.log
    }

    /// Capture and append evidence for a confirmed `condition`.
    ///
    /// Returns the appended record, or `None` when it duplicated the newest
    /// one. Snapshot failures store a record without payload.
    pub async fn capture(
        &mut self,
        kind: EvidenceKind,
        condition: ConditionType,
        description: String,
        explicit: Option<EvidencePayload>,
        score_at_capture: u32,
        now: DateTime<Utc>,
    ) -> Option<EvidenceRecord> {
        if self.log.is_duplicate(kind, &description) {
            debug!(kind = %kind, description = %description, "Skipping duplicate evidence");
            return None;
        }

        let payload = match explicit {
            Some(payload) => Some(payload),
            None => self.snapshot(kind).await,
        };

        let record = EvidenceRecord {
            kind,
            condition,
            timestamp: now,
            description,
            payload,
            score_at_capture,
        };

        self.log.push(record.clone());
        Some(record)
    }

    async fn snapshot(&self, kind: EvidenceKind) -> Option<EvidencePayload> {
        match self.frames.capture_snapshot(self.snapshot_quality).await {
            Ok(Some(snapshot)) => Some(EvidencePayload::Snapshot(snapshot)),
            Ok(None) => {
                warn!(kind = %kind, "No frame available for evidence snapshot");
                None
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "Evidence snapshot failed");
                None
            }
        }
    }
}
