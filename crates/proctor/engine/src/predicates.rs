//! Condition predicates.
//!
//! Policy, not perception: given what the detectors reported for one tick,
//! decide which conditions are currently bad. The result feeds both the
//! undebounced [`ProctorStatus`] and the per-condition debouncers.

use proctor_types::{ConditionType, ProctorStatus};

use crate::config::{PredicateConfig, SpeechConfig};
use crate::sources::{FaceLandmarks, FaceObservation, SpeechReading};

/// Which conditions are bad in one tick, with the context needed to
/// describe them.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionReadings {
    pub face_missing: bool,
    pub not_focus: bool,
    pub multiple_people: bool,
    pub noise: bool,

    /// Faces in the analysed frame.
    pub person_count: usize,

    /// Raw quiet flag from the speech detector.
    pub is_quiet: bool,

    /// Transcript behind a `noise` reading.
    pub transcript: String,
}

impl ConditionReadings {
    pub fn is_bad(&self, condition: ConditionType) -> bool {
        match condition {
            ConditionType::FaceMissing => self.face_missing,
            ConditionType::NotFocus => self.not_focus,
            ConditionType::MultiplePeople => self.multiple_people,
            ConditionType::Noise => self.noise,
        }
    }

    /// Conditions bad in this tick, in evaluation order.
    pub fn bad_conditions(&self) -> Vec<ConditionType> {
        ConditionType::ALL
            .into_iter()
            .filter(|condition| self.is_bad(*condition))
            .collect()
    }

    /// Instantaneous status for display.
    pub fn status(&self) -> ProctorStatus {
        ProctorStatus {
            face_detected: !self.face_missing,
            looking_center: !self.not_focus,
            single_person: !self.multiple_people,
            is_quiet: self.is_quiet,
            person_count: self.person_count,
        }
    }

    /// Evidence description for a confirmed condition.
    pub fn describe(&self, condition: ConditionType) -> String {
        match condition {
            ConditionType::FaceMissing => "Face not detected".to_string(),
            ConditionType::NotFocus => "Not focused / looking away".to_string(),
            ConditionType::MultiplePeople => format!("{} people detected", self.person_count),
            ConditionType::Noise => format!("Speech detected: \"{}\"", self.transcript),
        }
    }
}

/// Evaluates the bad-condition predicates.
#[derive(Debug, Clone)]
pub struct ConditionPredicates {
    gaze_min_ratio: f64,
    gaze_max_ratio: f64,
    min_words: usize,
}

impl ConditionPredicates {
    pub fn new(predicates: &PredicateConfig, speech: &SpeechConfig) -> Self {
        Self {
            gaze_min_ratio: predicates.gaze_min_ratio,
            gaze_max_ratio: predicates.gaze_max_ratio,
            min_words: speech.min_words,
        }
    }

    /// Evaluate every predicate against one tick's detector output.
    pub fn evaluate(&self, faces: &[FaceObservation], speech: &SpeechReading) -> ConditionReadings {
        let person_count = faces.len();

        // Gaze is judged on the first face only
        let looking_center = faces
            .first()
            .and_then(|face| face.landmarks.as_ref())
            .map(|landmarks| self.is_looking_center(landmarks))
            .unwrap_or(true);

        let noise =
            !speech.is_quiet && word_count(&speech.last_utterance_text) >= self.min_words;

        ConditionReadings {
            face_missing: person_count == 0,
            not_focus: !looking_center,
            multiple_people: person_count > 1,
            noise,
            person_count,
            is_quiet: speech.is_quiet,
            transcript: speech.last_utterance_text.clone(),
        }
    }

    /// Whether the nose-to-eye ratio sits inside the tolerance band.
    pub fn is_looking_center(&self, landmarks: &FaceLandmarks) -> bool {
        match gaze_ratio(landmarks) {
            Some(ratio) => ratio >= self.gaze_min_ratio && ratio <= self.gaze_max_ratio,
            None => true,
        }
    }
}

/// Ratio of horizontal nose-to-left-eye over nose-to-right-eye distance.
///
/// Close to 1.0 for a frontal face. `None` when both distances are zero
/// (collapsed landmarks), which carries no gaze information. A zero right
/// distance alone yields infinity.
pub fn gaze_ratio(landmarks: &FaceLandmarks) -> Option<f64> {
    let dist_left = (landmarks.nose.x - landmarks.left_eye.x).abs();
    let dist_right = (landmarks.nose.x - landmarks.right_eye.x).abs();

    if dist_left == 0.0 && dist_right == 0.0 {
        return None;
    }

    Some(dist_left / dist_right)
}

/// Whitespace-separated word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{BoundingBox, Point};

    fn predicates() -> ConditionPredicates {
        ConditionPredicates::new(&PredicateConfig::default(), &SpeechConfig::default())
    }

    fn face(nose_x: f64) -> FaceObservation {
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

    #[test]
    fn test_no_faces_is_face_missing_only() {
        let readings = predicates().evaluate(&[], &SpeechReading::quiet());

        assert!(readings.face_missing);
        assert!(!readings.not_focus);
        assert!(!readings.multiple_people);
        assert_eq!(readings.bad_conditions(), vec![ConditionType::FaceMissing]);
        assert!(!readings.status().face_detected);
    }

    #[test]
    fn test_two_faces_is_multiple_people() {
        let readings = predicates().evaluate(&[face(50.0), face(50.0)], &SpeechReading::quiet());

        assert!(readings.multiple_people);
        assert!(!readings.face_missing);
        assert_eq!(readings.person_count, 2);
        assert_eq!(
            readings.describe(ConditionType::MultiplePeople),
            "2 people detected"
        );
    }

    #[test]
    fn test_gaze_band() {
        let p = predicates();

        // Centred: 30 / 30
        assert!(!p.evaluate(&[face(50.0)], &SpeechReading::quiet()).not_focus);
        // Turned: 5 / 55 = 0.09
        assert!(p.evaluate(&[face(25.0)], &SpeechReading::quiet()).not_focus);
        // Turned the other way: 55 / 5 = 11
        assert!(p.evaluate(&[face(75.0)], &SpeechReading::quiet()).not_focus);
        // Inside the upper bound: 42 / 18 = 2.33
        assert!(!p.evaluate(&[face(62.0)], &SpeechReading::quiet()).not_focus);
        // Just past it: 44 / 16 = 2.75
        assert!(p.evaluate(&[face(64.0)], &SpeechReading::quiet()).not_focus);
    }

    #[test]
    fn test_missing_landmarks_count_as_centred() {
        let mut observation = face(25.0);
        observation.landmarks = None;

        let readings = predicates().evaluate(&[observation], &SpeechReading::quiet());
        assert!(!readings.not_focus);
    }

    #[test]
    fn test_degenerate_landmarks() {
        let collapsed = FaceLandmarks {
            nose: Point::new(10.0, 0.0),
            left_eye: Point::new(10.0, 0.0),
            right_eye: Point::new(10.0, 0.0),
        };
        assert_eq!(gaze_ratio(&collapsed), None);
        assert!(predicates().is_looking_center(&collapsed));

        let right_on_nose = FaceLandmarks {
            right_eye: Point::new(10.0, 0.0),
            left_eye: Point::new(0.0, 0.0),
            ..collapsed
        };
        assert_eq!(gaze_ratio(&right_on_nose), Some(f64::INFINITY));
        assert!(!predicates().is_looking_center(&right_on_nose));
    }

    #[test]
    fn test_noise_requires_min_words() {
        let p = predicates();
        let one_word = SpeechReading {
            is_quiet: false,
            last_utterance_text: "hello".to_string(),
            last_utterance_at: None,
        };
        let two_words = SpeechReading {
            last_utterance_text: "the answer".to_string(),
            ..one_word.clone()
        };

        assert!(!p.evaluate(&[face(50.0)], &one_word).noise);

        let readings = p.evaluate(&[face(50.0)], &two_words);
        assert!(readings.noise);
        assert!(!readings.status().is_quiet);
        assert_eq!(
            readings.describe(ConditionType::Noise),
            "Speech detected: \"the answer\""
        );
    }

    #[test]
    fn test_quiet_flag_wins_over_stale_text() {
        let stale = SpeechReading {
            is_quiet: true,
            last_utterance_text: "what is the answer".to_string(),
            last_utterance_at: None,
        };

        assert!(!predicates().evaluate(&[face(50.0)], &stale).noise);
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("  two   words "), 2);
        assert_eq!(word_count(""), 0);
    }
}
