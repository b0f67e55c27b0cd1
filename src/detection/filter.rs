use tracing::debug;

use crate::denomination::{Amount, DenominationTable};
use crate::models::{Detection, LabelVocabulary};

/// Decides whether a single detection counts as a coin.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceFilter<'a> {
    min_thresh: f32,
    labels: &'a LabelVocabulary,
    denominations: &'a DenominationTable,
}

impl<'a> ConfidenceFilter<'a> {
    pub fn new(
        min_thresh: f32,
        labels: &'a LabelVocabulary,
        denominations: &'a DenominationTable,
    ) -> Self {
        Self {
            min_thresh,
            labels,
            denominations,
        }
    }

    pub fn min_thresh(&self) -> f32 {
        self.min_thresh
    }

    pub fn accept(&self, detection: &Detection) -> bool {
        self.resolve(detection).is_some()
    }

    /// Label and value of an accepted detection, `None` if it is rejected.
    ///
    /// Rejection is routine (low confidence, background classes, ids outside
    /// the vocabulary) and never an error.
    pub fn resolve(&self, detection: &Detection) -> Option<(&'a str, Amount)> {
        if !(detection.confidence > self.min_thresh) {
            debug!(
                class_id = detection.class_id,
                confidence = detection.confidence,
                "dropped: below threshold"
            );
            return None;
        }

        let Some(label) = self.labels.label(detection.class_id) else {
            debug!(class_id = detection.class_id, "dropped: unknown class id");
            return None;
        };

        match self.denominations.value_of(label) {
            Some(value) => Some((label, value)),
            None => {
                debug!(label, "dropped: not a coin");
                None
            }
        }
    }
}
