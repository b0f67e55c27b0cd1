use serde::{Deserialize, Serialize};

use crate::denomination::Amount;

/// Axis-aligned box in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection-over-union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;

        if union <= 0.0 { 0.0 } else { intersection / union }
    }
}

/// One raw output of the detection model.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: Option<BoundingBox>,
}

impl Detection {
    pub fn new(class_id: usize, confidence: f32) -> Self {
        Self {
            class_id,
            confidence,
            bbox: None,
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }
}

/// Class id to label mapping owned by the detection model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelVocabulary {
    labels: Vec<String>,
}

impl LabelVocabulary {
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Label for `class_id`, or `None` if the id is outside the vocabulary.
    pub fn label(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Coins found in one image.
///
/// The count is derived from the label sequence, so it can never disagree
/// with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationResult {
    detected_labels: Vec<String>,
    total_value: Amount,
}

impl AggregationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one valued coin.
    pub(crate) fn push(&mut self, label: &str, value: Amount) {
        self.detected_labels.push(label.to_string());
        self.total_value += value;
    }

    pub fn detected_labels(&self) -> &[String] {
        &self.detected_labels
    }

    pub fn count(&self) -> usize {
        self.detected_labels.len()
    }

    pub fn total_value(&self) -> Amount {
        self.total_value
    }

    /// Two-decimal rendering for the response boundary.
    pub fn total_value_formatted(&self) -> String {
        self.total_value.to_string()
    }

    pub fn to_report(&self) -> CoinReport {
        CoinReport::from(self)
    }
}

/// Response body returned to API and CLI callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinReport {
    pub coins_detected: Vec<String>,
    pub count: usize,
    pub total_value_inr: String,
}

impl From<&AggregationResult> for CoinReport {
    fn from(result: &AggregationResult) -> Self {
        Self {
            coins_detected: result.detected_labels().to_vec(),
            count: result.count(),
            total_value_inr: result.total_value_formatted(),
        }
    }
}
