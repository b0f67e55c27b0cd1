use crate::detection::filter::ConfidenceFilter;
use crate::models::{AggregationResult, Detection};

/// Folds detections into labels and a running total.
#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    filter: ConfidenceFilter<'a>,
}

impl<'a> Aggregator<'a> {
    pub fn new(filter: ConfidenceFilter<'a>) -> Self {
        Self { filter }
    }

    /// Detections are taken in the order given; duplicates are kept.
    pub fn aggregate(&self, detections: &[Detection]) -> AggregationResult {
        let mut result = AggregationResult::new();

        for detection in detections {
            if let Some((label, value)) = self.filter.resolve(detection) {
                result.push(label, value);
            }
        }

        result
    }
}
