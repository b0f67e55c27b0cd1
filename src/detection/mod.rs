pub mod aggregate;
pub mod filter;
pub mod preprocessing;
pub mod yolo;

use std::sync::Arc;

use image::DynamicImage;
use tracing::info;

use crate::config::CoinConfig;
use crate::error::{CoinError, Result};
use crate::models::{AggregationResult, Detection, LabelVocabulary};

pub use aggregate::Aggregator;
pub use filter::ConfidenceFilter;
pub use yolo::YoloModel;

/// An object detector the pipeline can query.
pub trait DetectionModel: Send + Sync {
    /// Detect objects scoring above `confidence_threshold`, in the model's
    /// own output order.
    fn predict(&self, image: &DynamicImage, confidence_threshold: f32) -> Result<Vec<Detection>>;

    /// Class id to label mapping for this model's outputs.
    fn labels(&self) -> &LabelVocabulary;
}

/// Decode an uploaded or on-disk image from its raw bytes.
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(data).map_err(|e| CoinError::ImageDecode(e.to_string()))
}

/// Counts and values the coins in one image.
#[derive(Debug, Clone)]
pub struct CoinPipeline {
    config: Arc<CoinConfig>,
}

impl CoinPipeline {
    pub fn new(config: Arc<CoinConfig>) -> Self {
        Self { config }
    }

    /// Run one inference and aggregate its detections.
    ///
    /// Model failures are returned as-is; there is no retry and no partial
    /// result.
    pub fn run(&self, image: &DynamicImage, model: &dyn DetectionModel) -> Result<AggregationResult> {
        let threshold = self.config.min_thresh;
        let detections = model.predict(image, threshold)?;

        let filter = ConfidenceFilter::new(threshold, model.labels(), &self.config.denominations);
        let result = Aggregator::new(filter).aggregate(&detections);

        info!(
            raw = detections.len(),
            count = result.count(),
            total = %result.total_value(),
            "coins aggregated"
        );

        Ok(result)
    }
}
