pub mod config;
pub mod denomination;
pub mod detection;
pub mod error;
pub mod models;
pub mod server;

pub use config::{CoinConfig, MIN_THRESH};
pub use denomination::{Amount, DenominationTable};
pub use detection::{
    Aggregator, CoinPipeline, ConfidenceFilter, DetectionModel, YoloModel, decode_image,
};
pub use error::{CoinError, Result};
pub use models::{AggregationResult, BoundingBox, CoinReport, Detection, LabelVocabulary};
