#![allow(dead_code, unused_imports)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from coincount for tests
pub use coincount::{
    AggregationResult, Aggregator, Amount, CoinConfig, CoinError, CoinPipeline, CoinReport,
    ConfidenceFilter, DenominationTable, Detection, DetectionModel, LabelVocabulary, MIN_THRESH,
    decode_image,
};
