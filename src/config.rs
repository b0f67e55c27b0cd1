use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::denomination::{COIN_LABELS, DenominationTable, MAX_COIN_VALUE};
use crate::error::{CoinError, Result};
use crate::models::LabelVocabulary;

/// Minimum confidence for a coin to be counted. Detections scoring exactly
/// this value are rejected.
pub const MIN_THRESH: f32 = 0.50;

pub const DEFAULT_IOU_THRESH: f32 = 0.70;
pub const DEFAULT_INPUT_SIZE: u32 = 640;
pub const DEFAULT_MAX_DETECTIONS: usize = 300;
pub const DEFAULT_MODEL_PATH: &str = "my_model.rten";

/// Process-wide settings, loaded once at startup and never mutated.
///
/// `min_thresh` is handed to the model as its own cutoff *and* re-checked by
/// the confidence filter. Both read this one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinConfig {
    pub min_thresh: f32,
    pub iou_thresh: f32,
    pub input_size: u32,
    pub max_detections: usize,
    pub model_path: PathBuf,
    pub labels: LabelVocabulary,
    pub denominations: DenominationTable,
}

impl Default for CoinConfig {
    fn default() -> Self {
        Self {
            min_thresh: MIN_THRESH,
            iou_thresh: DEFAULT_IOU_THRESH,
            input_size: DEFAULT_INPUT_SIZE,
            max_detections: DEFAULT_MAX_DETECTIONS,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            // Class ids follow the alphabetical order of the training folders.
            labels: LabelVocabulary::new(["five", "one", "ten", "twenty", "two"]),
            denominations: DenominationTable::default(),
        }
    }
}

impl CoinConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config: CoinConfig = serde_json::from_str(&data)?;
        Ok(config)
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_min_thresh(mut self, min_thresh: f32) -> Self {
        self.min_thresh = min_thresh;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_thresh) {
            return Err(CoinError::Config(format!(
                "min_thresh must be within [0, 1], got {}",
                self.min_thresh
            )));
        }
        if !(0.0..=1.0).contains(&self.iou_thresh) {
            return Err(CoinError::Config(format!(
                "iou_thresh must be within [0, 1], got {}",
                self.iou_thresh
            )));
        }
        if self.input_size == 0 {
            return Err(CoinError::Config("input_size must be positive".into()));
        }
        if self.max_detections == 0 {
            return Err(CoinError::Config("max_detections must be positive".into()));
        }
        if self.labels.is_empty() {
            return Err(CoinError::Config("labels must not be empty".into()));
        }
        if self.denominations.is_empty() {
            return Err(CoinError::Config("denominations must not be empty".into()));
        }
        for (label, value) in self.denominations.entries() {
            if !COIN_LABELS.contains(&label) {
                return Err(CoinError::Config(format!(
                    "'{}' is not a coin; denominations must be among {:?}",
                    label, COIN_LABELS
                )));
            }
            if value > MAX_COIN_VALUE {
                return Err(CoinError::Config(format!(
                    "value {} for '{}' exceeds the maximum {}",
                    value, label, MAX_COIN_VALUE
                )));
            }
        }
        Ok(())
    }
}
