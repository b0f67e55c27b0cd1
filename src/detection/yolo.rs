use std::collections::HashMap;

use image::DynamicImage;
use rten::Model;
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;
use tracing::{debug, info};

use crate::config::CoinConfig;
use crate::detection::DetectionModel;
use crate::detection::preprocessing::{Letterbox, letterbox};
use crate::error::{CoinError, Result};
use crate::models::{BoundingBox, Detection, LabelVocabulary};

/// YOLOv8-style coin detector running on `rten`.
pub struct YoloModel {
    model: Model,
    labels: LabelVocabulary,
    input_size: u32,
    iou_thresh: f32,
    max_detections: usize,
}

impl YoloModel {
    /// Load the model named by `config.model_path`. Fails fast when the file
    /// is missing so a server never starts without a detector.
    pub fn load(config: &CoinConfig) -> Result<Self> {
        let path = &config.model_path;
        if !path.exists() {
            return Err(CoinError::ModelNotFound(path.clone()));
        }

        let model = Model::load_file(path)
            .map_err(|e| CoinError::ModelLoad(format!("{}: {}", path.display(), e)))?;

        info!(
            path = %path.display(),
            classes = config.labels.len(),
            input_size = config.input_size,
            "detection model loaded"
        );

        Ok(Self {
            model,
            labels: config.labels.clone(),
            input_size: config.input_size,
            iou_thresh: config.iou_thresh,
            max_detections: config.max_detections,
        })
    }
}

impl DetectionModel for YoloModel {
    fn predict(&self, image: &DynamicImage, confidence_threshold: f32) -> Result<Vec<Detection>> {
        let size = self.input_size as usize;
        let (data, geometry) = letterbox(image, self.input_size);
        let input = NdTensor::from_data([1, 3, size, size], data);

        let output = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| CoinError::Inference(e.to_string()))?;
        let output: NdTensor<f32, 3> = output
            .try_into()
            .map_err(|e| CoinError::Inference(format!("unexpected model output: {:?}", e)))?;

        let [batch, channels, anchors] = output.shape();
        if batch != 1 {
            return Err(CoinError::Inference(format!(
                "expected batch of 1, model returned {}",
                batch
            )));
        }

        let values = output.to_vec();
        let candidates = decode_output(&values, channels, anchors, confidence_threshold, &geometry)?;
        let raw = candidates.len();
        let kept = nms(candidates, self.iou_thresh, self.max_detections);
        debug!(raw, kept = kept.len(), "decoded detections");

        Ok(kept)
    }

    fn labels(&self) -> &LabelVocabulary {
        &self.labels
    }
}

/// Decode a `[4 + classes, anchors]` prediction grid (row-major) into
/// detections in source-image coordinates.
///
/// Each anchor keeps only its best-scoring class, and only when that score is
/// strictly above `confidence_threshold`.
pub fn decode_output(
    values: &[f32],
    channels: usize,
    anchors: usize,
    confidence_threshold: f32,
    geometry: &Letterbox,
) -> Result<Vec<Detection>> {
    if channels < 5 {
        return Err(CoinError::Inference(format!(
            "model output needs at least 5 channels (box + 1 class), got {}",
            channels
        )));
    }
    if values.len() != channels * anchors {
        return Err(CoinError::Inference(format!(
            "model output has {} values, expected {}x{}",
            values.len(),
            channels,
            anchors
        )));
    }

    let at = |c: usize, i: usize| values[c * anchors + i];
    let mut detections = Vec::new();

    for i in 0..anchors {
        let mut best_class = 0;
        let mut best_score = f32::MIN;
        for class_id in 0..channels - 4 {
            let score = at(4 + class_id, i);
            if score > best_score {
                best_score = score;
                best_class = class_id;
            }
        }

        if !(best_score > confidence_threshold) {
            continue;
        }

        let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
        let (x1, y1) = geometry.map_to_source(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = geometry.map_to_source(cx + w / 2.0, cy + h / 2.0);

        detections.push(
            Detection::new(best_class, best_score).with_bbox(BoundingBox::new(x1, y1, x2, y2)),
        );
    }

    Ok(detections)
}

/// Class-aware non-maximum suppression.
///
/// Returns survivors sorted by descending confidence, capped at
/// `max_detections`.
pub fn nms(detections: Vec<Detection>, iou_thresh: f32, max_detections: usize) -> Vec<Detection> {
    let mut by_class: HashMap<usize, Vec<Detection>> = HashMap::new();
    for detection in detections {
        by_class.entry(detection.class_id).or_default().push(detection);
    }

    let mut kept = Vec::new();
    for (_, mut group) in by_class {
        group.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut suppressed = vec![false; group.len()];
        for i in 0..group.len() {
            if suppressed[i] {
                continue;
            }
            for j in (i + 1)..group.len() {
                if suppressed[j] {
                    continue;
                }
                if let (Some(a), Some(b)) = (&group[i].bbox, &group[j].bbox) {
                    if a.iou(b) > iou_thresh {
                        suppressed[j] = true;
                    }
                }
            }
        }

        kept.extend(
            group
                .into_iter()
                .zip(suppressed)
                .filter(|(_, suppressed)| !suppressed)
                .map(|(detection, _)| detection),
        );
    }

    // Ties break on class id so the order never depends on hash iteration.
    kept.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(a.class_id.cmp(&b.class_id))
    });
    kept.truncate(max_detections);
    kept
}
