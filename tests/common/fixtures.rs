use std::sync::Mutex;

use coincount::{CoinError, Detection, DetectionModel, LabelVocabulary};
use image::{DynamicImage, ImageBuffer, Rgb};
use tempfile::NamedTempFile;

/// Vocabulary used by the fake model: the five coins plus a background class.
pub const TEST_LABELS: [&str; 6] = ["one", "two", "five", "ten", "twenty", "background"];

pub const ONE: usize = 0;
pub const TWO: usize = 1;
pub const FIVE: usize = 2;
pub const TEN: usize = 3;
pub const TWENTY: usize = 4;
pub const BACKGROUND: usize = 5;

pub fn test_labels() -> LabelVocabulary {
    LabelVocabulary::new(TEST_LABELS)
}

pub fn det(class_id: usize, confidence: f32) -> Detection {
    Detection::new(class_id, confidence)
}

/// What the fake model does when asked to predict.
pub enum Script {
    Detections(Vec<Detection>),
    Fail(String),
}

/// Detection model returning scripted output and recording every call.
pub struct FakeModel {
    labels: LabelVocabulary,
    script: Script,
    calls: Mutex<Vec<f32>>,
}

impl FakeModel {
    pub fn returning(detections: Vec<Detection>) -> Self {
        Self {
            labels: test_labels(),
            script: Script::Detections(detections),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            labels: test_labels(),
            script: Script::Fail(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Thresholds passed to `predict`, one entry per call.
    pub fn calls(&self) -> Vec<f32> {
        self.calls.lock().unwrap().clone()
    }
}

impl DetectionModel for FakeModel {
    fn predict(
        &self,
        _image: &DynamicImage,
        confidence_threshold: f32,
    ) -> coincount::Result<Vec<Detection>> {
        self.calls.lock().unwrap().push(confidence_threshold);
        match &self.script {
            Script::Detections(detections) => Ok(detections.clone()),
            Script::Fail(message) => Err(CoinError::Inference(message.clone())),
        }
    }

    fn labels(&self) -> &LabelVocabulary {
        &self.labels
    }
}

/// A small solid-color image; the fake model never looks at pixels.
pub fn test_image() -> DynamicImage {
    DynamicImage::ImageRgb8(ImageBuffer::from_fn(32, 24, |_, _| Rgb([200u8, 160u8, 40u8])))
}

/// PNG bytes of [`test_image`].
pub fn test_png_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    test_image()
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

/// Writes `contents` to a temp `.json` file that is removed on drop.
pub fn write_config(contents: &str) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("Failed to create temp config file");
    std::fs::write(file.path(), contents).expect("Failed to write config");
    file
}
