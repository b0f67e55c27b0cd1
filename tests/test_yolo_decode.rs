//! Tests for detector output decoding, NMS and letterbox geometry.

use coincount::detection::preprocessing::{Letterbox, letterbox};
use coincount::detection::yolo::{decode_output, nms};
use coincount::{BoundingBox, CoinError, Detection};
use image::{DynamicImage, ImageBuffer, Rgb};

/// Build a row-major `[4 + classes, anchors]` grid from per-anchor rows of
/// `[cx, cy, w, h, score_0, score_1, ...]`.
fn grid(rows: &[Vec<f32>]) -> (Vec<f32>, usize, usize) {
    let channels = rows[0].len();
    let anchors = rows.len();
    let mut values = vec![0.0; channels * anchors];
    for (i, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            values[c * anchors + i] = *value;
        }
    }
    (values, channels, anchors)
}

fn boxed(class_id: usize, confidence: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
    Detection::new(class_id, confidence).with_bbox(BoundingBox::new(x1, y1, x2, y2))
}

#[test]
fn test_letterbox_geometry() {
    let wide = Letterbox::fit(1280, 640, 640);
    assert_eq!(wide.scale, 0.5);
    assert_eq!((wide.resized_width, wide.resized_height), (640, 320));
    assert_eq!((wide.pad_x, wide.pad_y), (0, 160));

    // Centre of the padded input maps to the centre of the source image.
    assert_eq!(wide.map_to_source(320.0, 320.0), (640.0, 320.0));
    // Points in the padding clamp to the image edge.
    assert_eq!(wide.map_to_source(0.0, 0.0), (0.0, 0.0));
    assert_eq!(wide.map_to_source(640.0, 640.0), (1280.0, 640.0));
}

#[test]
fn test_letterbox_tensor_layout() {
    let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(20, 10, Rgb([255u8, 0, 0])));
    let (data, geometry) = letterbox(&img, 8);

    assert_eq!(data.len(), 3 * 8 * 8);
    assert_eq!((geometry.pad_x, geometry.pad_y), (0, 2));

    let plane = 64;
    // Top-left pixel is padding gray in every channel.
    for c in 0..3 {
        assert!((data[c * plane] - 114.0 / 255.0).abs() < 1e-6);
    }
    // A pixel in the middle is the source red.
    let centre = 4 * 8 + 4;
    assert!((data[centre] - 1.0).abs() < 0.01);
    assert!(data[plane + centre].abs() < 0.01);
    assert!(data[2 * plane + centre].abs() < 0.01);
}

#[test]
fn test_decode_picks_best_class_above_threshold() -> anyhow::Result<()> {
    let geometry = Letterbox::fit(640, 640, 640);
    let (values, channels, anchors) = grid(&[
        vec![100.0, 100.0, 20.0, 20.0, 0.1, 0.8, 0.3],
        vec![300.0, 300.0, 40.0, 40.0, 0.5, 0.2, 0.1],
        vec![500.0, 200.0, 10.0, 30.0, 0.05, 0.1, 0.95],
    ]);

    let detections = decode_output(&values, channels, anchors, 0.5, &geometry)?;

    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].class_id, 1);
    assert_eq!(detections[0].confidence, 0.8);
    assert_eq!(
        detections[0].bbox,
        Some(BoundingBox::new(90.0, 90.0, 110.0, 110.0))
    );
    assert_eq!(detections[1].class_id, 2);
    assert_eq!(
        detections[1].bbox,
        Some(BoundingBox::new(495.0, 185.0, 505.0, 215.0))
    );
    Ok(())
}

#[test]
fn test_decode_maps_back_through_letterbox() -> anyhow::Result<()> {
    let geometry = Letterbox::fit(1280, 640, 640);
    let (values, channels, anchors) = grid(&[vec![320.0, 320.0, 64.0, 32.0, 0.9]]);

    let detections = decode_output(&values, channels, anchors, 0.5, &geometry)?;

    assert_eq!(
        detections[0].bbox,
        Some(BoundingBox::new(576.0, 288.0, 704.0, 352.0))
    );
    Ok(())
}

#[test]
fn test_decode_rejects_malformed_output() {
    let geometry = Letterbox::fit(640, 640, 640);

    let too_few_channels = decode_output(&[0.0; 8], 4, 2, 0.5, &geometry);
    assert!(matches!(too_few_channels, Err(CoinError::Inference(_))));

    let wrong_length = decode_output(&[0.0; 9], 5, 2, 0.5, &geometry);
    assert!(matches!(wrong_length, Err(CoinError::Inference(_))));
}

#[test]
fn test_nms_suppresses_overlaps_within_class() {
    let detections = vec![
        boxed(0, 0.7, 0.0, 0.0, 10.0, 10.0),
        boxed(0, 0.9, 1.0, 1.0, 11.0, 11.0),
        boxed(0, 0.6, 50.0, 50.0, 60.0, 60.0),
        // Same place, different class: kept.
        boxed(1, 0.8, 0.0, 0.0, 10.0, 10.0),
    ];

    let kept = nms(detections, 0.5, 300);

    let summary: Vec<(usize, f32)> = kept.iter().map(|d| (d.class_id, d.confidence)).collect();
    assert_eq!(summary, vec![(0, 0.9), (1, 0.8), (0, 0.6)]);
}

#[test]
fn test_nms_caps_detections() {
    let detections: Vec<Detection> = (0..10)
        .map(|i| {
            let x = i as f32 * 100.0;
            boxed(0, 0.5 + i as f32 * 0.01, x, 0.0, x + 10.0, 10.0)
        })
        .collect();

    let kept = nms(detections, 0.7, 3);

    assert_eq!(kept.len(), 3);
    assert!(kept[0].confidence > kept[1].confidence);
    assert!(kept[1].confidence > kept[2].confidence);
}

#[test]
fn test_iou() {
    let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    let b = BoundingBox::new(5.0, 0.0, 15.0, 10.0);
    let c = BoundingBox::new(20.0, 20.0, 30.0, 30.0);

    assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
    assert_eq!(a.iou(&c), 0.0);
    assert_eq!(a.iou(&a), 1.0);
}
