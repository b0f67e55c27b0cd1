use image::{DynamicImage, Rgb, RgbImage};

/// Gray used by the detector's training pipeline to pad letterboxed inputs.
const PAD_VALUE: u8 = 114;

/// Geometry of a letterbox transform, needed to map boxes back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub resized_width: u32,
    pub resized_height: u32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    /// Compute the transform that fits `width` x `height` into a square of
    /// `target_size` without changing its aspect ratio.
    pub fn fit(width: u32, height: u32, target_size: u32) -> Self {
        let scale = (target_size as f32 / width as f32).min(target_size as f32 / height as f32);
        let new_width = ((width as f32 * scale).round() as u32).clamp(1, target_size);
        let new_height = ((height as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            scale,
            pad_x: (target_size - new_width) / 2,
            pad_y: (target_size - new_height) / 2,
            resized_width: new_width,
            resized_height: new_height,
            source_width: width,
            source_height: height,
        }
    }

    /// Map a point from model-input space back to source-image pixels,
    /// clamped to the image.
    pub fn map_to_source(&self, x: f32, y: f32) -> (f32, f32) {
        let sx = (x - self.pad_x as f32) / self.scale;
        let sy = (y - self.pad_y as f32) / self.scale;
        (
            sx.clamp(0.0, self.source_width as f32),
            sy.clamp(0.0, self.source_height as f32),
        )
    }
}

/// Resize into a padded square and flatten to normalized NCHW floats.
pub fn letterbox(img: &DynamicImage, target_size: u32) -> (Vec<f32>, Letterbox) {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let geometry = Letterbox::fit(width, height, target_size);

    let resized = image::imageops::resize(
        &rgb,
        geometry.resized_width,
        geometry.resized_height,
        image::imageops::FilterType::Triangle,
    );

    let mut canvas = RgbImage::from_pixel(target_size, target_size, Rgb([PAD_VALUE; 3]));
    image::imageops::overlay(
        &mut canvas,
        &resized,
        geometry.pad_x.into(),
        geometry.pad_y.into(),
    );

    let plane = (target_size * target_size) as usize;
    let mut data = vec![0.0f32; 3 * plane];
    for (x, y, pixel) in canvas.enumerate_pixels() {
        let offset = (y * target_size + x) as usize;
        for c in 0..3 {
            data[c * plane + offset] = pixel[c] as f32 / 255.0;
        }
    }

    (data, geometry)
}
