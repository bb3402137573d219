//! High-fidelity processor: segmentation plus backdrop compositing.

use std::io::Cursor;

use image::{ImageFormat, ImageReader, Rgba, RgbaImage};
use thiserror::Error;

use crate::segmentation::remove_background;

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Failed to decode input image: {0}")]
    Decode(String),

    #[error("Failed to encode output image: {0}")]
    Encode(String),
}

/// Opaque solid backdrop color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackdropColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BackdropColor {
    pub const WHITE: BackdropColor = BackdropColor {
        r: 255,
        g: 255,
        b: 255,
    };
}

impl From<(u8, u8, u8)> for BackdropColor {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

/// Deterministic local image processor.
///
/// Normalizes the input to RGBA, cuts out the foreground, and flattens the
/// cutout onto the configured backdrop. Output is always PNG.
pub struct HighFidelityProcessor {
    backdrop: BackdropColor,
}

impl HighFidelityProcessor {
    pub fn new(backdrop: BackdropColor) -> Self {
        Self { backdrop }
    }

    pub fn process(&self, data: &[u8]) -> Result<Vec<u8>, ProcessingError> {
        let img = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?
            .to_rgba8();

        let cutout = remove_background(&img);
        let flattened = self.composite(&cutout);

        let mut buffer = Vec::new();
        flattened
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| ProcessingError::Encode(e.to_string()))?;

        tracing::debug!(
            width = flattened.width(),
            height = flattened.height(),
            output_bytes = buffer.len(),
            "High-fidelity processing complete"
        );

        Ok(buffer)
    }

    /// Alpha-blend `img` over the opaque backdrop, flattening all
    /// transparency away.
    fn composite(&self, img: &RgbaImage) -> RgbaImage {
        let backdrop = [self.backdrop.r, self.backdrop.g, self.backdrop.b];
        let mut out = RgbaImage::new(img.width(), img.height());

        for (x, y, pixel) in img.enumerate_pixels() {
            let alpha = pixel[3] as u32;
            let mut blended = [0u8; 4];
            for channel in 0..3 {
                let src = pixel[channel] as u32;
                let bg = backdrop[channel] as u32;
                blended[channel] = ((src * alpha + bg * (255 - alpha) + 127) / 255) as u8;
            }
            blended[3] = 255;
            out.put_pixel(x, y, Rgba(blended));
        }
        out
    }
}
