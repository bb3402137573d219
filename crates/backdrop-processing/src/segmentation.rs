//! Foreground/background segmentation
//!
//! Product shots arrive on a roughly uniform background. The background is
//! taken to be every region that is close in color to the image corners AND
//! connected to the image border; enclosed regions of similar color (a label
//! on the product, a hole in a handle) stay foreground.

use image::{GrayImage, Luma, RgbaImage};
use imageproc::region_labelling::{connected_components, Connectivity};
use std::collections::HashSet;

/// Maximum squared RGB distance from the corner reference color for a pixel
/// to count as background.
const BACKGROUND_DISTANCE_SQ: u32 = 48 * 48;

/// Make the background of `img` transparent, in place semantics: returns a
/// new raster with alpha 0 on border-connected background pixels.
pub fn remove_background(img: &RgbaImage) -> RgbaImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let reference = corner_reference_color(img);

    // Binary mask: 255 where the pixel is background-colored.
    let mut mask = GrayImage::new(width, height);
    for (x, y, pixel) in img.enumerate_pixels() {
        let close = color_distance_sq(&[pixel[0], pixel[1], pixel[2]], &reference)
            <= BACKGROUND_DISTANCE_SQ;
        mask.put_pixel(x, y, Luma([if close { 255u8 } else { 0 }]));
    }

    // Label connected background-colored regions; only those touching the
    // border are real background.
    let labels = connected_components(&mask, Connectivity::Four, Luma([0u8]));

    let mut border_labels: HashSet<u32> = HashSet::new();
    for x in 0..width {
        for y in [0, height - 1] {
            let label = labels.get_pixel(x, y)[0];
            if label != 0 {
                border_labels.insert(label);
            }
        }
    }
    for y in 0..height {
        for x in [0, width - 1] {
            let label = labels.get_pixel(x, y)[0];
            if label != 0 {
                border_labels.insert(label);
            }
        }
    }

    let mut out = img.clone();
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let label = labels.get_pixel(x, y)[0];
        if label != 0 && border_labels.contains(&label) {
            pixel[3] = 0;
        }
    }
    out
}

/// Average of the four corner pixels, the best available sample of the
/// original background.
fn corner_reference_color(img: &RgbaImage) -> [u8; 3] {
    let (width, height) = img.dimensions();
    let corners = [
        img.get_pixel(0, 0),
        img.get_pixel(width - 1, 0),
        img.get_pixel(0, height - 1),
        img.get_pixel(width - 1, height - 1),
    ];

    let mut sums = [0u32; 3];
    for corner in corners {
        for channel in 0..3 {
            sums[channel] += corner[channel] as u32;
        }
    }
    [
        (sums[0] / 4) as u8,
        (sums[1] / 4) as u8,
        (sums[2] / 4) as u8,
    ]
}

fn color_distance_sq(a: &[u8; 3], b: &[u8; 3]) -> u32 {
    let dr = a[0] as i32 - b[0] as i32;
    let dg = a[1] as i32 - b[1] as i32;
    let db = a[2] as i32 - b[2] as i32;
    (dr * dr + dg * dg + db * db) as u32
}
