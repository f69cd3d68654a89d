// THEORY:
// The `ColorDetector` is the perception layer. It answers one question per frame:
// "where are the pixels that have the color we are looking for?"
//
// It does so in two stateless steps:
// 1.  **Thresholding**: every pixel is converted to HSV and tested against the
//     configured `HsvRange`. The result is a binary mask (255 = in range, 0 = out),
//     the same shape as the frame, which callers can also display while tuning.
// 2.  **Grouping**: the mask is handed to `region::find_regions`, which outlines each
//     connected blob.
//
// The range is fixed when the detector is built; a new range means a new detector.

use image::{GrayImage, Luma};

use crate::core_modules::frame::Frame;
use crate::core_modules::hsv_range::HsvRange;
use crate::core_modules::region::{Region, find_regions};

const MASK_ON: u8 = 255;

/// Output of one detection pass.
#[derive(Debug, Clone)]
pub struct Detection {
    /// Binary mask of in-range pixels.
    pub mask: GrayImage,
    /// Candidate regions in discovery order.
    pub regions: Vec<Region>,
}

#[derive(Debug, Clone)]
pub struct ColorDetector {
    range: HsvRange,
}

impl ColorDetector {
    pub fn new(range: HsvRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> HsvRange {
        self.range
    }

    pub fn threshold(&self, frame: &Frame) -> GrayImage {
        let mut mask = GrayImage::new(frame.width(), frame.height());
        for (out, hsv) in mask.pixels_mut().zip(frame.hsv_pixels()) {
            if self.range.contains(hsv) {
                *out = Luma([MASK_ON]);
            }
        }
        mask
    }

    pub fn detect(&self, frame: &Frame) -> Detection {
        let mask = self.threshold(frame);
        let regions = find_regions(&mask);
        Detection { mask, regions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const GREEN: Rgb<u8> = Rgb([0, 200, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 200]);

    fn paint(image: &mut RgbImage, x0: u32, y0: u32, w: u32, h: u32, color: Rgb<u8>) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                image.put_pixel(x, y, color);
            }
        }
    }

    #[test]
    fn frame_outside_range_yields_no_regions() {
        let detector = ColorDetector::new(HsvRange::default());
        let mut image = RgbImage::from_pixel(80, 60, BLUE);
        paint(&mut image, 10, 10, 20, 20, Rgb([255, 255, 255]));

        let detection = detector.detect(&Frame::from(image));
        assert!(detection.regions.is_empty());
        assert!(detection.mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn green_patch_becomes_one_region() {
        let detector = ColorDetector::new(HsvRange::default());
        let mut image = RgbImage::from_pixel(80, 60, BLUE);
        paint(&mut image, 30, 20, 10, 10, GREEN);

        let detection = detector.detect(&Frame::from(image));
        assert_eq!(detection.regions.len(), 1);
        assert_eq!(detection.regions[0].area(), 81.0);
        assert_eq!(detection.mask.get_pixel(35, 25)[0], MASK_ON);
        assert_eq!(detection.mask.get_pixel(5, 5)[0], 0);
    }

    #[test]
    fn separate_patches_are_separate_regions() {
        let detector = ColorDetector::new(HsvRange::default());
        let mut image = RgbImage::new(100, 60);
        paint(&mut image, 5, 5, 10, 10, GREEN);
        paint(&mut image, 50, 30, 20, 20, GREEN);

        let detection = detector.detect(&Frame::from(image));
        assert_eq!(detection.regions.len(), 2);
    }

    #[test]
    fn dark_green_below_value_floor_is_ignored() {
        let detector = ColorDetector::new(HsvRange::default());
        let image = RgbImage::from_pixel(20, 20, Rgb([0, 40, 0]));
        assert!(detector.detect(&Frame::from(image)).regions.is_empty());
    }
}
