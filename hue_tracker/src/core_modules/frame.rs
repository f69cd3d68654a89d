// THEORY:
// The `Frame` module is the most fundamental unit of the tracker. A `Frame` is a
// "dumb" container for one camera image: a fixed-size, row-major pixel buffer plus
// the few facts needed to read it back (size, channel count, channel order).
//
// Key architectural principles:
// 1.  **Validated at the door**: a buffer whose length does not match its declared
//     size, or whose channel count is not 3 (RGB/BGR) or 4 (with alpha), never
//     becomes a `Frame`. Everything downstream can index without checks.
// 2.  **Single-pixel heuristics only**: the HSV conversion here looks at one pixel at
//     a time. Anything that needs neighbours (masks, regions) lives higher up.
// 3.  **8-bit HSV**: hue is stored as degrees / 2 so that it fits a byte (0..=179),
//     saturation and value use the full 0..=255 range. Thresholds are expressed in
//     the same units.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

use crate::core_modules::region::Point;
use crate::error::FrameError;

pub type Channel = u8;

/// Byte order of the color channels inside each pixel. A fourth (alpha) channel,
/// when present, is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

impl ChannelOrder {
    fn rgb(self, pixel: &[Channel]) -> [Channel; 3] {
        match self {
            ChannelOrder::Rgb => [pixel[0], pixel[1], pixel[2]],
            ChannelOrder::Bgr => [pixel[2], pixel[1], pixel[0]],
        }
    }
}

/// A pixel in 8-bit HSV space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvPixel {
    /// Hue in half-degrees (0..=179).
    pub hue: u8,
    /// Saturation (0..=255).
    pub saturation: u8,
    /// Value, the brightest channel (0..=255).
    pub value: u8,
}

impl HsvPixel {
    pub fn from_rgb(red: Channel, green: Channel, blue: Channel) -> Self {
        let r = red as f32;
        let g = green as f32;
        let b = blue as f32;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let chroma = max - min;

        let saturation = if max > 0.0 {
            (chroma * 255.0 / max).round()
        } else {
            0.0
        };

        let degrees = if chroma == 0.0 {
            0.0
        } else if max == r {
            60.0 * (g - b) / chroma
        } else if max == g {
            120.0 + 60.0 * (b - r) / chroma
        } else {
            240.0 + 60.0 * (r - g) / chroma
        };
        let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };

        let mut hue = (degrees / 2.0).round() as u16;
        if hue >= 180 {
            hue -= 180;
        }

        Self {
            hue: hue as u8,
            saturation: saturation as u8,
            value: max as u8,
        }
    }
}

/// One camera image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    channels: usize,
    order: ChannelOrder,
    data: Vec<Channel>,
}

impl Frame {
    /// Wraps a row-major pixel buffer.
    ///
    /// Fails when `channels` is not 3 or 4, or when `data` does not hold exactly
    /// `width * height * channels` bytes.
    pub fn new(
        width: u32,
        height: u32,
        channels: usize,
        order: ChannelOrder,
        data: Vec<Channel>,
    ) -> Result<Self, FrameError> {
        if !matches!(channels, 3 | 4) {
            return Err(FrameError::UnsupportedChannels(channels));
        }
        let expected = width as usize * height as usize * channels;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            order,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    /// The pixel the tracker tries to bring the target onto.
    pub fn center(&self) -> Point {
        Point::new((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// RGB value at `(x, y)`. Panics when the coordinate is outside the frame.
    pub fn rgb_at(&self, x: u32, y: u32) -> [Channel; 3] {
        let start = (y as usize * self.width as usize + x as usize) * self.channels;
        self.order.rgb(&self.data[start..start + self.channels])
    }

    /// Every pixel in HSV, in row-major order.
    pub fn hsv_pixels(&self) -> impl Iterator<Item = HsvPixel> + '_ {
        self.data.chunks_exact(self.channels).map(move |pixel| {
            let [r, g, b] = self.order.rgb(pixel);
            HsvPixel::from_rgb(r, g, b)
        })
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| Rgb(self.rgb_at(x, y)))
    }

    /// Returns the frame scaled to `width` x `height`, or the frame itself when
    /// it already has that size.
    pub fn into_size(self, width: u32, height: u32) -> Frame {
        if self.width == width && self.height == height {
            return self;
        }
        let resized = imageops::resize(&self.to_rgb_image(), width, height, FilterType::Triangle);
        Frame::from(resized)
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            channels: 3,
            order: ChannelOrder::Rgb,
            data: image.into_raw(),
        }
    }
}
