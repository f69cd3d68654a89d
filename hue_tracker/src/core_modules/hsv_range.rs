use serde::{Deserialize, Serialize};

use crate::config::ThresholdConfig;
use crate::core_modules::frame::HsvPixel;
use crate::error::ConfigError;

const CHANNEL_NAMES: [&str; 3] = ["hue", "saturation", "value"];

/// Largest legal value of each HSV channel.
pub const CHANNEL_MAX: [u8; 3] = [179, 255, 255];

/// An inclusive box in HSV space.
///
/// Every channel satisfies `lower <= upper` and stays within [`CHANNEL_MAX`]; the
/// only way to get a value of this type is through [`HsvRange::new`] (or the
/// equivalent `TryFrom<ThresholdConfig>`), which checks both.
///
/// Hue does not wrap: a range cannot describe reds that straddle 179/0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ThresholdConfig", into = "ThresholdConfig")]
pub struct HsvRange {
    lower: [u8; 3],
    upper: [u8; 3],
}

impl HsvRange {
    pub fn new(lower: [u8; 3], upper: [u8; 3]) -> Result<Self, ConfigError> {
        for channel in 0..3 {
            for bound in [lower[channel], upper[channel]] {
                if bound > CHANNEL_MAX[channel] {
                    return Err(ConfigError::ChannelOutOfRange {
                        channel: CHANNEL_NAMES[channel],
                        value: bound as i32,
                        max: CHANNEL_MAX[channel] as i32,
                    });
                }
            }
            if lower[channel] > upper[channel] {
                return Err(ConfigError::InvertedRange {
                    channel: CHANNEL_NAMES[channel],
                    lower: lower[channel] as i32,
                    upper: upper[channel] as i32,
                });
            }
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> [u8; 3] {
        self.lower
    }

    pub fn upper(&self) -> [u8; 3] {
        self.upper
    }

    pub fn contains(&self, pixel: HsvPixel) -> bool {
        let channels = [pixel.hue, pixel.saturation, pixel.value];
        (0..3).all(|i| self.lower[i] <= channels[i] && channels[i] <= self.upper[i])
    }
}

impl Default for HsvRange {
    /// A saturated, reasonably bright green.
    fn default() -> Self {
        Self {
            lower: [40, 70, 70],
            upper: [80, 255, 255],
        }
    }
}

impl TryFrom<ThresholdConfig> for HsvRange {
    type Error = ConfigError;

    fn try_from(config: ThresholdConfig) -> Result<Self, Self::Error> {
        let mut lower = [0u8; 3];
        let mut upper = [0u8; 3];
        for channel in 0..3 {
            for (raw, slot) in [
                (config.lower[channel], &mut lower[channel]),
                (config.upper[channel], &mut upper[channel]),
            ] {
                if !(0..=i32::from(CHANNEL_MAX[channel])).contains(&raw) {
                    return Err(ConfigError::ChannelOutOfRange {
                        channel: CHANNEL_NAMES[channel],
                        value: raw,
                        max: CHANNEL_MAX[channel] as i32,
                    });
                }
                *slot = raw as u8;
            }
        }
        HsvRange::new(lower, upper)
    }
}

impl From<HsvRange> for ThresholdConfig {
    fn from(range: HsvRange) -> Self {
        Self {
            lower: range.lower.map(i32::from),
            upper: range.upper.map(i32::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_are_inclusive() {
        let range = HsvRange::new([40, 70, 70], [80, 255, 255]).unwrap();
        assert!(range.contains(HsvPixel { hue: 40, saturation: 70, value: 70 }));
        assert!(range.contains(HsvPixel { hue: 80, saturation: 255, value: 255 }));
        assert!(!range.contains(HsvPixel { hue: 81, saturation: 255, value: 255 }));
        assert!(!range.contains(HsvPixel { hue: 60, saturation: 69, value: 255 }));
    }

    #[test]
    fn inverted_channel_is_rejected() {
        let err = HsvRange::new([90, 0, 0], [80, 255, 255]).unwrap_err();
        assert!(matches!(err, ConfigError::InvertedRange { channel: "hue", lower: 90, upper: 80 }));
    }

    #[test]
    fn hue_above_179_is_rejected() {
        let err = HsvRange::new([0, 0, 0], [180, 255, 255]).unwrap_err();
        assert!(matches!(err, ConfigError::ChannelOutOfRange { channel: "hue", value: 180, max: 179 }));
    }

    #[test]
    fn hue_does_not_wrap() {
        // A red range written as 170..10 is not a wrapping range, it is invalid.
        assert!(HsvRange::new([170, 100, 100], [10, 255, 255]).is_err());

        let high_reds = HsvRange::new([170, 100, 100], [179, 255, 255]).unwrap();
        assert!(!high_reds.contains(HsvPixel { hue: 2, saturation: 200, value: 200 }));
    }

    #[test]
    fn threshold_record_outside_byte_range_is_rejected() {
        let record = ThresholdConfig { lower: [0, -1, 0], upper: [10, 255, 255] };
        let err = HsvRange::try_from(record).unwrap_err();
        assert!(matches!(err, ConfigError::ChannelOutOfRange { channel: "saturation", value: -1, .. }));

        let record = ThresholdConfig { lower: [0, 0, 0], upper: [10, 256, 255] };
        assert!(HsvRange::try_from(record).is_err());
    }

    #[test]
    fn deserializes_from_calibrator_json() {
        let range: HsvRange = serde_json::from_str(r#"{"lower": [35, 60, 50], "upper": [85, 255, 250]}"#).unwrap();
        assert_eq!(range.lower(), [35, 60, 50]);
        assert_eq!(range.upper(), [85, 255, 250]);

        let degenerate = serde_json::from_str::<HsvRange>(r#"{"lower": [90, 0, 0], "upper": [80, 255, 255]}"#);
        assert!(degenerate.is_err());
    }
}
