use crate::core_modules::region::{Point, Region};
use crate::error::ConfigError;

/// Regions smaller than this are treated as sensor noise.
pub const DEFAULT_MIN_AREA: f64 = 300.0;

/// The region chosen as the object to follow in the current frame.
///
/// Targets carry no identity between frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub centroid: Point,
    pub area: f64,
}

impl From<&Region> for Target {
    fn from(region: &Region) -> Self {
        Self {
            centroid: region.centroid(),
            area: region.area(),
        }
    }
}

/// Picks the largest region that clears the noise floor.
#[derive(Debug, Clone, Copy)]
pub struct TargetSelector {
    min_area: f64,
}

impl TargetSelector {
    pub fn new(min_area: f64) -> Result<Self, ConfigError> {
        if !(min_area.is_finite() && min_area > 0.0) {
            return Err(ConfigError::NonPositiveMinArea(min_area));
        }
        Ok(Self { min_area })
    }

    pub fn min_area(&self) -> f64 {
        self.min_area
    }

    pub fn select(&self, regions: &[Region]) -> Option<Target> {
        select(regions, self.min_area)
    }
}

/// Returns the largest region with `area >= min_area`, or `None` when nothing
/// survives. Equal areas resolve to the region that comes first.
pub fn select(regions: &[Region], min_area: f64) -> Option<Target> {
    let mut best: Option<&Region> = None;
    for region in regions.iter().filter(|r| r.area() >= min_area) {
        if best.is_none_or(|b| region.area() > b.area()) {
            best = Some(region);
        }
    }
    best.map(Target::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Axis-aligned rectangle outline whose polygon area is `w * h`.
    fn rect(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region::from_boundary(vec![
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ])
    }

    #[test]
    fn everything_below_the_floor_means_no_target() {
        let regions = vec![rect(0, 0, 10, 10), rect(50, 50, 15, 15), rect(100, 0, 17, 17)];
        assert_eq!(select(&regions, DEFAULT_MIN_AREA), None);
        assert_eq!(select(&[], DEFAULT_MIN_AREA), None);
    }

    #[test]
    fn unique_largest_survivor_wins() {
        let small = rect(0, 0, 20, 20);
        let large = rect(100, 100, 40, 30);
        let noise = rect(300, 300, 5, 5);
        let regions = vec![small, large.clone(), noise];

        let target = select(&regions, DEFAULT_MIN_AREA).unwrap();
        assert_eq!(target, Target::from(&large));
        assert_eq!(target.area, 1200.0);
    }

    #[test]
    fn ties_go_to_the_first_region() {
        let first = rect(0, 0, 20, 20);
        let second = rect(200, 200, 20, 20);
        let target = select(&[first.clone(), second], DEFAULT_MIN_AREA).unwrap();
        assert_eq!(target.centroid, first.centroid());
    }

    #[test]
    fn area_equal_to_the_floor_survives() {
        let exact = rect(0, 0, 20, 15);
        assert_eq!(exact.area(), 300.0);
        assert!(select(&[exact], 300.0).is_some());
    }

    #[test]
    fn non_positive_floor_is_a_configuration_error() {
        assert!(TargetSelector::new(0.0).is_err());
        assert!(TargetSelector::new(-5.0).is_err());
        assert!(TargetSelector::new(f64::NAN).is_err());
        assert_eq!(TargetSelector::new(300.0).unwrap().min_area(), 300.0);
    }
}
