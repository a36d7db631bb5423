use thiserror::Error;

use crate::shared::constants::DEFAULT_CONFIDENCE_THRESHOLD;
use crate::shared::geometry::{self, Bounds};

use super::face_region::FaceRegion;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("confidence threshold must be in [0, 1], got {0}")]
pub struct InvalidThreshold(pub f32);

/// Minimum confidence a region needs to survive detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConfidenceThreshold(f32);

impl ConfidenceThreshold {
    pub fn new(value: f32) -> Result<Self, InvalidThreshold> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidThreshold(value))
        }
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    pub fn admits(&self, confidence: f32) -> bool {
        confidence >= self.0
    }
}

impl Default for ConfidenceThreshold {
    fn default() -> Self {
        Self(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

/// Applies the detector output contract to raw regions.
///
/// - Regions below `threshold` are dropped, not flagged.
/// - Survivors are clipped to `bounds`; those with no overlap are dropped.
/// - Input order is preserved.
pub fn filter_regions(
    regions: Vec<FaceRegion>,
    threshold: ConfidenceThreshold,
    bounds: Bounds,
) -> Vec<FaceRegion> {
    let before = regions.len();
    let kept: Vec<FaceRegion> = regions
        .into_iter()
        .filter(|r| threshold.admits(r.confidence()))
        .filter_map(|r| {
            let clipped = geometry::clip(&r.rect(), bounds).ok()?;
            r.with_rect(clipped).ok()
        })
        .collect();
    if kept.len() < before {
        log::debug!(
            "Dropped {} of {before} regions (threshold {:.2})",
            before - kept.len(),
            threshold.value()
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::geometry::Rect;
    use rstest::rstest;

    fn region(x: i32, y: i32, w: i32, h: i32, confidence: f32) -> FaceRegion {
        FaceRegion::new(x, y, w, h, confidence).unwrap()
    }

    fn bounds() -> Bounds {
        Bounds::new(100, 100)
    }

    #[test]
    fn test_default_threshold_is_half() {
        assert_eq!(ConfidenceThreshold::default().value(), 0.5);
    }

    #[rstest]
    #[case(-0.1)]
    #[case(1.5)]
    #[case(f32::NAN)]
    fn test_invalid_threshold(#[case] value: f32) {
        assert!(ConfidenceThreshold::new(value).is_err());
    }

    #[test]
    fn test_below_threshold_dropped() {
        let regions = vec![region(0, 0, 10, 10, 0.49), region(20, 20, 10, 10, 0.5)];
        let kept = filter_regions(regions, ConfidenceThreshold::default(), bounds());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].confidence(), 0.5);
    }

    #[test]
    fn test_regions_are_clipped_to_bounds() {
        let kept = filter_regions(
            vec![region(80, -10, 40, 40, 0.9)],
            ConfidenceThreshold::default(),
            bounds(),
        );
        assert_eq!(kept[0].rect(), Rect::new(80, 0, 20, 30));
    }

    #[test]
    fn test_out_of_bounds_regions_dropped() {
        let kept = filter_regions(
            vec![region(500, 500, 10, 10, 0.9)],
            ConfidenceThreshold::default(),
            bounds(),
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn test_order_is_preserved() {
        let regions = vec![
            region(50, 50, 10, 10, 0.6),
            region(0, 0, 10, 10, 0.1),
            region(10, 10, 10, 10, 0.9),
        ];
        let kept = filter_regions(regions, ConfidenceThreshold::default(), bounds());
        let xs: Vec<i32> = kept.iter().map(|r| r.x()).collect();
        assert_eq!(xs, vec![50, 10]);
    }

    #[test]
    fn test_zero_threshold_keeps_everything_in_bounds() {
        let regions = vec![region(0, 0, 10, 10, 0.0), region(10, 10, 10, 10, 0.01)];
        let kept = filter_regions(regions, ConfidenceThreshold::new(0.0).unwrap(), bounds());
        assert_eq!(kept.len(), 2);
    }
}
