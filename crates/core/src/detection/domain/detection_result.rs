use std::time::Duration;

use crate::shared::raster::Image;

use super::face_region::FaceRegion;

/// Regions found in one image, in detector order.
///
/// Borrows the source image, so a result cannot outlive the call that
/// produced it.
#[derive(Clone, Debug)]
pub struct DetectionResult<'a> {
    image: &'a Image,
    regions: Vec<FaceRegion>,
    duration: Duration,
}

impl<'a> DetectionResult<'a> {
    pub fn new(image: &'a Image, regions: Vec<FaceRegion>, duration: Duration) -> Self {
        Self {
            image,
            regions,
            duration,
        }
    }

    pub fn image(&self) -> &'a Image {
        self.image
    }

    pub fn regions(&self) -> &[FaceRegion] {
        &self.regions
    }

    pub fn total_faces(&self) -> usize {
        self.regions.len()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn into_regions(self) -> Vec<FaceRegion> {
        self.regions
    }
}
