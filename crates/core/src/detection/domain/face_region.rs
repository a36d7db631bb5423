use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::geometry::Rect;

/// Named landmark points (e.g. `"nose"`) in image pixel coordinates.
///
/// Ordered so serialised output is stable across runs.
pub type Landmarks = BTreeMap<String, (f32, f32)>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidFaceRegion {
    #[error("face region must have positive size, got {width}x{height}")]
    NonPositiveSize { width: i32, height: i32 },
    #[error("confidence must be a finite value in [0, 1], got {0}")]
    ConfidenceOutOfRange(f32),
}

/// A detected face: rectangle, confidence and optional landmarks.
///
/// Construction validates `width > 0`, `height > 0` and
/// `confidence ∈ [0, 1]`; there are no setters, so a value that exists is
/// always valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFaceRegion")]
pub struct FaceRegion {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    landmarks: Option<Landmarks>,
}

impl FaceRegion {
    pub fn new(
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        confidence: f32,
    ) -> Result<Self, InvalidFaceRegion> {
        if width <= 0 || height <= 0 {
            return Err(InvalidFaceRegion::NonPositiveSize { width, height });
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(InvalidFaceRegion::ConfidenceOutOfRange(confidence));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
            confidence,
            landmarks: None,
        })
    }

    pub fn from_rect(rect: Rect, confidence: f32) -> Result<Self, InvalidFaceRegion> {
        Self::new(rect.x, rect.y, rect.width, rect.height, confidence)
    }

    pub fn with_landmarks(mut self, landmarks: Landmarks) -> Self {
        self.landmarks = Some(landmarks);
        self
    }

    /// Same confidence and landmarks, new rectangle (e.g. after clipping).
    pub fn with_rect(&self, rect: Rect) -> Result<Self, InvalidFaceRegion> {
        let moved = Self::from_rect(rect, self.confidence)?;
        Ok(Self {
            landmarks: self.landmarks.clone(),
            ..moved
        })
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn landmarks(&self) -> Option<&Landmarks> {
        self.landmarks.as_ref()
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

impl From<&FaceRegion> for Rect {
    fn from(region: &FaceRegion) -> Self {
        region.rect()
    }
}

#[derive(Deserialize)]
struct RawFaceRegion {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    confidence: f32,
    #[serde(default)]
    landmarks: Option<Landmarks>,
}

impl TryFrom<RawFaceRegion> for FaceRegion {
    type Error = InvalidFaceRegion;

    fn try_from(raw: RawFaceRegion) -> Result<Self, Self::Error> {
        let region = Self::new(raw.x, raw.y, raw.width, raw.height, raw.confidence)?;
        Ok(match raw.landmarks {
            Some(landmarks) => region.with_landmarks(landmarks),
            None => region,
        })
    }
}
