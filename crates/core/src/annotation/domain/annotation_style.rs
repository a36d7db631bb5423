use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_LABEL_SCALE, DEFAULT_STROKE_COLOR, DEFAULT_STROKE_WIDTH, MAX_LABEL_SCALE,
    MAX_STROKE_WIDTH,
};

/// Text drawn above each annotated region.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelFormat {
    /// `95.0%`
    #[default]
    Percent,
    /// `Face 1: 95.0%`, numbered from 1 in detection order.
    Indexed,
    /// Outline only.
    None,
}

impl LabelFormat {
    /// Label text for the region at `index` (zero-based), if any.
    pub fn render(&self, index: usize, confidence: f32) -> Option<String> {
        let percent = confidence * 100.0;
        match self {
            Self::Percent => Some(format!("{percent:.1}%")),
            Self::Indexed => Some(format!("Face {}: {percent:.1}%", index + 1)),
            Self::None => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidStyle {
    #[error("stroke width must be in 1..=256, got {0}")]
    StrokeWidth(u32),
    #[error("label scale must be in 1..=64, got {0}")]
    LabelScale(u32),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationStyle {
    stroke_color: [u8; 3],
    stroke_width: u32,
    label_format: LabelFormat,
    label_scale: u32,
}

impl AnnotationStyle {
    pub fn new(
        stroke_color: [u8; 3],
        stroke_width: u32,
        label_format: LabelFormat,
    ) -> Result<Self, InvalidStyle> {
        if !(1..=MAX_STROKE_WIDTH).contains(&stroke_width) {
            return Err(InvalidStyle::StrokeWidth(stroke_width));
        }
        Ok(Self {
            stroke_color,
            stroke_width,
            label_format,
            label_scale: DEFAULT_LABEL_SCALE,
        })
    }

    /// Integer magnification of the 8x8 label font.
    pub fn with_label_scale(mut self, scale: u32) -> Result<Self, InvalidStyle> {
        if !(1..=MAX_LABEL_SCALE).contains(&scale) {
            return Err(InvalidStyle::LabelScale(scale));
        }
        self.label_scale = scale;
        Ok(self)
    }

    pub fn stroke_color(&self) -> [u8; 3] {
        self.stroke_color
    }

    pub fn stroke_width(&self) -> u32 {
        self.stroke_width
    }

    pub fn label_format(&self) -> LabelFormat {
        self.label_format
    }

    pub fn label_scale(&self) -> u32 {
        self.label_scale
    }
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            stroke_color: DEFAULT_STROKE_COLOR,
            stroke_width: DEFAULT_STROKE_WIDTH,
            label_format: LabelFormat::default(),
            label_scale: DEFAULT_LABEL_SCALE,
        }
    }
}
