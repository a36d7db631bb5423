use std::fmt;

use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::Bounds;

/// Bytes per pixel; every decoded image is normalised to RGB8.
pub const CHANNELS: usize = 3;

/// Encoding an [`Image`] was decoded from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Png,
    Jpeg,
    Bmp,
    Gif,
    Tiff,
    WebP,
    /// Built in memory rather than decoded.
    Raw,
}

impl SourceFormat {
    pub fn from_image_format(format: image::ImageFormat) -> Option<Self> {
        match format {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::Bmp => Some(Self::Bmp),
            image::ImageFormat::Gif => Some(Self::Gif),
            image::ImageFormat::Tiff => Some(Self::Tiff),
            image::ImageFormat::WebP => Some(Self::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
            Self::WebP => "webp",
            Self::Raw => "raw",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageDataError {
    #[error("image dimensions must be non-zero, got {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height} RGB")]
    LengthMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// An immutable RGB8 raster: contiguous bytes in row-major order.
///
/// No mutable accessor exists. Stages that "change" an image build a new
/// one, so a source image can be shared by reference for a whole call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: SourceFormat,
}

impl Image {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: SourceFormat,
    ) -> Result<Self, ImageDataError> {
        if width == 0 || height == 0 {
            return Err(ImageDataError::ZeroDimension { width, height });
        }
        let expected = (width as usize) * (height as usize) * CHANNELS;
        if data.len() != expected {
            return Err(ImageDataError::LengthMismatch {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    /// Takes ownership of an `image` crate buffer without copying.
    pub fn from_rgb(rgb: image::RgbImage, format: SourceFormat) -> Result<Self, ImageDataError> {
        let (width, height) = rgb.dimensions();
        Self::new(rgb.into_raw(), width, height, format)
    }

    /// Copies the pixels into a fresh `image` crate buffer.
    pub fn to_rgb_image(&self) -> image::RgbImage {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
            .expect("Image invariants guarantee a full buffer")
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.width, self.height)
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Image data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}
