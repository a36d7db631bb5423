use crate::shared::constants::DEFAULT_JPEG_QUALITY;

/// Encoding used when an image leaves the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportFormat {
    /// Lossless; decode(encode(x)) is pixel-identical to x.
    Png,
    /// Lossy and therefore only approximately round-trippable.
    Jpeg { quality: u8 },
}

impl TransportFormat {
    pub fn jpeg() -> Self {
        Self::Jpeg {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg { .. } => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg { .. } => "jpg",
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self, Self::Png)
    }
}

impl Default for TransportFormat {
    fn default() -> Self {
        Self::Png
    }
}
