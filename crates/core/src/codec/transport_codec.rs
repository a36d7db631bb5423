//! Conversion between [`Image`] values and the transport strings callers
//! exchange with the pipeline (`data:image/png;base64,...`).

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use thiserror::Error;

use crate::shared::raster::{Image, SourceFormat};

use super::transport_format::TransportFormat;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("corrupt image payload: {reason}")]
    Corrupt { reason: String },
    #[error("unsupported image format: {format}")]
    UnsupportedFormat { format: String },
}

impl DecodeError {
    fn corrupt(reason: impl Into<String>) -> Self {
        Self::Corrupt {
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("failed to encode {format} image: {source}")]
    Image {
        format: &'static str,
        #[source]
        source: image::ImageError,
    },
}

/// Encodes `image` as a data URI. Output is deterministic for a given
/// image and format.
pub fn encode(image: &Image, format: TransportFormat) -> Result<String, EncodeError> {
    let bytes = encode_bytes(image, format)?;
    Ok(format!(
        "data:{};base64,{}",
        format.media_type(),
        STANDARD.encode(bytes)
    ))
}

/// Encodes `image` to raw file bytes in the given format.
pub fn encode_bytes(image: &Image, format: TransportFormat) -> Result<Vec<u8>, EncodeError> {
    let rgb = image.to_rgb_image();
    let mut buffer = Vec::new();
    let result = match format {
        TransportFormat::Png => rgb.write_with_encoder(PngEncoder::new(&mut buffer)),
        TransportFormat::Jpeg { quality } => {
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, quality))
        }
    };
    result.map_err(|source| EncodeError::Image {
        format: format.extension(),
        source,
    })?;
    Ok(buffer)
}

/// Decodes a data URI or bare base64 string into an [`Image`].
pub fn decode(transport: &str) -> Result<Image, DecodeError> {
    decode_bytes(&payload_bytes(transport)?)
}

/// Encoded file bytes carried by a data URI or bare base64 string, without
/// decoding the image itself.
pub fn payload_bytes(transport: &str) -> Result<Vec<u8>, DecodeError> {
    let payload = strip_data_uri(transport.trim())?;
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| DecodeError::corrupt(format!("invalid base64: {e}")))
}

/// Decodes raw uploaded file bytes into an [`Image`], normalising to RGB8.
pub fn decode_bytes(bytes: &[u8]) -> Result<Image, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::corrupt("empty payload"));
    }

    let format = image::guess_format(bytes).map_err(|_| DecodeError::UnsupportedFormat {
        format: "unrecognised".to_string(),
    })?;
    let source_format =
        SourceFormat::from_image_format(format).ok_or_else(|| DecodeError::UnsupportedFormat {
            format: format!("{format:?}").to_lowercase(),
        })?;

    let decoded = image::load_from_memory_with_format(bytes, format).map_err(|e| match e {
        image::ImageError::Unsupported(inner) => DecodeError::UnsupportedFormat {
            format: inner.to_string(),
        },
        other => DecodeError::corrupt(other.to_string()),
    })?;

    Image::from_rgb(decoded.to_rgb8(), source_format)
        .map_err(|e| DecodeError::corrupt(e.to_string()))
}

fn strip_data_uri(transport: &str) -> Result<&str, DecodeError> {
    let Some(rest) = transport.strip_prefix("data:") else {
        return Ok(transport);
    };
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| DecodeError::corrupt("data URI has no payload separator"))?;

    let mut params = header.split(';');
    let media_type = params.next().unwrap_or_default();
    if !media_type.starts_with("image/") {
        return Err(DecodeError::UnsupportedFormat {
            format: media_type.to_string(),
        });
    }
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(DecodeError::corrupt("data URI payload is not base64"));
    }
    Ok(payload)
}
