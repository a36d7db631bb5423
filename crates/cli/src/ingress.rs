use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use facemark_core::shared::constants::IMAGE_EXTENSIONS;
use facemark_core::shared::geometry::Rect;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),
    #[error("Unsupported file type: {0}")]
    UnsupportedType(PathBuf),
    #[error("{path} is {size} bytes, upload limit is {limit}")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Checks existence, type and size, then reads the whole file.
pub fn read_upload(path: &Path, limit: u64) -> Result<Vec<u8>, ValidationError> {
    if !path.is_file() {
        return Err(ValidationError::NotFound(path.to_path_buf()));
    }
    if !is_image(path) {
        return Err(ValidationError::UnsupportedType(path.to_path_buf()));
    }
    let read_err = |source| ValidationError::Read {
        path: path.to_path_buf(),
        source,
    };
    let size = fs::metadata(path).map_err(read_err)?.len();
    if size > limit {
        return Err(ValidationError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit,
        });
    }
    fs::read(path).map_err(read_err)
}

/// Parses `x,y,width,height`.
pub fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, w, h] = parts.as_slice() else {
        return Err(format!("expected x,y,width,height, got '{s}'"));
    };
    let num = |v: &str| {
        v.parse::<i32>()
            .map_err(|e| format!("invalid number '{v}' in '{s}': {e}"))
    };
    Ok(Rect::new(num(*x)?, num(*y)?, num(*w)?, num(*h)?))
}
