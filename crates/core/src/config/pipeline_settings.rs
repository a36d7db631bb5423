use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::annotation::domain::annotation_style::{AnnotationStyle, InvalidStyle, LabelFormat};
use crate::codec::TransportFormat;
use crate::detection::domain::region_filter::{ConfidenceThreshold, InvalidThreshold};
use crate::governor::resource_governor::GovernorConfig;
use crate::shared::constants::{
    DEFAULT_CALL_TIMEOUT_MS, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_JPEG_QUALITY,
    DEFAULT_LABEL_SCALE, DEFAULT_MAX_CONCURRENT_CALLS, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_MIN_FACE_DIMENSION, DEFAULT_QUEUE_CAPACITY, DEFAULT_STROKE_COLOR,
    DEFAULT_STROKE_WIDTH, SETTINGS_DIR_NAME, SETTINGS_FILE_NAME,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    pub const ALL: &[OutputFormat] = &[OutputFormat::Png, OutputFormat::Jpeg];
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Png => write!(f, "png"),
            OutputFormat::Jpeg => write!(f, "jpeg"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Threshold(#[from] InvalidThreshold),
    #[error(transparent)]
    Style(#[from] InvalidStyle),
    #[error("jpeg_quality must be in 1..=100, got {0}")]
    JpegQuality(u8),
    #[error("{0} must be positive")]
    NotPositive(&'static str),
}

/// Tunables for one pipeline deployment, persisted as JSON.
///
/// Missing fields take their defaults, so a file only needs to name what it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub confidence_threshold: f32,
    pub min_face_dimension: u32,
    pub max_concurrent: usize,
    pub queue_capacity: usize,
    pub call_timeout_ms: u64,
    pub stroke_color: [u8; 3],
    pub stroke_width: u32,
    pub label_format: LabelFormat,
    pub label_scale: u32,
    pub output_format: OutputFormat,
    pub jpeg_quality: u8,
    pub max_upload_bytes: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            min_face_dimension: DEFAULT_MIN_FACE_DIMENSION,
            max_concurrent: DEFAULT_MAX_CONCURRENT_CALLS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            stroke_color: DEFAULT_STROKE_COLOR,
            stroke_width: DEFAULT_STROKE_WIDTH,
            label_format: LabelFormat::default(),
            label_scale: DEFAULT_LABEL_SCALE,
            output_format: OutputFormat::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl PipelineSettings {
    /// `<config dir>/facemark/settings.json`, when the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME))
    }

    /// Loads settings from `path`, or from [`default_path`](Self::default_path)
    /// when `path` is `None`.
    ///
    /// An explicit path must exist. A missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| write_err(e.into()))?;
        fs::write(path, json).map_err(write_err)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.threshold()?;
        self.annotation_style()?;
        self.transport_format()?;
        if self.max_concurrent == 0 {
            return Err(SettingsError::NotPositive("max_concurrent"));
        }
        if self.call_timeout_ms == 0 {
            return Err(SettingsError::NotPositive("call_timeout_ms"));
        }
        if self.max_upload_bytes == 0 {
            return Err(SettingsError::NotPositive("max_upload_bytes"));
        }
        Ok(())
    }

    pub fn threshold(&self) -> Result<ConfidenceThreshold, SettingsError> {
        Ok(ConfidenceThreshold::new(self.confidence_threshold)?)
    }

    pub fn annotation_style(&self) -> Result<AnnotationStyle, SettingsError> {
        Ok(
            AnnotationStyle::new(self.stroke_color, self.stroke_width, self.label_format)?
                .with_label_scale(self.label_scale)?,
        )
    }

    pub fn transport_format(&self) -> Result<TransportFormat, SettingsError> {
        match self.output_format {
            OutputFormat::Png => Ok(TransportFormat::Png),
            OutputFormat::Jpeg if (1..=100).contains(&self.jpeg_quality) => {
                Ok(TransportFormat::Jpeg {
                    quality: self.jpeg_quality,
                })
            }
            OutputFormat::Jpeg => Err(SettingsError::JpegQuality(self.jpeg_quality)),
        }
    }

    pub fn governor_config(&self) -> GovernorConfig {
        GovernorConfig {
            max_concurrent: self.max_concurrent,
            queue_capacity: self.queue_capacity,
            call_timeout: Duration::from_millis(self.call_timeout_ms),
        }
    }

    fn read(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let s = PipelineSettings::default();
        assert_relative_eq!(s.confidence_threshold, 0.5);
        assert_eq!(s.min_face_dimension, 200);
        assert_eq!(s.max_concurrent, 2);
        assert_eq!(s.queue_capacity, 8);
        assert_eq!(s.call_timeout_ms, 30_000);
        assert_eq!(s.stroke_color, [0, 255, 0]);
        assert_eq!(s.output_format, OutputFormat::Png);
        assert_eq!(s.jpeg_quality, 85);
        assert_eq!(s.max_upload_bytes, 10 * 1024 * 1024);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"confidence_threshold": 0.8, "label_format": "indexed", "output_format": "jpeg"}"#,
        )
        .unwrap();

        let s = PipelineSettings::load(Some(&path)).unwrap();
        assert_relative_eq!(s.confidence_threshold, 0.8);
        assert_eq!(s.label_format, LabelFormat::Indexed);
        assert_eq!(s.transport_format().unwrap(), TransportFormat::Jpeg { quality: 85 });
        assert_eq!(s.max_concurrent, 2);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = PipelineSettings {
            queue_capacity: 0,
            stroke_color: [255, 0, 0],
            ..PipelineSettings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(PipelineSettings::load(Some(&path)).unwrap(), settings);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = PipelineSettings::load(Some(&dir.path().join("absent.json")));
        assert!(matches!(result, Err(SettingsError::Read { .. })));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            PipelineSettings::load(Some(&path)),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[rstest]
    #[case::threshold_high(PipelineSettings { confidence_threshold: 1.5, ..Default::default() })]
    #[case::zero_stroke(PipelineSettings { stroke_width: 0, ..Default::default() })]
    #[case::huge_stroke(PipelineSettings { stroke_width: 3_000_000_000, ..Default::default() })]
    #[case::zero_label_scale(PipelineSettings { label_scale: 0, ..Default::default() })]
    #[case::huge_label_scale(PipelineSettings { label_scale: 200_000_000, ..Default::default() })]
    #[case::zero_concurrency(PipelineSettings { max_concurrent: 0, ..Default::default() })]
    #[case::zero_timeout(PipelineSettings { call_timeout_ms: 0, ..Default::default() })]
    #[case::zero_upload(PipelineSettings { max_upload_bytes: 0, ..Default::default() })]
    #[case::jpeg_quality(PipelineSettings {
        output_format: OutputFormat::Jpeg,
        jpeg_quality: 0,
        ..Default::default()
    })]
    fn test_validate_rejects(#[case] settings: PipelineSettings) {
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_png_ignores_jpeg_quality() {
        let s = PipelineSettings {
            jpeg_quality: 0,
            ..Default::default()
        };
        assert_eq!(s.transport_format().unwrap(), TransportFormat::Png);
    }

    #[test]
    fn test_governor_config() {
        let s = PipelineSettings {
            max_concurrent: 4,
            queue_capacity: 1,
            call_timeout_ms: 250,
            ..Default::default()
        };
        assert_eq!(
            s.governor_config(),
            GovernorConfig {
                max_concurrent: 4,
                queue_capacity: 1,
                call_timeout: Duration::from_millis(250),
            }
        );
    }
}
