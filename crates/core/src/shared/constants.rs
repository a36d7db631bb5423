/// Regions scoring below this are dropped by every detector.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// The mock detector reports nothing for images this size or smaller.
pub const DEFAULT_MIN_FACE_DIMENSION: u32 = 200;

pub const DEFAULT_JPEG_QUALITY: u8 = 85;

pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 2;
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 30_000;

/// Ingress-side cap on raw upload size (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "tif", "webp"];

pub const SETTINGS_DIR_NAME: &str = "facemark";
pub const SETTINGS_FILE_NAME: &str = "settings.json";

pub const DEFAULT_STROKE_COLOR: [u8; 3] = [0, 255, 0];
pub const DEFAULT_STROKE_WIDTH: u32 = 2;
pub const DEFAULT_LABEL_SCALE: u32 = 2;
pub const MAX_STROKE_WIDTH: u32 = 256;
pub const MAX_LABEL_SCALE: u32 = 64;
