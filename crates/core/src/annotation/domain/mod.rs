pub mod annotation_style;
pub mod annotator;
