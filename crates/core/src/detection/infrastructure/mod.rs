pub mod mock_face_detector;
pub mod pluggable_face_detector;
