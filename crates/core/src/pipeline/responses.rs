use serde::{Deserialize, Serialize};

use crate::detection::domain::face_region::FaceRegion;

/// Wire form of one detected face.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceSummary {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f32,
}

impl From<&FaceRegion> for FaceSummary {
    fn from(region: &FaceRegion) -> Self {
        Self {
            x: region.x(),
            y: region.y(),
            width: region.width(),
            height: region.height(),
            confidence: region.confidence(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub original_image: String,
    pub annotated_image: String,
    pub faces: Vec<FaceSummary>,
    pub total_faces: usize,
    pub processing_time_ms: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CropResponse {
    pub cropped_images: Vec<String>,
    /// Request position of each entry in `cropped_images`.
    pub region_indices: Vec<usize>,
    pub skipped_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_response_uses_camel_case() {
        let response = UploadResponse {
            original_image: "data:a".into(),
            annotated_image: "data:b".into(),
            faces: vec![FaceSummary {
                x: 1,
                y: 2,
                width: 3,
                height: 4,
                confidence: 0.5,
            }],
            total_faces: 1,
            processing_time_ms: 12,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["originalImage"], "data:a");
        assert_eq!(json["annotatedImage"], "data:b");
        assert_eq!(json["totalFaces"], 1);
        assert_eq!(json["processingTimeMs"], 12);
        assert_eq!(json["faces"][0]["width"], 3);
    }

    #[test]
    fn test_crop_response_uses_camel_case() {
        let json = serde_json::to_value(CropResponse {
            cropped_images: vec!["x".into()],
            region_indices: vec![2],
            skipped_count: 1,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"croppedImages": ["x"], "regionIndices": [2], "skippedCount": 1})
        );
    }

    #[test]
    fn test_face_summary_drops_landmarks() {
        let region = FaceRegion::new(5, 6, 7, 8, 0.9)
            .unwrap()
            .with_landmarks([("nose".to_string(), (1.0, 1.0))].into());
        let summary = FaceSummary::from(&region);
        let json = serde_json::to_value(summary).unwrap();
        assert!(json.get("landmarks").is_none());
        assert_eq!(json["x"], 5);
    }
}
