//! JSON bodies exchanged between the detection service and its clients.

use serde::{Deserialize, Serialize};

use crate::pipeline::Landmark;

/// Multipart field carrying the image for `/landmark`
pub const IMAGE_FIELD: &str = "image";
/// Multipart fields carrying the pair for `/analyze`
pub const USER_IMAGE_FIELD: &str = "userImage";
pub const REFERENCE_IMAGE_FIELD: &str = "referenceImage";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub extractor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkResponse {
    pub landmark: Option<Landmark>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
