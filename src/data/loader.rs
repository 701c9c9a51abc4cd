use image::GrayImage;
use std::path::PathBuf;

use crate::config::ImageConfig;
use crate::error::{AlignError, AlignResult};
use crate::pipeline::ImageHandle;

const FILE_SCHEME: &str = "file://";

/// Resolve a handle to a local filesystem path.
///
/// Plain paths pass through; `file://` URIs lose their scheme. Other
/// schemes cannot be read locally and surface as decode failures.
pub fn resolve_path(handle: &ImageHandle) -> AlignResult<PathBuf> {
    handle.validate()?;
    let raw = handle.as_str().trim();

    if let Some(path) = raw.strip_prefix(FILE_SCHEME) {
        return Ok(PathBuf::from(path));
    }

    if let Some((scheme, _)) = raw.split_once("://") {
        return Err(AlignError::decode(
            raw,
            format!("unsupported URI scheme '{scheme}'"),
        ));
    }

    Ok(PathBuf::from(raw))
}

/// Read the raw bytes behind a handle
pub fn read_bytes(handle: &ImageHandle) -> AlignResult<Vec<u8>> {
    let path = resolve_path(handle)?;
    std::fs::read(&path).map_err(|e| AlignError::decode(handle.as_str(), e))
}

/// Load, decode and validate the image behind a handle as luminance
pub fn load_image(handle: &ImageHandle, limits: &ImageConfig) -> AlignResult<GrayImage> {
    let bytes = read_bytes(handle)?;
    decode_image(handle.as_str(), &bytes, limits)
}

/// Decode in-memory image bytes; `label` names the source in errors
pub fn decode_image(label: &str, bytes: &[u8], limits: &ImageConfig) -> AlignResult<GrayImage> {
    let img = image::load_from_memory(bytes).map_err(|e| AlignError::decode(label, e))?;
    let gray = img.to_luma8();
    validate_image_size(label, &gray, limits)?;
    Ok(gray)
}

/// Validate that image has reasonable dimensions
pub fn validate_image_size(label: &str, image: &GrayImage, limits: &ImageConfig) -> AlignResult<()> {
    let (width, height) = image.dimensions();

    if width < limits.min_size || height < limits.min_size {
        return Err(AlignError::decode(
            label,
            format!(
                "image too small: {}x{}, minimum: {}x{}",
                width, height, limits.min_size, limits.min_size
            ),
        ));
    }

    if width > limits.max_size || height > limits.max_size {
        return Err(AlignError::decode(
            label,
            format!(
                "image too large: {}x{}, maximum: {}x{}",
                width, height, limits.max_size, limits.max_size
            ),
        ));
    }

    Ok(())
}
