use async_trait::async_trait;
use std::sync::Arc;

use crate::error::AlignResult;
use crate::pipeline::types::{ImageHandle, Landmark};

/// Produces the primary alignment reference point of an image.
///
/// `Ok(None)` means the image decoded fine but holds nothing to anchor on
/// (a blank wall, a black frame). Whether extraction is local or remote
/// is invisible to callers.
#[async_trait]
pub trait SignalExtractor: Send + Sync {
    /// Returns the name of the extractor
    fn name(&self) -> &str;

    /// Extract zero or one landmark from the image behind `image`
    async fn extract(&self, image: &ImageHandle) -> AlignResult<Option<Landmark>>;
}

/// Builds an extractor, loading whatever model or client it needs.
///
/// Called at most once per successful initialization by
/// [`SharedDetector`](crate::analyzer::SharedDetector).
#[async_trait]
pub trait ExtractorFactory: Send + Sync {
    /// Name of the backend this factory builds
    fn backend(&self) -> &str;

    async fn initialize(&self) -> AlignResult<Arc<dyn SignalExtractor>>;
}
