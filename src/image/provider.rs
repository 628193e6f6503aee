//! Image provider trait.

use crate::error::Result;
use crate::image::data_uri::DataUri;
use crate::image::types::GenerationRequest;
use async_trait::async_trait;

/// A service that turns one [`GenerationRequest`] into one image.
///
/// Implementations make exactly one attempt per call: the result is either a
/// single non-empty image or an error.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates or edits an image, depending on the request.
    async fn generate(&self, request: &GenerationRequest) -> Result<DataUri>;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str;

    /// Checks if the provider is reachable and authenticated.
    async fn health_check(&self) -> Result<()>;
}
