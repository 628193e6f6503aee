//! Image model, request types and the provider seam.

mod data_uri;
mod provider;
pub mod providers;
mod types;

pub use data_uri::DataUri;
pub use provider::ImageProvider;
pub use types::{AspectRatio, GeneratedImage, GenerationMode, GenerationRequest, ImageFormat};
