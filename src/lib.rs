#![warn(missing_docs)]
//! Visionary - text-to-image generation and generative image editing.
//!
//! A prompt plus a mode becomes one request to Google's image models: Imagen
//! creates new images, Gemini edits an uploaded one. Results are kept in an
//! in-memory session history that can be browsed, reopened, edited again and
//! saved to disk.
//!
//! # Quick Start
//!
//! ```no_run
//! use visionary::{AspectRatio, GeminiProvider, GenerationRequest, ImageProvider};
//!
//! #[tokio::main]
//! async fn main() -> visionary::Result<()> {
//!     let provider = GeminiProvider::builder().build()?;
//!     let request = GenerationRequest::generate("A red balloon over Paris", AspectRatio::Landscape);
//!     let image = provider.generate(&request).await?;
//!     println!("{}", image.mime_type());
//!     Ok(())
//! }
//! ```
//!
//! # Session
//!
//! [`AppState`] holds everything an interactive front end needs: mode,
//! prompt, aspect ratio, source image, the displayed image and the history.
//! [`AppState::submit`] validates the inputs, makes the single provider call
//! and records the outcome.
//!
//! ```no_run
//! use visionary::{AppState, GeminiProvider, SubmitOutcome};
//!
//! # async fn run() -> visionary::Result<()> {
//! let provider = GeminiProvider::builder().build()?;
//! let mut state = AppState::new();
//! state.set_prompt("A futuristic city on Mars with neon lights");
//! match state.submit(&provider).await {
//!     Ok(SubmitOutcome::Created(_)) => {
//!         let image = state.current_image().expect("just created");
//!         image.save_to(".")?;
//!     }
//!     Ok(SubmitOutcome::Failed(message)) => eprintln!("{message}"),
//!     Err(invalid) => eprintln!("{invalid}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `cli` (default): the `visionary` binary and the interactive [`repl`].

mod error;
pub mod image;
pub mod session;

#[cfg(feature = "cli")]
pub mod repl;

// Re-export error types at crate root
pub use error::{Result, VisionaryError};

pub use image::providers::{GeminiModel, GeminiProvider, GeminiProviderBuilder, ImagenModel};
pub use image::{
    AspectRatio, DataUri, GeneratedImage, GenerationMode, GenerationRequest, ImageFormat,
    ImageProvider,
};
pub use session::{AppState, SessionHistory, SubmitOutcome, ValidationError};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, VisionaryError};
    pub use crate::image::providers::GeminiProvider;
    pub use crate::image::{
        AspectRatio, DataUri, GeneratedImage, GenerationMode, GenerationRequest, ImageProvider,
    };
    pub use crate::session::{AppState, SubmitOutcome};
}
