//! Basic text-to-image example.
//!
//! Run with: `cargo run --example generate_image`
//!
//! Requires `GOOGLE_API_KEY` environment variable.

use visionary::{AspectRatio, GeminiProvider, GeneratedImage, GenerationRequest, ImageProvider};

#[tokio::main]
async fn main() -> visionary::Result<()> {
    let provider = GeminiProvider::builder().build()?;

    let request = GenerationRequest::generate(
        "A golden retriever puppy playing in snow",
        AspectRatio::Landscape,
    );
    let data = provider.generate(&request).await?;
    let image = GeneratedImage::from_request(&request, data)?;

    let path = image.save_to(".")?;
    println!(
        "Generated image: {} ({} bytes, {})",
        path.display(),
        image.image_url.decode()?.len(),
        image.image_url.mime_type()
    );

    Ok(())
}
