//! Session example - generates an image, then edits it in place.
//!
//! Run with: `cargo run --example edit_image`
//!
//! Requires `GOOGLE_API_KEY` environment variable.

use visionary::{AppState, AspectRatio, GeminiProvider, SubmitOutcome};

async fn submit(state: &mut AppState, provider: &GeminiProvider) -> bool {
    match state.submit(provider).await {
        Ok(SubmitOutcome::Created(_)) => true,
        Ok(SubmitOutcome::Failed(message)) => {
            eprintln!("Request failed: {message}");
            false
        }
        Err(invalid) => {
            eprintln!("{invalid}");
            false
        }
    }
}

#[tokio::main]
async fn main() -> visionary::Result<()> {
    let provider = GeminiProvider::builder().build()?;
    let mut state = AppState::new();

    state.set_prompt("A lighthouse on a cliff at dusk");
    state.set_aspect_ratio(AspectRatio::Portrait);
    if !submit(&mut state, &provider).await {
        return Ok(());
    }

    // Reuse the displayed result as the edit source.
    state.quick_edit();
    state.set_prompt("Make the colors more vibrant and add a warm sunset glow");
    if !submit(&mut state, &provider).await {
        return Ok(());
    }

    for (position, image) in state.history().iter().enumerate() {
        let path = image.save_to(".")?;
        println!("{}. {} -> {}", position + 1, image.prompt, path.display());
    }

    Ok(())
}
