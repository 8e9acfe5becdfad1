//! # Furhi Image Utility
//!
//! File: cli/src/commands/imagine.rs
//!
//! ## Overview
//!
//! `furhi imagine` generates a single image from a prompt and writes it to a
//! file. It talks to the image service directly, without the chat router.
//!
//! ## Examples
//!
//! ```bash
//! furhi imagine a lighthouse at dusk
//! furhi imagine --output dusk.png "a lighthouse at dusk"
//! ```
//!
use crate::core::config::{load_config, Credentials};
use crate::core::error::{FurhiError, Result};
use crate::services::image::{decode_data_uri, ImageGenerator, ReplicateClient};
use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

/// # Imagine Command Arguments (`ImagineArgs`)
#[derive(Parser, Debug)]
pub struct ImagineArgs {
    /// Text prompt. Multiple words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    pub prompt: Vec<String>,

    /// File the generated image is written to.
    #[arg(long, short, default_value = "generated_image.png")]
    pub output: PathBuf,
}

/// # Handle Imagine Command (`handle_imagine`)
///
/// Requires `REPLICATE_API_TOKEN` (or `REPLICATE_API_KEY`).
///
/// ## Errors
///
/// Returns an error if the token is missing, no image was produced, or the
/// output file cannot be written.
pub async fn handle_imagine(args: ImagineArgs) -> Result<()> {
    info!("Handling imagine command with args: {:?}", args);

    let config = load_config()?;
    let credentials = Credentials::from_env();
    let token = credentials.require_replicate()?;

    let prompt = args.prompt.join(" ");
    let client = ReplicateClient::new(&config.image, Some(token.to_string()));

    println!("🎨 Generating image for: {}", prompt);
    let path = generate_to_file(&client, &prompt, &args.output).await?;
    println!("✅ Image saved as {}", path.display());
    Ok(())
}

/// Generates images for `prompt` and writes the first one to `output`.
async fn generate_to_file(
    generator: &dyn ImageGenerator,
    prompt: &str,
    output: &Path,
) -> Result<PathBuf> {
    let result = generator.generate(prompt).await;
    let Some(first) = result.images.first() else {
        return Err(FurhiError::ImageGeneration(format!("no image produced for '{}'", prompt)).into());
    };
    if result.images.len() > 1 {
        info!(
            "{} images produced, keeping the first",
            result.images.len()
        );
    }

    let (_, bytes) = decode_data_uri(first)?;
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    tokio::fs::write(output, &bytes)
        .await
        .with_context(|| format!("Failed to write image: {}", output.display()))?;
    Ok(output.to_path_buf())
}
