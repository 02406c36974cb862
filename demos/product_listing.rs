//! End-to-end example - analyze a product photo and generate two square images.
//!
//! Run with: `cargo run --example product_listing -- <product_photo.jpg>`
//!
//! Requires `GEMINI_API_KEY` (or `GOOGLE_API_KEY`) environment variable.

use productshot::{AspectRatio, GeminiClient, SourceImage, Workflow};

#[tokio::main]
async fn main() -> productshot::Result<()> {
    let input_path = std::env::args()
        .nth(1)
        .expect("Usage: product_listing <product_photo.jpg>");

    let workflow = Workflow::new(GeminiClient::builder().build()?);
    workflow.select_image(SourceImage::load(&input_path).await?).await?;

    let snapshot = workflow.snapshot();
    if let Some(analysis) = snapshot.analysis.as_deref() {
        println!("{}: {}", analysis.product_name, analysis.key_features.join(", "));
    }

    workflow.set_ratio(AspectRatio::Square);
    workflow.set_count(2);
    workflow.generate().await?;

    for image in workflow.snapshot().gallery {
        let path = image.save_to_dir(".")?;
        println!("Saved {} ({})", path.display(), image.style_name);
    }

    Ok(())
}
