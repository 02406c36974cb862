#![warn(missing_docs)]
//! ProductShot - marketing images from a single product photo.
//!
//! A product photo is sent to Gemini for analysis, which names the product,
//! lists its key features and suggests visual styles. A batch of marketing
//! images is then synthesized in the chosen style and aspect ratio, using the
//! photo as the visual reference.
//!
//! # Quick Start
//!
//! ```no_run
//! use productshot::{AspectRatio, GeminiClient, SourceImage, Workflow};
//!
//! #[tokio::main]
//! async fn main() -> productshot::Result<()> {
//!     let client = GeminiClient::builder().build()?;
//!     let workflow = Workflow::new(client);
//!
//!     let photo = SourceImage::load("mug.jpg").await?;
//!     workflow.select_image(photo).await?;
//!
//!     workflow.set_ratio(AspectRatio::Square);
//!     workflow.set_count(3);
//!     workflow.generate().await?;
//!
//!     for image in workflow.snapshot().gallery {
//!         image.save_to_dir(".")?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Layers
//!
//! - [`vendor`]: the [`VendorClient`] seam and the Gemini transport adapter
//! - [`workflow`]: the session state machine (`Idle → Analyzing → Ready → Generating`)
//! - [`types`] and [`source`]: domain data
//!
//! # Features
//!
//! - `cli` (default): the `productshot` command-line host

mod error;
pub mod prompt;
pub mod source;
pub mod types;
pub mod vendor;
pub mod workflow;

// Re-export error types at crate root
pub use error::{ProductShotError, Result};

pub use source::SourceImage;
pub use types::{
    AspectRatio, GeneratedImage, GenerationConfig, ImageFormat, ProductAnalysis, StyleOption,
};
pub use vendor::{GeminiClient, GeminiClientBuilder, GeminiImageModel, SynthesisRequest, VendorClient};
pub use workflow::{Outcome, Phase, Snapshot, Workflow};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{ProductShotError, Result};
    pub use crate::source::SourceImage;
    pub use crate::types::{AspectRatio, GeneratedImage, ProductAnalysis, StyleOption};
    pub use crate::vendor::{GeminiClient, VendorClient};
    pub use crate::workflow::{Outcome, Phase, Snapshot, Workflow};
}
