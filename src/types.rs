//! Core domain types: formats, ratios, analysis results and generated images.

use crate::error::{ProductShotError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Image formats accepted as source images or returned by the vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format.
    WebP,
    /// GIF format.
    Gif,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
            Self::Gif => "gif",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
        }
    }

    /// Parses a MIME type such as `image/jpeg`.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
            "image/gif" => Some(Self::Gif),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }

        None
    }
}

/// Aspect ratios offered for generated images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1 square, for standard image-and-text modules.
    #[serde(rename = "1:1")]
    Square,
    /// 16:9 banner, for header images and brand stories.
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 vertical, for mobile placements.
    #[serde(rename = "9:16")]
    Portrait,
    /// 3:4 portrait, emphasizes the product body.
    #[serde(rename = "3:4")]
    StandardPortrait,
    /// 4:3 standard landscape.
    #[serde(rename = "4:3")]
    Standard,
}

impl AspectRatio {
    /// Every supported ratio, in display order.
    pub const ALL: [AspectRatio; 5] = [
        Self::Landscape,
        Self::Square,
        Self::Portrait,
        Self::StandardPortrait,
        Self::Standard,
    ];

    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::StandardPortrait => "3:4",
            Self::Standard => "4:3",
        }
    }
}

impl std::fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = ProductShotError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == trimmed)
            .ok_or_else(|| {
                ProductShotError::InvalidRequest(format!(
                    "Invalid aspect ratio '{}'. Valid values: 1:1, 16:9, 9:16, 3:4, 4:3",
                    s
                ))
            })
    }
}

/// A visual treatment suggested by the vendor for this product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleOption {
    /// Identifier, unique within one analysis.
    pub id: String,
    /// Display name (Simplified Chinese).
    pub name: String,
    /// Short description of the vibe (Simplified Chinese).
    pub description: String,
    /// English keywords appended to the composition prompt.
    pub prompt_modifier: String,
}

/// Product identification and suggested styles returned by analysis.
///
/// All four fields are required when deserializing; a payload missing any of
/// them is rejected as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAnalysis {
    /// Product name and type.
    pub product_name: String,
    /// Visible key features, in order.
    pub key_features: Vec<String>,
    /// English visual description, reused in generation prompts.
    pub visual_description: String,
    /// Suggested styles, in vendor order.
    pub suggested_styles: Vec<StyleOption>,
}

impl ProductAnalysis {
    /// Looks up a suggested style by id.
    pub fn style(&self, id: &str) -> Option<&StyleOption> {
        self.suggested_styles.iter().find(|s| s.id == id)
    }

    /// The style selected by default after analysis.
    pub fn default_style(&self) -> Option<&StyleOption> {
        self.suggested_styles.first()
    }
}

/// Session configuration for the next generation batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    ratio: AspectRatio,
    count: u8,
    selected_style_id: Option<String>,
}

impl GenerationConfig {
    /// Smallest batch size.
    pub const MIN_COUNT: u8 = 1;
    /// Largest batch size.
    pub const MAX_COUNT: u8 = 4;
    /// Batch size before the user picks one.
    pub const DEFAULT_COUNT: u8 = 2;

    /// Returns the aspect ratio for the next batch.
    pub fn ratio(&self) -> AspectRatio {
        self.ratio
    }

    /// Returns the batch size, always within `MIN_COUNT..=MAX_COUNT`.
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Returns the selected style id, which may not resolve to a live style.
    pub fn selected_style_id(&self) -> Option<&str> {
        self.selected_style_id.as_deref()
    }

    /// Sets the aspect ratio.
    pub fn set_ratio(&mut self, ratio: AspectRatio) {
        self.ratio = ratio;
    }

    /// Sets the batch size, clamping it into range. Returns the stored value.
    pub fn set_count(&mut self, count: u32) -> u8 {
        let clamped = count.clamp(Self::MIN_COUNT as u32, Self::MAX_COUNT as u32) as u8;
        self.count = clamped;
        clamped
    }

    /// Selects a style by id, or clears the selection.
    pub fn select_style(&mut self, id: Option<String>) {
        self.selected_style_id = id;
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            ratio: AspectRatio::default(),
            count: Self::DEFAULT_COUNT,
            selected_style_id: None,
        }
    }
}

/// A generated marketing image. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[must_use = "generated image should be saved or displayed"]
pub struct GeneratedImage {
    /// Unique id: batch uuid plus ordinal.
    pub id: String,
    /// Image as a `data:` URI.
    pub url: String,
    /// Name of the style used, captured at generation time.
    pub style_name: String,
    /// Aspect ratio requested.
    pub ratio: AspectRatio,
    /// Creation time in Unix milliseconds.
    pub timestamp: i64,
}

impl GeneratedImage {
    /// Returns the image format declared by the data URI.
    pub fn format(&self) -> ImageFormat {
        parse_data_url(&self.url)
            .and_then(|(mime, _)| ImageFormat::from_mime_type(mime))
            .unwrap_or_default()
    }

    /// Decodes the data URI into raw image bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let (_, payload) = parse_data_url(&self.url).ok_or_else(|| {
            ProductShotError::Encoding(format!("image {} is not a base64 data URI", self.id))
        })?;
        base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| ProductShotError::Encoding(e.to_string()))
    }

    /// File name used when downloading this image.
    pub fn file_name(&self) -> String {
        format!("a-plus-{}.{}", self.id, self.format().extension())
    }

    /// Decodes and writes the image into `dir`, returning the written path.
    pub fn save_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join(self.file_name());
        std::fs::write(&path, self.decode()?)?;
        Ok(path)
    }
}

/// Splits `data:<mime>;base64,<payload>` into its MIME type and payload.
pub(crate) fn parse_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header.strip_suffix(";base64")?;
    Some((mime, payload))
}

/// Builds a `data:` URI from a MIME type and base64 payload.
pub(crate) fn to_data_url(mime: &str, payload: &str) -> String {
    format!("data:{};base64,{}", mime, payload)
}
