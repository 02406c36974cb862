//! The user-supplied product photo.

use crate::error::{ProductShotError, Result};
use crate::types::{parse_data_url, to_data_url, ImageFormat};
use base64::Engine;
use std::path::Path;
use std::sync::Arc;

/// An immutable product photo with its format.
///
/// Cloning is cheap; the bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    data: Arc<[u8]>,
    format: ImageFormat,
    name: Option<String>,
}

impl SourceImage {
    /// Creates a source image, detecting the format from magic bytes.
    ///
    /// Input that is not a recognized image is rejected with
    /// [`ProductShotError::Encoding`].
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Result<Self> {
        let data = data.into();
        let format = ImageFormat::from_magic_bytes(&data).ok_or_else(|| {
            ProductShotError::Encoding("not a PNG, JPEG, WebP or GIF image".into())
        })?;
        Ok(Self {
            data: data.into(),
            format,
            name: None,
        })
    }

    /// Creates a source image with an explicitly declared MIME type.
    pub fn with_mime_type(data: impl Into<Vec<u8>>, mime_type: &str) -> Result<Self> {
        let format = ImageFormat::from_mime_type(mime_type).ok_or_else(|| {
            ProductShotError::Encoding(format!("unsupported image type '{}'", mime_type))
        })?;
        Ok(Self {
            data: data.into().into(),
            format,
            name: None,
        })
    }

    /// Reads a source image from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await.map_err(|e| {
            ProductShotError::Encoding(format!("failed to read {}: {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        Ok(Self::from_bytes(data)?.with_name(name))
    }

    /// Decodes a source image from a `data:` URI or bare base64.
    ///
    /// Whitespace and missing padding are tolerated.
    pub fn from_data_url(input: &str) -> Result<Self> {
        let (mime, payload) = match parse_data_url(input.trim()) {
            Some((mime, payload)) => (Some(mime), payload),
            None => (None, input),
        };

        let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let data = base64::engine::general_purpose::STANDARD
            .decode(&cleaned)
            .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(&cleaned))
            .map_err(|e| ProductShotError::Encoding(format!("invalid base64: {}", e)))?;

        match mime {
            Some(mime) => Self::with_mime_type(data, mime),
            None => Self::from_bytes(data),
        }
    }

    fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Raw image bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Image format.
    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// MIME type sent alongside the bytes.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// File name the image was loaded from, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Size of the image data in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Base64 payload for embedding in a JSON request, without any
    /// `data:` prefix.
    pub fn encode_to_transfer_form(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// The image as a displayable `data:` URI.
    pub fn to_data_url(&self) -> String {
        to_data_url(self.mime_type(), &self.encode_to_transfer_form())
    }
}
