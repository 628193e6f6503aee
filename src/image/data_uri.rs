//! Base64 data URIs, the in-memory representation of every image.

use crate::error::{Result, VisionaryError};
use crate::image::types::ImageFormat;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// An image embedded as `data:<mime>;base64,<payload>`.
///
/// Both parts are always non-empty. The payload is kept as base64 text since
/// that is what the service sends and expects; use [`DataUri::decode`] to get
/// raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataUri {
    mime_type: String,
    data: String,
}

impl DataUri {
    /// Wraps an existing base64 payload.
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Result<Self> {
        let mime_type = mime_type.into();
        let data = data.into();
        if mime_type.trim().is_empty() || data.trim().is_empty() {
            return Err(VisionaryError::Decode("Invalid image format".into()));
        }
        Ok(Self { mime_type, data })
    }

    /// Encodes raw bytes with the given mime type.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Result<Self> {
        Self::new(
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes),
        )
    }

    /// Reads an image file fully into a data URI.
    ///
    /// The mime type comes from the file's magic bytes, falling back to its
    /// extension. Anything that is not a recognised image is rejected.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let format = ImageFormat::from_magic_bytes(&bytes)
            .or_else(|| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .and_then(ImageFormat::from_extension)
            })
            .ok_or_else(|| {
                VisionaryError::InvalidRequest(format!(
                    "{} is not a supported image (JPG, PNG, WebP)",
                    path.display()
                ))
            })?;
        tracing::debug!(path = %path.display(), size = bytes.len(), mime = format.mime_type(), "loaded image file");
        Self::from_bytes(format.mime_type(), &bytes)
    }

    /// Mime type, e.g. `image/png`.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload without the `data:` prefix.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Image format implied by the mime type, if it is one we know.
    pub fn format(&self) -> Option<ImageFormat> {
        ImageFormat::from_mime_type(&self.mime_type)
    }

    /// Decodes the payload into raw bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map_err(|e| VisionaryError::Decode(e.to_string()))
    }
}

impl FromStr for DataUri {
    type Err = VisionaryError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || VisionaryError::Decode("Invalid image format".into());
        let rest = s.strip_prefix("data:").ok_or_else(invalid)?;
        let (mime_type, data) = rest.split_once(";base64,").ok_or_else(invalid)?;
        if mime_type.is_empty() || data.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }
}

impl TryFrom<String> for DataUri {
    type Error = VisionaryError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<DataUri> for String {
    fn from(uri: DataUri) -> Self {
        uri.to_string()
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.mime_type, self.data)
    }
}
