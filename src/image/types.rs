//! Core types for image generation and editing.

use crate::error::{Result, VisionaryError};
use crate::image::data_uri::DataUri;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Supported image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Maps a MIME type back to a format.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_lowercase().as_str() {
            "image/png" => Some(Self::Png),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/webp" => Some(Self::WebP),
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

        None
    }
}

/// Aspect ratios the generation model accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    /// 1:1 square aspect ratio.
    #[default]
    #[serde(rename = "1:1")]
    Square,
    /// 16:9 landscape (widescreen) aspect ratio.
    #[serde(rename = "16:9")]
    Landscape,
    /// 9:16 portrait (tall) aspect ratio.
    #[serde(rename = "9:16")]
    Portrait,
    /// 4:3 standard landscape aspect ratio.
    #[serde(rename = "4:3")]
    StandardLandscape,
    /// 3:4 standard portrait aspect ratio.
    #[serde(rename = "3:4")]
    StandardPortrait,
}

impl AspectRatio {
    /// Every supported ratio, in selector order.
    pub const ALL: [AspectRatio; 5] = [
        Self::Square,
        Self::Landscape,
        Self::Portrait,
        Self::StandardLandscape,
        Self::StandardPortrait,
    ];

    /// Returns the aspect ratio as a string (e.g., "16:9").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Landscape => "16:9",
            Self::Portrait => "9:16",
            Self::StandardLandscape => "4:3",
            Self::StandardPortrait => "3:4",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = VisionaryError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|ratio| ratio.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(AspectRatio::as_str).collect();
                VisionaryError::InvalidRequest(format!(
                    "unsupported aspect ratio '{s}' (expected one of {})",
                    valid.join(", ")
                ))
            })
    }
}

/// Whether the user is creating a new image or modifying an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GenerationMode {
    /// Text to image.
    #[default]
    Generate,
    /// Instruction-driven edit of a source image.
    Edit,
}

impl GenerationMode {
    /// Label for the submit action in this mode.
    pub fn action_label(&self) -> &'static str {
        match self {
            Self::Generate => "Generate",
            Self::Edit => "Edit Image",
        }
    }

    /// Progress text shown while a request is in flight.
    pub fn progress_label(&self) -> &'static str {
        match self {
            Self::Generate => "Generating...",
            Self::Edit => "Editing...",
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => write!(f, "generate"),
            Self::Edit => write!(f, "edit"),
        }
    }
}

impl FromStr for GenerationMode {
    type Err = VisionaryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "generate" | "gen" => Ok(Self::Generate),
            "edit" => Ok(Self::Edit),
            other => Err(VisionaryError::InvalidRequest(format!(
                "unknown mode '{other}' (expected generate or edit)"
            ))),
        }
    }
}

/// A single outbound request: one prompt, one mode-specific input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRequest {
    /// Create a new image from text.
    Generate {
        /// Description of the desired image.
        prompt: String,
        /// Requested proportions of the output.
        aspect_ratio: AspectRatio,
    },
    /// Modify `source` following the instruction in `prompt`.
    Edit {
        /// Edit instruction.
        prompt: String,
        /// Image being edited.
        source: DataUri,
    },
}

impl GenerationRequest {
    /// Creates a text-to-image request.
    pub fn generate(prompt: impl Into<String>, aspect_ratio: AspectRatio) -> Self {
        Self::Generate {
            prompt: prompt.into(),
            aspect_ratio,
        }
    }

    /// Creates an edit request for `source`.
    pub fn edit(prompt: impl Into<String>, source: DataUri) -> Self {
        Self::Edit {
            prompt: prompt.into(),
            source,
        }
    }

    /// The prompt or edit instruction.
    pub fn prompt(&self) -> &str {
        match self {
            Self::Generate { prompt, .. } | Self::Edit { prompt, .. } => prompt,
        }
    }

    /// Which operation this request maps to.
    pub fn mode(&self) -> GenerationMode {
        match self {
            Self::Generate { .. } => GenerationMode::Generate,
            Self::Edit { .. } => GenerationMode::Edit,
        }
    }

    /// Requested aspect ratio; only text-to-image requests carry one.
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        match self {
            Self::Generate { aspect_ratio, .. } => Some(*aspect_ratio),
            Self::Edit { .. } => None,
        }
    }

    /// Rejects requests that must not reach the network.
    pub fn validate(&self) -> Result<()> {
        if self.prompt().trim().is_empty() {
            return Err(VisionaryError::InvalidRequest("prompt must not be blank".into()));
        }
        Ok(())
    }
}

/// A successful result kept in the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[must_use = "generated image should be stored or saved"]
pub struct GeneratedImage {
    /// Unique identifier.
    pub id: Uuid,
    /// Prompt that produced the image.
    pub prompt: String,
    /// The image itself.
    pub image_url: DataUri,
    /// Set only for text-to-image results.
    pub aspect_ratio: Option<AspectRatio>,
    /// When the result arrived.
    pub created_at: DateTime<Utc>,
}

impl GeneratedImage {
    /// Builds the history entry for a completed request.
    ///
    /// The aspect ratio is carried over from generate requests and left empty
    /// for edits.
    pub fn from_request(request: &GenerationRequest, image_url: DataUri) -> Result<Self> {
        request.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            prompt: request.prompt().to_string(),
            image_url,
            aspect_ratio: request.aspect_ratio(),
            created_at: Utc::now(),
        })
    }

    /// The file name used when saving this image locally.
    pub fn download_filename(&self) -> String {
        let ext = self
            .image_url
            .format()
            .map(|f| f.extension())
            .unwrap_or("jpg");
        format!("visionary-{}.{}", self.id, ext)
    }

    /// Decodes the image and writes it to disk.
    ///
    /// If `target` is an existing directory the file is created inside it
    /// under [`download_filename`](Self::download_filename); otherwise
    /// `target` is used as the file path. Returns the written path.
    pub fn save_to(&self, target: impl AsRef<Path>) -> Result<PathBuf> {
        let target = target.as_ref();
        let path = if target.is_dir() {
            target.join(self.download_filename())
        } else {
            target.to_path_buf()
        };
        let bytes = self.image_url.decode()?;
        std::fs::write(&path, &bytes)?;
        tracing::info!(path = %path.display(), size = bytes.len(), "saved image");
        Ok(path)
    }
}
