//! Attachment content classification.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Coarse content type of a stored attachment.
///
/// `OversizeText` is the overflow carrier for message bodies that exceed the
/// inline storage limit; it is never treated as media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    OversizeText,
    Image,
    AnimatedImage,
    Video,
    Audio,
    File,
}

impl ContentType {
    /// Visual/audio media — what a gallery view would show.
    pub fn is_media(self) -> bool {
        matches!(
            self,
            ContentType::Image | ContentType::AnimatedImage | ContentType::Video | ContentType::Audio
        )
    }

    pub fn is_oversize_text(self) -> bool {
        self == ContentType::OversizeText
    }

    /// Column codec — stored as a plain string in the attachments table.
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::OversizeText => "oversize_text",
            ContentType::Image => "image",
            ContentType::AnimatedImage => "animated_image",
            ContentType::Video => "video",
            ContentType::Audio => "audio",
            ContentType::File => "file",
        }
    }

    pub fn parse(s: &str) -> Result<Self, ModelError> {
        match s {
            "oversize_text" => Ok(ContentType::OversizeText),
            "image" => Ok(ContentType::Image),
            "animated_image" => Ok(ContentType::AnimatedImage),
            "video" => Ok(ContentType::Video),
            "audio" => Ok(ContentType::Audio),
            "file" => Ok(ContentType::File),
            other => Err(ModelError::UnknownContentType(other.to_string())),
        }
    }
}
