//! Product-owned media: images and videos.
//!
//! Only references are stored; the bytes live in an external media store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{DomainError, DomainResult, Entity, Timestamps, ValueObject};

use crate::product::ProductId;
use crate::reference::VideoProviderId;
use crate::validate;

catalog_core::uuid_id!(ProductImageId, "ProductImageId");
catalog_core::uuid_id!(ProductVideoId, "ProductVideoId");

/// Path (relative to the media root) or absolute URL of a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub const MAX_LEN: usize = 255;

    pub fn parse(input: &str) -> DomainResult<Self> {
        let value = validate::required_text("image", input, Self::MAX_LEN)?;
        if value.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("image reference cannot contain whitespace"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_absolute(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://") || self.0.starts_with('/')
    }

    /// Public URL of the image, joining relative paths onto `media_base_url`.
    pub fn url(&self, media_base_url: &str) -> String {
        if self.is_absolute() {
            return self.0.clone();
        }
        format!(
            "{}/{}",
            media_base_url.trim_end_matches('/'),
            self.0.trim_start_matches("./")
        )
    }
}

impl core::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for ImageRef {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDraft {
    pub product_id: ProductId,
    pub image: String,
    pub is_thumbnail: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub product_id: ProductId,
    pub image: ImageRef,
    pub is_thumbnail: bool,
    pub description: Option<String>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl ProductImage {
    pub fn create(draft: ImageDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: ProductImageId::new(),
            product_id: draft.product_id,
            image: ImageRef::parse(&draft.image)?,
            is_thumbnail: draft.is_thumbnail,
            description: validate::optional_text("description", draft.description.as_deref(), None)?,
            timestamps: Timestamps::at(now),
        })
    }
}

impl Entity for ProductImage {
    type Id = ProductImageId;

    fn id(&self) -> &ProductImageId {
        &self.id
    }

    fn recorded(&self) -> Timestamps {
        self.timestamps
    }
}

/// An http(s) link to a hosted video.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoLink(String);

impl VideoLink {
    pub const MAX_LEN: usize = 255;

    pub fn parse(input: &str) -> DomainResult<Self> {
        let value = validate::required_text("video_link", input, Self::MAX_LEN)?;
        let rest = value
            .strip_prefix("https://")
            .or_else(|| value.strip_prefix("http://"))
            .ok_or_else(|| DomainError::validation("video_link must be an http(s) URL"))?;
        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() || value.chars().any(char::is_whitespace) {
            return Err(DomainError::validation(format!("video_link is not a valid URL: {value:?}")));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VideoLink {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VideoLink> for String {
    fn from(value: VideoLink) -> Self {
        value.0
    }
}

impl core::fmt::Display for VideoLink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl ValueObject for VideoLink {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDraft {
    pub product_id: ProductId,
    pub provider_id: VideoProviderId,
    pub video_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVideo {
    pub id: ProductVideoId,
    pub product_id: ProductId,
    pub provider_id: VideoProviderId,
    pub video_link: Option<VideoLink>,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl ProductVideo {
    pub fn create(draft: VideoDraft, now: DateTime<Utc>) -> DomainResult<Self> {
        let video_link = match draft.video_link.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(link) => Some(VideoLink::parse(link)?),
        };
        Ok(Self {
            id: ProductVideoId::new(),
            product_id: draft.product_id,
            provider_id: draft.provider_id,
            video_link,
            timestamps: Timestamps::at(now),
        })
    }
}

impl Entity for ProductVideo {
    type Id = ProductVideoId;

    fn id(&self) -> &ProductVideoId {
        &self.id
    }

    fn recorded(&self) -> Timestamps {
        self.timestamps
    }
}
