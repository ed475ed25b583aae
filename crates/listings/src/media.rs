//! Image and tag value objects attached to a listing.

use serde::{Deserialize, Serialize};

/// URL reference to an externally stored image.
///
/// Invariant: at most one primary image per listing; the first uploaded image
/// is the primary by convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemImage {
    pub url: String,
    pub is_primary: bool,
}

impl ItemImage {
    pub fn primary(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_primary: true,
        }
    }

    pub fn secondary(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_primary: false,
        }
    }
}

/// Build an ordered image set from URLs, marking the first as primary.
pub fn image_set(urls: Vec<String>) -> Vec<ItemImage> {
    urls.into_iter()
        .enumerate()
        .map(|(i, url)| {
            if i == 0 {
                ItemImage::primary(url)
            } else {
                ItemImage::secondary(url)
            }
        })
        .collect()
}

/// Case-insensitively deduplicated, lowercase tag set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<String>);

impl TagSet {
    /// Normalize raw tag input: trim, lowercase, drop empties, dedup
    /// preserving first-seen order.
    pub fn normalize(raw: impl IntoIterator<Item = String>) -> Self {
        let mut tags: Vec<String> = Vec::new();
        for tag in raw {
            let tag = tag.trim().to_lowercase();
            if tag.is_empty() || tags.contains(&tag) {
                continue;
            }
            tags.push(tag);
        }
        Self(tags)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
