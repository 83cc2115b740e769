use crate::classify::{Classification, MediaType};
use crate::store::{ContentId, ContentStore};
use serde::Serialize;
use std::collections::BTreeSet;

/// Metadata record registered with the catalog, using its field names.
#[derive(Debug, Clone, Serialize)]
pub struct MediaRecord {
    #[serde(rename = "Sha1")]
    pub content_hash: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Creator")]
    pub creator: String,
    #[serde(rename = "Tags")]
    pub tags: BTreeSet<i32>,
    #[serde(rename = "Timestamp")]
    pub timestamp: i64,
    #[serde(rename = "URL")]
    pub source_url: String,
    #[serde(rename = "URLThumb")]
    pub thumbnail_url: String,
    #[serde(rename = "Type")]
    pub media_type: MediaType,
    #[serde(rename = "Format")]
    pub format: String,
}

impl MediaRecord {
    /// Builds a record from identifiers the store has already handed out, so
    /// a record can never point at content that was not uploaded.
    pub fn new(
        store: &dyn ContentStore,
        original: &ContentId,
        thumbnail: &ContentId,
        classification: Classification,
    ) -> Self {
        Self {
            content_hash: original.to_string(),
            title: String::new(),
            creator: String::new(),
            tags: BTreeSet::new(),
            timestamp: 0,
            source_url: store.gateway_url(original),
            thumbnail_url: store.gateway_url(thumbnail),
            media_type: classification.media_type,
            format: classification.format,
        }
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title.unwrap_or_default();
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = i32>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }
}
