//! Display-ready favorite snapshots.

use crate::EntityId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything a favorites list needs to render a deal the user just
/// favorited, before the server list has been refetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteSnapshot {
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_label: Option<String>,
    pub favorited_at: DateTime<Utc>,
}

impl FavoriteSnapshot {
    /// Creates a snapshot stamped with the current time.
    pub fn new(id: EntityId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            restaurant_name: None,
            image_url: None,
            price_label: None,
            favorited_at: Utc::now(),
        }
    }

    pub fn with_restaurant(mut self, name: impl Into<String>) -> Self {
        self.restaurant_name = Some(name.into());
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_price(mut self, label: impl Into<String>) -> Self {
        self.price_label = Some(label.into());
        self
    }

    /// Overrides the favorite timestamp.
    pub fn favorited_at(mut self, at: DateTime<Utc>) -> Self {
        self.favorited_at = at;
        self
    }
}
