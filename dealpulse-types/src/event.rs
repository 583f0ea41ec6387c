//! Realtime change-feed payloads.
//!
//! The backend pushes two kinds of row changes to subscribed clients:
//! inserts on the interactions table (votes, clicks and views from any
//! user) and inserts/deletes on the current user's favorites.

use crate::{EntityId, EntityKey, EntityKind, UserId};
use serde::{Deserialize, Serialize};

/// The type column of an interaction row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    Upvote,
    Downvote,
    Click,
    View,
}

impl InteractionType {
    /// Returns true for interactions that change a vote count.
    #[must_use]
    pub const fn is_vote(&self) -> bool {
        matches!(self, Self::Upvote | Self::Downvote)
    }
}

/// A new interaction row, authored by any user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteInteractionEvent {
    pub entity_id: EntityId,
    pub actor_user_id: UserId,
    pub interaction_type: InteractionType,
}

/// Row-level change kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Delete,
}

/// A favorite row was inserted or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteChangedEvent {
    pub event_kind: ChangeKind,
    pub user_id: UserId,
    pub entity_id: EntityId,
    pub entity_kind: EntityKind,
}

impl FavoriteChangedEvent {
    /// The favorited entity, qualified by kind.
    #[must_use]
    pub const fn entity_key(&self) -> EntityKey {
        EntityKey::new(self.entity_kind, self.entity_id)
    }
}

/// An inbound realtime event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    VoteInteraction(VoteInteractionEvent),
    FavoriteChanged(FavoriteChangedEvent),
}

impl RealtimeEvent {
    /// Shorthand for a vote-interaction event.
    pub fn vote(entity_id: EntityId, actor_user_id: UserId, interaction_type: InteractionType) -> Self {
        Self::VoteInteraction(VoteInteractionEvent {
            entity_id,
            actor_user_id,
            interaction_type,
        })
    }

    /// Shorthand for a favorite-changed event.
    pub fn favorite(event_kind: ChangeKind, user_id: UserId, key: EntityKey) -> Self {
        Self::FavoriteChanged(FavoriteChangedEvent {
            event_kind,
            user_id,
            entity_id: key.id,
            entity_kind: key.kind,
        })
    }

    /// The entity this event concerns.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        match self {
            Self::VoteInteraction(e) => e.entity_id,
            Self::FavoriteChanged(e) => e.entity_id,
        }
    }

    /// Parses an event from its JSON wire form.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the event to JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
