//! Per-entity interaction state and the actions that change it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the current user has done to a deal, plus its net vote count.
///
/// At most one of `is_upvoted` / `is_downvoted` is set. `vote_count` is the
/// net score across all users and may go negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionState {
    pub is_upvoted: bool,
    pub is_downvoted: bool,
    pub is_favorited: bool,
    pub vote_count: i64,
}

impl InteractionState {
    /// A fresh state with no votes from the current user.
    #[must_use]
    pub const fn with_count(vote_count: i64) -> Self {
        Self {
            is_upvoted: false,
            is_downvoted: false,
            is_favorited: false,
            vote_count,
        }
    }

    #[must_use]
    pub const fn upvoted(vote_count: i64) -> Self {
        Self {
            is_upvoted: true,
            ..Self::with_count(vote_count)
        }
    }

    #[must_use]
    pub const fn downvoted(vote_count: i64) -> Self {
        Self {
            is_downvoted: true,
            ..Self::with_count(vote_count)
        }
    }

    /// Returns a copy with the favorite flag set to `favorited`.
    #[must_use]
    pub const fn favorited(self, favorited: bool) -> Self {
        Self {
            is_favorited: favorited,
            ..self
        }
    }

    /// Returns true if the vote flags are mutually exclusive.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        !(self.is_upvoted && self.is_downvoted)
    }
}

/// A user action that goes through the optimistic pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionAction {
    Upvote,
    Downvote,
    Favorite,
}

impl InteractionAction {
    pub const ALL: [Self; 3] = [Self::Upvote, Self::Downvote, Self::Favorite];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
            Self::Downvote => "downvote",
            Self::Favorite => "favorite",
        }
    }
}

impl fmt::Display for InteractionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an entity is in the optimistic lifecycle.
///
/// ```text
/// Idle -> Pending -> Committed  -> Idle
///                 \-> RolledBack -> Idle
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransitionState {
    #[default]
    Idle,
    Pending,
    Committed,
    RolledBack,
}

impl TransitionState {
    /// Returns true while a persistence call is outstanding.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}
