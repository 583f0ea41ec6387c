//! Core type definitions for the DealPulse interaction core.
//!
//! This crate holds the plain data shared by every surface of the app:
//! - Entity and user identifiers (UUID)
//! - Per-deal interaction state (vote flags, vote count, favorite flag)
//! - The actions a user can take and the transition states they move through
//! - Display-ready favorite snapshots
//! - Realtime change-feed payloads
//!
//! Behaviour (vote arithmetic, optimistic dispatch, reconciliation) lives in
//! `dealpulse-interaction`.

mod event;
mod ids;
mod interaction;
mod snapshot;

pub use event::{
    ChangeKind, FavoriteChangedEvent, InteractionType, RealtimeEvent, VoteInteractionEvent,
};
pub use ids::{EntityId, EntityKey, EntityKind, UserId};
pub use interaction::{InteractionAction, InteractionState, TransitionState};
pub use snapshot::FavoriteSnapshot;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
