//! Optimistic interaction engine for DealPulse.
//!
//! Lets a user upvote, downvote or favorite a deal and see the result
//! immediately, while the change is persisted in the background and rolled
//! back if the backend refuses it. Screens that load their data
//! independently are kept consistent through a shared favorite tracker and
//! realtime change-feed reconciliation.
//!
//! # Architecture
//!
//! - **Arithmetic**: pure vote/favorite transitions, the single source of
//!   truth for every surface
//! - **Tracker**: session-wide record of local favorites and unfavorites
//! - **State machine**: per-entity `Idle → Pending → Committed/RolledBack`
//!   lifecycle with a one-action-at-a-time gate
//! - **Adapters**: the same lifecycle over a list or a single screen value
//! - **Reconciler**: applies push events from other users and devices
//!
//! All surfaces are meant to be driven from one cooperative executor. Locks
//! are only held for short synchronous sections, never across an await.
//!
//! # Example
//!
//! ```
//! use dealpulse_interaction::mock::MockPersistence;
//! use dealpulse_interaction::{FavoriteTracker, InteractionStateMachine};
//! use dealpulse_types::{EntityId, EntityKey, InteractionState};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let tracker = FavoriteTracker::new();
//! let machine = InteractionStateMachine::new(
//!     EntityKey::deal(EntityId::new()),
//!     InteractionState::with_count(5),
//!     Arc::new(MockPersistence::accepting()),
//!     tracker,
//! );
//!
//! let outcome = machine.toggle_upvote().await;
//! assert!(outcome.is_committed());
//! assert_eq!(machine.state().vote_count, 6);
//! # }
//! ```

pub mod adapter;
pub mod arithmetic;
mod cell;
mod config;
mod dispatch;
mod error;
mod machine;
pub mod port;
pub mod reconciler;
pub mod tracker;

pub use adapter::{Interactable, ListInteractionAdapter, ListRole, SingleEntityInteractionAdapter};
pub use arithmetic::{
    compute_downvote_toggle, compute_favorite_toggle, compute_upvote_toggle, next_state,
};
pub use config::{DEFAULT_DEDUPE_WINDOW_MS, ReconcilerConfig};
pub use dispatch::{ActionFuture, ActionOutcome, SkipReason};
pub use error::{
    PersistenceError, PersistenceResult, ReconcileError, ReconcileResult, SERVER_OPERATION_FAILED,
};
pub use machine::InteractionStateMachine;
pub use port::{
    InteractionObserver, NoopObserver, PersistencePort, VoteCountSource, VoteTally, mock,
};
pub use reconciler::{
    DedupeKind, DedupeWindow, IgnoreReason, RealtimeReconciler, ReconcileOutcome, ReconcileSink,
    SinkId,
};
pub use tracker::{FavoriteTracker, TrackerSnapshot};
