//! Per-entity optimistic state machine.
//!
//! ```text
//!            toggle_*()                 Ok(true)
//!   Idle ──────────────────▶ Pending ───────────────▶ Committed ──tick──▶ Idle
//!     ▲                        │
//!     │                        │ Ok(false) / Err(_)
//!     │                        ▼
//!     └───────tick────────  RolledBack (previous state restored)
//! ```
//!
//! A toggle updates the state as soon as it is called, before the returned
//! [`ActionFuture`] is polled, so the screen re-renders with the optimistic
//! value immediately. While an action is in flight any further toggle on
//! the same entity is dropped. Dropping the future before it completes
//! restores the previous state and reopens the gate.
//!
//! [`InteractionStateMachine::reset_state`] is the escape hatch for fresh
//! server data. It does not cancel the backend call already issued; the
//! call's result is discarded when it arrives and the toggle resolves to
//! [`ActionOutcome::Superseded`](crate::ActionOutcome::Superseded).

use crate::adapter::Interactable;
use crate::cell::EntityCell;
use crate::dispatch::{ActionFuture, Dispatcher};
use crate::port::{InteractionObserver, PersistencePort};
use crate::reconciler::ReconcileSink;
use crate::tracker::FavoriteTracker;
use dealpulse_types::{
    EntityId, EntityKey, FavoriteSnapshot, InteractionAction, InteractionState, TransitionState,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct TrackedEntity {
    key: EntityKey,
    state: InteractionState,
    snapshot: Option<FavoriteSnapshot>,
}

impl Interactable for TrackedEntity {
    fn entity_key(&self) -> EntityKey {
        self.key
    }

    fn interaction(&self) -> InteractionState {
        self.state
    }

    fn with_interaction(&self, state: InteractionState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    fn favorite_snapshot(&self) -> Option<FavoriteSnapshot> {
        self.snapshot.clone()
    }
}

/// Optimistic interaction state for one deal or restaurant.
///
/// Clones share the same state.
#[derive(Clone)]
pub struct InteractionStateMachine {
    cell: EntityCell<TrackedEntity>,
}

impl InteractionStateMachine {
    /// Creates a machine in the `Idle` state.
    pub fn new(
        entity: EntityKey,
        initial: InteractionState,
        port: Arc<dyn PersistencePort>,
        tracker: FavoriteTracker,
    ) -> Self {
        let value = TrackedEntity {
            key: entity,
            state: initial,
            snapshot: None,
        };
        Self {
            cell: EntityCell::new(value, Dispatcher::new(port, tracker)),
        }
    }

    /// Sets the commit/error callbacks.
    pub fn with_observer(mut self, observer: Arc<dyn InteractionObserver>) -> Self {
        self.cell.set_observer(observer);
        self
    }

    /// Sets the snapshot shown in favorites lists when this deal is
    /// favorited.
    pub fn with_favorite_snapshot(self, snapshot: FavoriteSnapshot) -> Self {
        self.cell.update_value(|v| TrackedEntity {
            snapshot: Some(snapshot),
            ..v.clone()
        });
        self
    }

    pub fn entity(&self) -> EntityKey {
        self.cell.value().key
    }

    /// Current state, optimistic while an action is pending.
    pub fn state(&self) -> InteractionState {
        self.cell.value().state
    }

    pub fn transition_state(&self) -> TransitionState {
        self.cell.transition_state()
    }

    /// The action in flight. Stays set through `Committed`/`RolledBack`
    /// until the machine is back to `Idle`.
    pub fn pending_action(&self) -> Option<InteractionAction> {
        self.cell.pending_action()
    }

    /// True while the backend call is outstanding.
    pub fn is_pending(&self) -> bool {
        self.transition_state().is_pending()
    }

    pub fn toggle_upvote(&self) -> ActionFuture {
        self.cell.run(InteractionAction::Upvote)
    }

    pub fn toggle_downvote(&self) -> ActionFuture {
        self.cell.run(InteractionAction::Downvote)
    }

    pub fn toggle_favorite(&self) -> ActionFuture {
        self.cell.run(InteractionAction::Favorite)
    }

    /// Runs `action`.
    pub fn dispatch(&self, action: InteractionAction) -> ActionFuture {
        self.cell.run(action)
    }

    /// Replaces the state with authoritative server data, returns to `Idle`
    /// and forgets any pending action and rollback snapshot.
    pub fn reset_state(&self, new_state: InteractionState) {
        let current = self.cell.value();
        self.cell.reset(current.with_interaction(new_state));
    }
}

impl ReconcileSink for InteractionStateMachine {
    fn apply_vote_count(&self, entity_id: EntityId, vote_count: i64) -> bool {
        self.cell.merge_vote_count(entity_id, vote_count)
    }

    fn apply_favorite(&self, entity: EntityKey, favorited: bool) -> bool {
        self.cell.merge_favorite(entity, favorited)
    }
}
