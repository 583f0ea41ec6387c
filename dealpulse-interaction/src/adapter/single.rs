//! Adapter for detail-style screens holding one entity value.

use super::Interactable;
use crate::cell::EntityCell;
use crate::dispatch::{ActionFuture, Dispatcher};
use crate::port::{InteractionObserver, PersistencePort};
use crate::reconciler::ReconcileSink;
use crate::tracker::FavoriteTracker;
use dealpulse_types::{EntityId, EntityKey, InteractionAction, InteractionState, TransitionState};
use std::sync::Arc;

/// Drives optimistic interactions on a single screen value.
///
/// A rollback restores the whole previous value, not just its interaction
/// fields. Clones share the same value.
#[derive(Clone)]
pub struct SingleEntityInteractionAdapter<T> {
    cell: EntityCell<T>,
}

impl<T: Interactable> SingleEntityInteractionAdapter<T> {
    pub fn new(entity: T, port: Arc<dyn PersistencePort>, tracker: FavoriteTracker) -> Self {
        Self {
            cell: EntityCell::new(entity, Dispatcher::new(port, tracker)),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn InteractionObserver>) -> Self {
        self.cell.set_observer(observer);
        self
    }

    /// The current value.
    pub fn entity(&self) -> T {
        self.cell.value()
    }

    pub fn state(&self) -> InteractionState {
        self.cell.value().interaction()
    }

    pub fn transition_state(&self) -> TransitionState {
        self.cell.transition_state()
    }

    pub fn pending_action(&self) -> Option<InteractionAction> {
        self.cell.pending_action()
    }

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

    pub fn dispatch(&self, action: InteractionAction) -> ActionFuture {
        self.cell.run(action)
    }

    /// Replaces the value with a freshly fetched one.
    pub fn reset(&self, entity: T) {
        self.cell.reset(entity);
    }
}

impl<T: Interactable> ReconcileSink for SingleEntityInteractionAdapter<T> {
    fn apply_vote_count(&self, entity_id: EntityId, vote_count: i64) -> bool {
        self.cell.merge_vote_count(entity_id, vote_count)
    }

    fn apply_favorite(&self, entity: EntityKey, favorited: bool) -> bool {
        self.cell.merge_favorite(entity, favorited)
    }
}
