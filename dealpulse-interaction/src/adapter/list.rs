//! Adapter for feed-style screens holding an ordered list of entities.
//!
//! The list is stored copy-on-write: every change publishes a new
//! `Arc<Vec<Arc<T>>>` in which only the touched element is a new
//! allocation. Readers keep whatever snapshot they took, and untouched
//! elements stay pointer-equal across updates.

use super::{Interactable, ListRole};
use crate::dispatch::{
    ActionFuture, ActionOutcome, Dispatcher, Prepared, SkipReason, lock, settle_tick,
};
use crate::port::{InteractionObserver, PersistencePort};
use crate::reconciler::ReconcileSink;
use crate::tracker::FavoriteTracker;
use dealpulse_types::{EntityId, EntityKey, InteractionAction, InteractionState, TransitionState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct PendingEntry {
    action: InteractionAction,
    transition: TransitionState,
}

struct ListInner<T> {
    items: Arc<Vec<Arc<T>>>,
    pending: HashMap<EntityId, PendingEntry>,
    /// Bumped by `replace_items`.
    generation: u64,
}

impl<T: Interactable> ListInner<T> {
    fn position(&self, id: &EntityId) -> Option<usize> {
        self.items.iter().position(|item| &item.entity_key().id == id)
    }

    fn replace_at(&mut self, index: usize, item: Arc<T>) {
        let mut next = Vec::clone(&self.items);
        next[index] = item;
        self.items = Arc::new(next);
    }

    fn remove_at(&mut self, index: usize) {
        let mut next = Vec::clone(&self.items);
        next.remove(index);
        self.items = Arc::new(next);
    }
}

/// Drives optimistic interactions on a list of screen values.
///
/// Each entity has its own pending gate; actions on different entities in
/// the same list run independently. Clones share the same list.
#[derive(Clone)]
pub struct ListInteractionAdapter<T> {
    inner: Arc<Mutex<ListInner<T>>>,
    dispatcher: Dispatcher,
    role: ListRole,
}

impl<T: Interactable> ListInteractionAdapter<T> {
    /// Creates a feed-role adapter.
    pub fn new(items: Vec<T>, port: Arc<dyn PersistencePort>, tracker: FavoriteTracker) -> Self {
        Self::with_role(items, ListRole::Feed, port, tracker)
    }

    pub fn with_role(
        items: Vec<T>,
        role: ListRole,
        port: Arc<dyn PersistencePort>,
        tracker: FavoriteTracker,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ListInner {
                items: Arc::new(items.into_iter().map(Arc::new).collect()),
                pending: HashMap::new(),
                generation: 0,
            })),
            dispatcher: Dispatcher::new(port, tracker),
            role,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn InteractionObserver>) -> Self {
        self.dispatcher.set_observer(observer);
        self
    }

    pub fn role(&self) -> ListRole {
        self.role
    }

    /// The current list snapshot.
    pub fn items(&self) -> Arc<Vec<Arc<T>>> {
        lock(&self.inner).items.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &EntityId) -> Option<Arc<T>> {
        let inner = lock(&self.inner);
        inner.position(id).map(|i| inner.items[i].clone())
    }

    pub fn state(&self, id: &EntityId) -> Option<InteractionState> {
        self.get(id).map(|item| item.interaction())
    }

    pub fn transition_state(&self, id: &EntityId) -> TransitionState {
        lock(&self.inner)
            .pending
            .get(id)
            .map(|p| p.transition)
            .unwrap_or_default()
    }

    pub fn pending_action(&self, id: &EntityId) -> Option<InteractionAction> {
        lock(&self.inner).pending.get(id).map(|p| p.action)
    }

    pub fn is_pending(&self, id: &EntityId) -> bool {
        self.transition_state(id).is_pending()
    }

    pub fn toggle_upvote(&self, id: EntityId) -> ActionFuture {
        self.dispatch(id, InteractionAction::Upvote)
    }

    pub fn toggle_downvote(&self, id: EntityId) -> ActionFuture {
        self.dispatch(id, InteractionAction::Downvote)
    }

    pub fn toggle_favorite(&self, id: EntityId) -> ActionFuture {
        self.dispatch(id, InteractionAction::Favorite)
    }

    /// Replaces the list with a freshly fetched one. In-flight results for
    /// the old list are discarded when they arrive.
    pub fn replace_items(&self, items: Vec<T>) {
        let mut inner = lock(&self.inner);
        if !inner.pending.is_empty() {
            debug!(
                "List refresh supersedes {} in-flight action(s)",
                inner.pending.len()
            );
        }
        inner.items = Arc::new(items.into_iter().map(Arc::new).collect());
        inner.pending.clear();
        inner.generation = inner.generation.wrapping_add(1);
    }

    /// Removes an entity. Returns true if it was present.
    pub fn remove(&self, id: &EntityId) -> bool {
        let mut inner = lock(&self.inner);
        let Some(index) = inner.position(id) else {
            return false;
        };
        inner.remove_at(index);
        true
    }

    /// Applies `action` to `id` optimistically and returns the backend
    /// half. Unknown ids and entities with an action in flight resolve
    /// immediately to [`ActionOutcome::Skipped`].
    pub fn dispatch(&self, id: EntityId, action: InteractionAction) -> ActionFuture {
        match self.begin(id, action) {
            Ok(flight) => ActionFuture::new(flight.settle()),
            Err(outcome) => ActionFuture::ready(outcome),
        }
    }

    fn begin(
        &self,
        id: EntityId,
        action: InteractionAction,
    ) -> Result<ListFlight<T>, ActionOutcome> {
        let mut inner = lock(&self.inner);
        if let Some(pending) = inner.pending.get(&id) {
            debug!(
                "Dropping {} on {}: {} still pending",
                action, id, pending.action
            );
            return Err(ActionOutcome::Skipped(SkipReason::AlreadyPending));
        }
        let Some(index) = inner.position(&id) else {
            debug!("Dropping {} on {}: not in list", action, id);
            return Err(ActionOutcome::Skipped(SkipReason::NotFound));
        };

        let original = inner.items[index].clone();
        let prepared = self.dispatcher.prepare(
            original.entity_key(),
            action,
            original.interaction(),
            original.favorite_snapshot(),
        );
        inner.replace_at(index, Arc::new(original.with_interaction(prepared.next)));
        inner.pending.insert(
            id,
            PendingEntry {
                action,
                transition: TransitionState::Pending,
            },
        );

        Ok(ListFlight {
            list: self.inner.clone(),
            dispatcher: self.dispatcher.clone(),
            prepared,
            id,
            original,
            generation: inner.generation,
            resolved: false,
        })
    }

    /// Updates one element in place if `f` returns a replacement.
    fn update_where(&self, id: &EntityId, f: impl FnOnce(&T) -> Option<T>) -> bool {
        let mut inner = lock(&self.inner);
        if inner.pending.contains_key(id) {
            debug!("Skipping remote update for {}: action pending", id);
            return false;
        }
        let Some(index) = inner.position(id) else {
            return false;
        };
        let Some(updated) = f(&inner.items[index]) else {
            return false;
        };
        inner.replace_at(index, Arc::new(updated));
        true
    }
}

impl<T: Interactable> ReconcileSink for ListInteractionAdapter<T> {
    fn apply_vote_count(&self, entity_id: EntityId, vote_count: i64) -> bool {
        self.update_where(&entity_id, |item| {
            let state = item.interaction();
            (state.vote_count != vote_count)
                .then(|| item.with_interaction(InteractionState { vote_count, ..state }))
        })
    }

    fn apply_favorite(&self, entity: EntityKey, favorited: bool) -> bool {
        if !favorited && self.role == ListRole::Favorites {
            let mut inner = lock(&self.inner);
            if inner.pending.contains_key(&entity.id) {
                debug!("Keeping {} in favorites: action pending", entity);
                return false;
            }
            let Some(index) = inner.position(&entity.id) else {
                return false;
            };
            if inner.items[index].entity_key() != entity {
                return false;
            }
            inner.remove_at(index);
            return true;
        }
        self.update_where(&entity.id, |item| {
            let state = item.interaction();
            (item.entity_key() == entity && state.is_favorited != favorited)
                .then(|| item.with_interaction(state.favorited(favorited)))
        })
    }
}

/// One list entity between its optimistic update and its return to `Idle`.
///
/// Dropping it always clears the entity's pending entry. If the backend
/// had not answered yet, the original element is put back as well.
struct ListFlight<T: Interactable> {
    list: Arc<Mutex<ListInner<T>>>,
    dispatcher: Dispatcher,
    prepared: Prepared,
    id: EntityId,
    original: Arc<T>,
    generation: u64,
    resolved: bool,
}

impl<T: Interactable> ListFlight<T> {
    async fn settle(mut self) -> ActionOutcome {
        let result = self.dispatcher.persist(&self.prepared).await;
        let Some(outcome) = self.resolve(result) else {
            return ActionOutcome::Superseded;
        };
        self.dispatcher.report(&self.prepared, &outcome);
        settle_tick().await;
        outcome
    }

    fn resolve(&mut self, result: Result<(), String>) -> Option<ActionOutcome> {
        let mut inner = lock(&self.list);
        if inner.generation != self.generation {
            debug!(
                "Discarding stale {} result for {}",
                self.prepared.action, self.id
            );
            return None;
        }
        self.resolved = true;

        let index = inner.position(&self.id);
        let (transition, outcome) = match result {
            Ok(()) => {
                let state = index
                    .map(|i| inner.items[i].interaction())
                    .unwrap_or(self.prepared.next);
                (TransitionState::Committed, ActionOutcome::Committed(state))
            }
            Err(message) => {
                if let Some(i) = index {
                    inner.replace_at(i, self.original.clone());
                }
                let outcome = ActionOutcome::RolledBack {
                    message,
                    restored: self.prepared.previous,
                };
                (TransitionState::RolledBack, outcome)
            }
        };
        if let Some(entry) = inner.pending.get_mut(&self.id) {
            entry.transition = transition;
        }
        Some(outcome)
    }
}

impl<T: Interactable> Drop for ListFlight<T> {
    fn drop(&mut self) {
        let mut inner = lock(&self.list);
        if inner.generation != self.generation {
            return;
        }
        if !self.resolved
            && let Some(index) = inner.position(&self.id)
        {
            inner.replace_at(index, self.original.clone());
        }
        inner.pending.remove(&self.id);
        drop(inner);

        if !self.resolved {
            self.dispatcher.abandoned(&self.prepared);
        }
    }
}
