//! Single-value optimistic cell behind the state machine and the
//! single-entity adapter.

use crate::adapter::Interactable;
use crate::dispatch::{
    ActionFuture, ActionOutcome, Dispatcher, Prepared, SkipReason, lock, settle_tick,
};
use crate::port::InteractionObserver;
use dealpulse_types::{EntityId, EntityKey, InteractionAction, InteractionState, TransitionState};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug)]
struct CellInner<T> {
    value: T,
    transition: TransitionState,
    pending: Option<InteractionAction>,
    rollback: Option<T>,
    /// Bumped by `reset`; results from older generations are discarded.
    generation: u64,
}

#[derive(Clone)]
pub(crate) struct EntityCell<T> {
    inner: Arc<Mutex<CellInner<T>>>,
    dispatcher: Dispatcher,
}

impl<T: Interactable> EntityCell<T> {
    pub(crate) fn new(value: T, dispatcher: Dispatcher) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CellInner {
                value,
                transition: TransitionState::Idle,
                pending: None,
                rollback: None,
                generation: 0,
            })),
            dispatcher,
        }
    }

    pub(crate) fn set_observer(&mut self, observer: Arc<dyn InteractionObserver>) {
        self.dispatcher.set_observer(observer);
    }

    pub(crate) fn value(&self) -> T {
        lock(&self.inner).value.clone()
    }

    pub(crate) fn update_value(&self, f: impl FnOnce(&T) -> T) {
        let mut inner = lock(&self.inner);
        inner.value = f(&inner.value);
    }

    pub(crate) fn transition_state(&self) -> TransitionState {
        lock(&self.inner).transition
    }

    pub(crate) fn pending_action(&self) -> Option<InteractionAction> {
        lock(&self.inner).pending
    }

    /// Replaces the value wholesale and returns to `Idle`. An in-flight
    /// call keeps running but its result is ignored.
    pub(crate) fn reset(&self, value: T) {
        let mut inner = lock(&self.inner);
        if let Some(action) = inner.pending {
            debug!(
                "Reset of {} supersedes in-flight {}",
                value.entity_key(),
                action
            );
        }
        inner.value = value;
        inner.transition = TransitionState::Idle;
        inner.pending = None;
        inner.rollback = None;
        inner.generation = inner.generation.wrapping_add(1);
    }

    /// Runs the synchronous half of `action` and returns the backend half.
    pub(crate) fn run(&self, action: InteractionAction) -> ActionFuture {
        match self.begin(action) {
            Ok(flight) => ActionFuture::new(flight.settle()),
            Err(outcome) => ActionFuture::ready(outcome),
        }
    }

    fn begin(&self, action: InteractionAction) -> Result<InFlight<T>, ActionOutcome> {
        let mut inner = lock(&self.inner);
        if let Some(pending) = inner.pending {
            debug!(
                "Dropping {} on {}: {} still pending",
                action,
                inner.value.entity_key(),
                pending
            );
            return Err(ActionOutcome::Skipped(SkipReason::AlreadyPending));
        }

        let current = inner.value.clone();
        let prepared = self.dispatcher.prepare(
            current.entity_key(),
            action,
            current.interaction(),
            current.favorite_snapshot(),
        );
        inner.value = current.with_interaction(prepared.next);
        inner.rollback = Some(current);
        inner.transition = TransitionState::Pending;
        inner.pending = Some(action);

        Ok(InFlight {
            cell: self.inner.clone(),
            dispatcher: self.dispatcher.clone(),
            prepared,
            generation: inner.generation,
            resolved: false,
        })
    }

    /// Applies an authoritative vote count. Skipped while an action is in
    /// flight so the optimistic guess is not clobbered.
    pub(crate) fn merge_vote_count(&self, entity_id: EntityId, vote_count: i64) -> bool {
        let mut inner = lock(&self.inner);
        if inner.value.entity_key().id != entity_id {
            return false;
        }
        if inner.pending.is_some() {
            debug!("Skipping remote vote count for {}: action pending", entity_id);
            return false;
        }
        let state = inner.value.interaction();
        if state.vote_count == vote_count {
            return false;
        }
        inner.value = inner.value.with_interaction(InteractionState { vote_count, ..state });
        true
    }

    /// Applies a server-confirmed favorite flag.
    pub(crate) fn merge_favorite(&self, entity: EntityKey, favorited: bool) -> bool {
        let mut inner = lock(&self.inner);
        if inner.value.entity_key() != entity {
            return false;
        }
        if inner.pending.is_some() {
            debug!("Skipping remote favorite for {}: action pending", entity);
            return false;
        }
        let state = inner.value.interaction();
        if state.is_favorited == favorited {
            return false;
        }
        inner.value = inner.value.with_interaction(state.favorited(favorited));
        true
    }
}

/// An action between its optimistic update and its return to `Idle`.
///
/// Dropping it always releases the gate. If the backend had not answered
/// yet, the previous value is restored as well.
struct InFlight<T: Interactable> {
    cell: Arc<Mutex<CellInner<T>>>,
    dispatcher: Dispatcher,
    prepared: Prepared,
    generation: u64,
    /// Set once the backend result has been applied.
    resolved: bool,
}

impl<T: Interactable> InFlight<T> {
    async fn settle(mut self) -> ActionOutcome {
        let result = self.dispatcher.persist(&self.prepared).await;
        let Some(outcome) = self.resolve(result) else {
            return ActionOutcome::Superseded;
        };
        self.dispatcher.report(&self.prepared, &outcome);
        settle_tick().await;
        outcome
    }

    /// Applies the backend result. `None` if the cell was reset meanwhile.
    fn resolve(&mut self, result: Result<(), String>) -> Option<ActionOutcome> {
        let mut inner = lock(&self.cell);
        if inner.generation != self.generation {
            debug!(
                "Discarding stale {} result for {}",
                self.prepared.action, self.prepared.entity
            );
            return None;
        }
        self.resolved = true;

        Some(match result {
            Ok(()) => {
                inner.transition = TransitionState::Committed;
                inner.rollback = None;
                ActionOutcome::Committed(inner.value.interaction())
            }
            Err(message) => {
                if let Some(previous) = inner.rollback.take() {
                    inner.value = previous;
                }
                inner.transition = TransitionState::RolledBack;
                ActionOutcome::RolledBack {
                    message,
                    restored: inner.value.interaction(),
                }
            }
        })
    }
}

impl<T: Interactable> Drop for InFlight<T> {
    fn drop(&mut self) {
        let mut inner = lock(&self.cell);
        if inner.generation != self.generation {
            return;
        }
        if !self.resolved
            && let Some(previous) = inner.rollback.take()
        {
            inner.value = previous;
        }
        inner.transition = TransitionState::Idle;
        inner.pending = None;
        drop(inner);

        if !self.resolved {
            self.dispatcher.abandoned(&self.prepared);
        }
    }
}
