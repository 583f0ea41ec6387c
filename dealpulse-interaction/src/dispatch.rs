//! The optimistic dispatch path shared by every interaction surface.
//!
//! A surface (state machine, list, single entity) owns its container and
//! the pending gate. Computing the optimistic state, touching the favorite
//! tracker, calling the backend and reporting the outcome all go through
//! [`Dispatcher`] so every surface behaves the same.
//!
//! A toggle is split in two. The synchronous half runs when the toggle is
//! called: gate check, optimistic update, tracker mark. The returned
//! [`ActionFuture`] owns the rest. It is `'static`, so it can be spawned,
//! and dropping it before it completes restores the previous state.

use crate::arithmetic;
use crate::error::SERVER_OPERATION_FAILED;
use crate::port::{InteractionObserver, NoopObserver, PersistencePort};
use crate::tracker::{FavoriteTracker, TrackerEntry};
use dealpulse_types::{EntityKey, FavoriteSnapshot, InteractionAction, InteractionState};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tracing::{debug, info, warn};

/// Why an action was not dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another action on the same entity is still in flight.
    AlreadyPending,
    /// The list does not contain the entity.
    NotFound,
}

/// What happened to a toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The backend confirmed the optimistic state.
    Committed(InteractionState),
    /// The backend refused; `restored` is the state put back.
    RolledBack {
        message: String,
        restored: InteractionState,
    },
    /// Nothing was dispatched.
    Skipped(SkipReason),
    /// The surface was reset while the call was in flight; its result was
    /// discarded.
    Superseded,
}

impl ActionOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Self::RolledBack { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// The backend half of a toggle.
///
/// The optimistic update has already been applied when this is returned.
/// Awaiting it waits for the backend and settles the surface; dropping it
/// first abandons the action and puts the previous state back.
#[must_use = "dropping an action future abandons the action and restores the previous state"]
pub struct ActionFuture {
    inner: Pin<Box<dyn Future<Output = ActionOutcome> + Send>>,
}

impl ActionFuture {
    pub(crate) fn new(future: impl Future<Output = ActionOutcome> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(future),
        }
    }

    /// A future that resolves immediately, for actions that were skipped.
    pub(crate) fn ready(outcome: ActionOutcome) -> Self {
        Self::new(std::future::ready(outcome))
    }
}

impl Future for ActionFuture {
    type Output = ActionOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<ActionOutcome> {
        self.inner.as_mut().poll(cx)
    }
}

impl fmt::Debug for ActionFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionFuture").finish_non_exhaustive()
    }
}

/// An action whose optimistic state has been computed and whose tracker
/// side effect has been applied.
#[derive(Debug, Clone)]
pub(crate) struct Prepared {
    pub(crate) entity: EntityKey,
    pub(crate) action: InteractionAction,
    pub(crate) previous: InteractionState,
    pub(crate) next: InteractionState,
    tracker_entry: Option<TrackerEntry>,
}

#[derive(Clone)]
pub(crate) struct Dispatcher {
    port: Arc<dyn PersistencePort>,
    tracker: FavoriteTracker,
    observer: Arc<dyn InteractionObserver>,
}

impl Dispatcher {
    pub(crate) fn new(port: Arc<dyn PersistencePort>, tracker: FavoriteTracker) -> Self {
        Self {
            port,
            tracker,
            observer: Arc::new(NoopObserver),
        }
    }

    pub(crate) fn set_observer(&mut self, observer: Arc<dyn InteractionObserver>) {
        self.observer = observer;
    }

    /// Computes the optimistic state and, for favorites, updates the
    /// tracker from the pre-toggle flag so other screens see the change
    /// before the backend answers.
    pub(crate) fn prepare(
        &self,
        entity: EntityKey,
        action: InteractionAction,
        previous: InteractionState,
        snapshot: Option<FavoriteSnapshot>,
    ) -> Prepared {
        let next = arithmetic::next_state(action, &previous);

        let tracker_entry = (action == InteractionAction::Favorite).then(|| {
            let entry = self.tracker.entry(&entity);
            if previous.is_favorited {
                self.tracker.mark_unfavorited(entity);
            } else {
                self.tracker.mark_favorited(entity, snapshot);
            }
            entry
        });

        debug!(
            "Optimistic {} on {}: count {} -> {}",
            action, entity, previous.vote_count, next.vote_count
        );

        Prepared {
            entity,
            action,
            previous,
            next,
            tracker_entry,
        }
    }

    /// Calls the backend. `Err` carries the rollback message.
    pub(crate) async fn persist(&self, prepared: &Prepared) -> Result<(), String> {
        let result = match prepared.action {
            InteractionAction::Upvote => self.port.set_upvote(prepared.entity.id).await,
            InteractionAction::Downvote => self.port.set_downvote(prepared.entity.id).await,
            InteractionAction::Favorite => {
                self.port
                    .set_favorite(prepared.entity, prepared.previous.is_favorited)
                    .await
            }
        };

        match result {
            Ok(true) => Ok(()),
            Ok(false) => Err(SERVER_OPERATION_FAILED.to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Logs a settled outcome and notifies the observer. Rolled-back
    /// favorites also revert their tracker mark.
    pub(crate) fn report(&self, prepared: &Prepared, outcome: &ActionOutcome) {
        match outcome {
            ActionOutcome::Committed(state) => {
                if prepared.action == InteractionAction::Favorite {
                    info!(
                        "Favorite on {} committed (favorited={})",
                        prepared.entity, state.is_favorited
                    );
                } else {
                    debug!("{} on {} committed", prepared.action, prepared.entity);
                }
                self.observer.on_commit(prepared.entity, prepared.action, state);
            }
            ActionOutcome::RolledBack { message, .. } => {
                self.restore_tracker(prepared);
                warn!(
                    "{} on {} rolled back: {}",
                    prepared.action, prepared.entity, message
                );
                self.observer.on_error(prepared.entity, message, prepared.action);
            }
            ActionOutcome::Skipped(_) | ActionOutcome::Superseded => {}
        }
    }

    /// The action future was dropped before the backend answered. The
    /// surface has already put its previous value back; this reverts the
    /// tracker. No observer callback fires.
    pub(crate) fn abandoned(&self, prepared: &Prepared) {
        self.restore_tracker(prepared);
        warn!(
            "{} on {} abandoned before the backend answered; previous state restored",
            prepared.action, prepared.entity
        );
    }

    fn restore_tracker(&self, prepared: &Prepared) {
        if let Some(entry) = prepared.tracker_entry.clone() {
            self.tracker.restore_entry(prepared.entity, entry);
        }
    }
}

/// Yields once so observers can see `Committed`/`RolledBack` before the
/// surface returns to `Idle`.
pub(crate) async fn settle_tick() {
    tokio::task::yield_now().await;
}

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
