//! Realtime reconciliation.
//!
//! Applies push events from the backend change feed to every registered
//! surface:
//!
//! 1. Clicks and views are ignored; only votes move counts.
//! 2. Votes authored by the current user are ignored. The optimistic path
//!    already applied them and the echo would count them twice.
//! 3. Favorite events for other users are ignored.
//! 4. Repeats of the same `(entity, event kind)` inside the dedupe window
//!    are suppressed.
//! 5. A vote from another user refetches the authoritative tally and
//!    updates `vote_count` only; the current user's own flags never change.
//! 6. A favorite insert sets the flag; a delete clears it, drops the entity
//!    from favorites lists and marks it unfavorited in the tracker so stale
//!    caches elsewhere do not bring it back.
//!
//! Failures are logged and swallowed. A missed update is repaired by the
//! next refresh.

use crate::config::ReconcilerConfig;
use crate::dispatch::lock;
use crate::error::ReconcileError;
use crate::port::VoteCountSource;
use crate::tracker::FavoriteTracker;
use dealpulse_types::{
    ChangeKind, EntityId, EntityKey, FavoriteChangedEvent, RealtimeEvent, UserId,
    VoteInteractionEvent,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// A surface that accepts server-side changes.
pub trait ReconcileSink: Send + Sync {
    /// Sets the net vote count of `entity_id`. Returns true if anything
    /// changed.
    fn apply_vote_count(&self, entity_id: EntityId, vote_count: i64) -> bool;

    /// Sets (or clears) the favorite flag of `entity`. Returns true if
    /// anything changed.
    fn apply_favorite(&self, entity: EntityKey, favorited: bool) -> bool;
}

/// Handle returned by [`RealtimeReconciler::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

/// Event kinds tracked by the dedupe window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DedupeKind {
    Vote,
    FavoriteInsert,
    FavoriteDelete,
}

/// Suppresses repeats of the same `(entity, kind)` within a fixed window.
#[derive(Debug)]
pub struct DedupeWindow {
    window: Duration,
    seen: HashMap<(EntityId, DedupeKind), Instant>,
}

impl DedupeWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// Returns true if the event should be processed, recording it.
    pub fn admit(&mut self, entity_id: EntityId, kind: DedupeKind, now: Instant) -> bool {
        let window = self.window;
        self.seen.retain(|_, at| now.duration_since(*at) < window);

        if self.seen.contains_key(&(entity_id, kind)) {
            return false;
        }
        self.seen.insert((entity_id, kind), now);
        true
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Why an event was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// A click or view.
    NotAVote,
    /// Authored by the current user.
    OwnAction,
    /// A favorite event for someone else.
    OtherUser,
    /// Inside the dedupe window.
    Duplicate,
    /// Vote refetching is disabled in the config.
    RefetchDisabled,
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Applied; `surfaces` is how many sinks changed.
    Applied { surfaces: usize },
    Ignored(IgnoreReason),
    /// Logged and swallowed.
    Failed(ReconcileError),
}

/// Applies realtime events to registered surfaces.
pub struct RealtimeReconciler {
    current_user: UserId,
    config: ReconcilerConfig,
    source: Arc<dyn VoteCountSource>,
    tracker: FavoriteTracker,
    sinks: RwLock<Vec<(SinkId, Arc<dyn ReconcileSink>)>>,
    next_sink_id: AtomicU64,
    dedupe: Mutex<DedupeWindow>,
}

impl RealtimeReconciler {
    pub fn new(
        current_user: UserId,
        config: ReconcilerConfig,
        source: Arc<dyn VoteCountSource>,
        tracker: FavoriteTracker,
    ) -> Self {
        let dedupe = DedupeWindow::new(config.dedupe_window());
        Self {
            current_user,
            config,
            source,
            tracker,
            sinks: RwLock::new(Vec::new()),
            next_sink_id: AtomicU64::new(0),
            dedupe: Mutex::new(dedupe),
        }
    }

    pub fn current_user(&self) -> UserId {
        self.current_user
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Registers a surface to receive server-side changes.
    pub fn register(&self, sink: Arc<dyn ReconcileSink>) -> SinkId {
        let id = SinkId(self.next_sink_id.fetch_add(1, Ordering::Relaxed));
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, sink));
        info!("Registered realtime sink {:?}", id);
        id
    }

    /// Unregisters a surface. Returns true if it was registered.
    pub fn unregister(&self, id: SinkId) -> bool {
        let mut sinks = self.sinks.write().unwrap_or_else(PoisonError::into_inner);
        let before = sinks.len();
        sinks.retain(|(sink_id, _)| *sink_id != id);
        sinks.len() != before
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn sinks(&self) -> Vec<Arc<dyn ReconcileSink>> {
        self.sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, sink)| sink.clone())
            .collect()
    }

    fn admit(&self, entity_id: EntityId, kind: DedupeKind) -> bool {
        lock(&self.dedupe).admit(entity_id, kind, Instant::now())
    }

    /// Handles one event.
    pub async fn handle(&self, event: &RealtimeEvent) -> ReconcileOutcome {
        match event {
            RealtimeEvent::VoteInteraction(vote) => self.handle_vote(vote).await,
            RealtimeEvent::FavoriteChanged(favorite) => self.handle_favorite(favorite),
        }
    }

    async fn handle_vote(&self, event: &VoteInteractionEvent) -> ReconcileOutcome {
        if !event.interaction_type.is_vote() {
            return ReconcileOutcome::Ignored(IgnoreReason::NotAVote);
        }
        if event.actor_user_id == self.current_user {
            debug!("Ignoring own vote echo on {}", event.entity_id);
            return ReconcileOutcome::Ignored(IgnoreReason::OwnAction);
        }
        if !self.admit(event.entity_id, DedupeKind::Vote) {
            debug!("Suppressing repeated vote event on {}", event.entity_id);
            return ReconcileOutcome::Ignored(IgnoreReason::Duplicate);
        }
        if !self.config.refetch_on_vote {
            return ReconcileOutcome::Ignored(IgnoreReason::RefetchDisabled);
        }

        let tally = match self.source.fetch_vote_tally(event.entity_id).await {
            Ok(tally) => tally,
            Err(e) => {
                warn!("Failed to refresh votes for {}: {}", event.entity_id, e);
                return ReconcileOutcome::Failed(e);
            }
        };

        let vote_count = tally.net();
        let surfaces = self
            .sinks()
            .iter()
            .filter(|sink| sink.apply_vote_count(event.entity_id, vote_count))
            .count();
        debug!(
            "Vote count for {} is now {} ({} surface(s) updated)",
            event.entity_id, vote_count, surfaces
        );
        ReconcileOutcome::Applied { surfaces }
    }

    fn handle_favorite(&self, event: &FavoriteChangedEvent) -> ReconcileOutcome {
        if event.user_id != self.current_user {
            return ReconcileOutcome::Ignored(IgnoreReason::OtherUser);
        }
        let key = event.entity_key();
        let (kind, favorited) = match event.event_kind {
            ChangeKind::Insert => (DedupeKind::FavoriteInsert, true),
            ChangeKind::Delete => (DedupeKind::FavoriteDelete, false),
        };
        if !self.admit(key.id, kind) {
            debug!("Suppressing repeated favorite event on {}", key);
            return ReconcileOutcome::Ignored(IgnoreReason::Duplicate);
        }

        if favorited {
            self.tracker.mark_favorited(key, None);
        } else {
            self.tracker.mark_unfavorited(key);
        }

        let surfaces = self
            .sinks()
            .iter()
            .filter(|sink| sink.apply_favorite(key, favorited))
            .count();
        debug!(
            "Favorite {} on {} applied to {} surface(s)",
            if favorited { "insert" } else { "delete" },
            key,
            surfaces
        );
        ReconcileOutcome::Applied { surfaces }
    }

    /// Drains `events` until the sender side closes. Returns the number of
    /// events handled.
    pub async fn run(&self, mut events: mpsc::Receiver<RealtimeEvent>) -> usize {
        info!("Realtime reconciler started for user {}", self.current_user);
        let mut handled = 0;
        while let Some(event) = events.recv().await {
            self.handle(&event).await;
            handled += 1;
        }
        info!("Realtime reconciler stopped after {} event(s)", handled);
        handled
    }
}
