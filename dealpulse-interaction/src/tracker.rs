//! Session-wide favorite bookkeeping shared by every screen.
//!
//! Screens load their lists independently, so a deal the user just
//! unfavorited can come back from a stale cache, and a deal they just
//! favorited is missing from a favorites list fetched earlier. The tracker
//! remembers both until the screen's data is fresh again.
//!
//! One tracker is created per signed-in session and handed to every
//! adapter; [`FavoriteTracker::reset`] is called at logout. Nothing is
//! persisted.
//!
//! Mutations are copy-on-write: each one builds a new [`TrackerSnapshot`]
//! and swaps it in, so a reader holding a snapshot never observes a
//! half-applied change.

use chrono::Utc;
use dealpulse_types::{EntityId, EntityKey, EntityKind, FavoriteSnapshot};
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// An immutable view of the tracker at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerSnapshot {
    unfavorited: HashSet<EntityKey>,
    newly_favorited: Vec<FavoriteSnapshot>,
}

impl TrackerSnapshot {
    /// Returns true if `key` was unfavorited locally this session.
    pub fn is_unfavorited(&self, key: &EntityKey) -> bool {
        self.unfavorited.contains(key)
    }

    /// Deals favorited locally and not yet seen in a server list, in the
    /// order they were favorited.
    pub fn newly_favorited(&self) -> &[FavoriteSnapshot] {
        &self.newly_favorited
    }

    /// Number of locally unfavorited entities.
    pub fn unfavorited_len(&self) -> usize {
        self.unfavorited.len()
    }

    fn newly_favorited_position(&self, id: &EntityId) -> Option<usize> {
        self.newly_favorited.iter().position(|s| &s.id == id)
    }
}

/// What the tracker knew about one entity, captured so a failed favorite
/// toggle can put it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TrackerEntry {
    unfavorited: bool,
    newly_favorited: Option<FavoriteSnapshot>,
}

/// Shared handle to the session's favorite bookkeeping.
///
/// Cloning is cheap; all clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct FavoriteTracker {
    current: Arc<RwLock<Arc<TrackerSnapshot>>>,
}

impl FavoriteTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<TrackerSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Builds a new snapshot from the current one and swaps it in.
    fn update(&self, f: impl FnOnce(&mut TrackerSnapshot)) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = TrackerSnapshot::clone(&guard);
        f(&mut next);
        *guard = Arc::new(next);
    }

    /// Records that the user unfavorited `key`.
    ///
    /// A deal cannot be both pending-favorited and unfavorited, so any
    /// newly-favorited snapshot for it is dropped.
    pub fn mark_unfavorited(&self, key: EntityKey) {
        debug!("Tracker: unfavorited {}", key);
        self.update(|s| {
            s.unfavorited.insert(key);
            if key.is_deal() {
                s.newly_favorited.retain(|f| f.id != key.id);
            }
        });
    }

    /// Records that the user favorited `key`.
    ///
    /// For deals, a supplied snapshot is kept (stamped with the current
    /// time) so favorites lists can show it before their next refetch.
    pub fn mark_favorited(&self, key: EntityKey, snapshot: Option<FavoriteSnapshot>) {
        debug!("Tracker: favorited {}", key);
        self.update(|s| {
            s.unfavorited.remove(&key);
            if key.is_deal()
                && let Some(mut snapshot) = snapshot
            {
                snapshot.id = key.id;
                snapshot.favorited_at = Utc::now();
                s.newly_favorited.retain(|f| f.id != key.id);
                s.newly_favorited.push(snapshot);
            }
        });
    }

    /// Returns true if `key` was unfavorited locally this session.
    pub fn is_unfavorited(&self, key: &EntityKey) -> bool {
        self.snapshot().is_unfavorited(key)
    }

    /// Deals favorited locally, in insertion order.
    pub fn list_newly_favorited(&self) -> Vec<FavoriteSnapshot> {
        self.snapshot().newly_favorited.clone()
    }

    /// Forgets local unfavorites, typically once a fresh server list lands.
    pub fn clear_unfavorited(&self) {
        self.update(|s| s.unfavorited.clear());
    }

    /// Forgets local favorites, typically after a screen merged them.
    pub fn clear_newly_favorited(&self) {
        self.update(|s| s.newly_favorited.clear());
    }

    /// Drops everything. Called at logout.
    pub fn reset(&self) {
        debug!("Tracker: reset");
        self.update(|s| *s = TrackerSnapshot::default());
    }

    /// Drops items of `kind` the user unfavorited locally.
    pub fn filter_unfavorited<T>(
        &self,
        kind: EntityKind,
        items: Vec<T>,
        id_of: impl Fn(&T) -> EntityId,
    ) -> Vec<T> {
        let snapshot = self.snapshot();
        items
            .into_iter()
            .filter(|item| !snapshot.is_unfavorited(&EntityKey::new(kind, id_of(item))))
            .collect()
    }

    /// Merges a server-fetched favorites list with local changes.
    ///
    /// Locally unfavorited deals are removed, locally favorited deals the
    /// server does not know about yet are added, and the result is ordered
    /// by `favorited_at`, newest first.
    pub fn merge_favorites(&self, server: Vec<FavoriteSnapshot>) -> Vec<FavoriteSnapshot> {
        let snapshot = self.snapshot();
        let mut merged: Vec<FavoriteSnapshot> = server
            .into_iter()
            .filter(|f| !snapshot.is_unfavorited(&EntityKey::deal(f.id)))
            .collect();

        for pending in snapshot.newly_favorited() {
            if !merged.iter().any(|f| f.id == pending.id) {
                merged.push(pending.clone());
            }
        }

        merged.sort_by(|a, b| b.favorited_at.cmp(&a.favorited_at));
        merged
    }

    pub(crate) fn entry(&self, key: &EntityKey) -> TrackerEntry {
        let snapshot = self.snapshot();
        TrackerEntry {
            unfavorited: snapshot.is_unfavorited(key),
            newly_favorited: snapshot
                .newly_favorited_position(&key.id)
                .filter(|_| key.is_deal())
                .map(|i| snapshot.newly_favorited[i].clone()),
        }
    }

    pub(crate) fn restore_entry(&self, key: EntityKey, entry: TrackerEntry) {
        debug!("Tracker: restoring {}", key);
        self.update(|s| {
            if entry.unfavorited {
                s.unfavorited.insert(key);
            } else {
                s.unfavorited.remove(&key);
            }
            if key.is_deal() {
                s.newly_favorited.retain(|f| f.id != key.id);
                if let Some(snapshot) = entry.newly_favorited {
                    s.newly_favorited.push(snapshot);
                }
            }
        });
    }
}
