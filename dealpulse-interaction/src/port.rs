//! Ports to the backend and to the screens.
//!
//! The core never talks to the network itself. Persistence and vote
//! lookups go through these traits so the hosted backend, an offline queue
//! or a test double can sit behind them.

use crate::error::{PersistenceResult, ReconcileResult};
use async_trait::async_trait;
use dealpulse_types::{EntityId, EntityKey, InteractionAction, InteractionState};
use serde::{Deserialize, Serialize};

/// Writes interaction changes to the backend.
///
/// Each call returns `Ok(true)` on success. `Ok(false)` and `Err(_)` both
/// trigger a rollback.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    /// Toggles the current user's upvote on a deal.
    async fn set_upvote(&self, entity_id: EntityId) -> PersistenceResult<bool>;

    /// Toggles the current user's downvote on a deal.
    async fn set_downvote(&self, entity_id: EntityId) -> PersistenceResult<bool>;

    /// Toggles a favorite. `previously_favorited` is the flag before the tap.
    async fn set_favorite(
        &self,
        entity: EntityKey,
        previously_favorited: bool,
    ) -> PersistenceResult<bool>;
}

/// Authoritative vote totals for one deal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub upvotes: u32,
    pub downvotes: u32,
}

impl VoteTally {
    pub const fn new(upvotes: u32, downvotes: u32) -> Self {
        Self { upvotes, downvotes }
    }

    /// Net score (`upvotes - downvotes`).
    pub fn net(&self) -> i64 {
        i64::from(self.upvotes) - i64::from(self.downvotes)
    }
}

/// Reads authoritative vote totals when another user votes.
#[async_trait]
pub trait VoteCountSource: Send + Sync {
    async fn fetch_vote_tally(&self, entity_id: EntityId) -> ReconcileResult<VoteTally>;
}

/// Callbacks for the screen that owns an interaction surface.
///
/// Invoked outside of any internal lock, so implementations may read the
/// surface they observe.
pub trait InteractionObserver: Send + Sync {
    /// The backend confirmed `action`; `state` is the committed state.
    fn on_commit(&self, entity: EntityKey, action: InteractionAction, state: &InteractionState) {
        let _ = (entity, action, state);
    }

    /// The backend rejected `action` and the previous state was restored.
    fn on_error(&self, entity: EntityKey, message: &str, action: InteractionAction) {
        let _ = (entity, message, action);
    }
}

/// Observer that ignores every callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl InteractionObserver for NoopObserver {}

/// Test doubles for the ports.
pub mod mock {
    use super::*;
    use crate::dispatch::lock;
    use crate::error::{PersistenceError, ReconcileError};
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Semaphore;

    /// A recorded persistence call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PersistCall {
        Upvote(EntityId),
        Downvote(EntityId),
        Favorite {
            entity: EntityKey,
            previously_favorited: bool,
        },
    }

    /// A scripted persistence reply.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MockReply {
        /// `Ok(true)`
        Accept,
        /// `Ok(false)`
        Decline,
        /// `Err(_)`
        Fail(PersistenceError),
    }

    impl MockReply {
        fn into_result(self) -> PersistenceResult<bool> {
            match self {
                Self::Accept => Ok(true),
                Self::Decline => Ok(false),
                Self::Fail(e) => Err(e),
            }
        }
    }

    /// In-memory persistence port with scripted replies.
    ///
    /// Queued replies are used first, then the fallback. A gated mock
    /// holds every call until [`release`](Self::release) hands out a permit,
    /// which lets tests look at the pending state.
    #[derive(Debug)]
    pub struct MockPersistence {
        calls: Mutex<Vec<PersistCall>>,
        replies: Mutex<VecDeque<MockReply>>,
        fallback: MockReply,
        gate: Option<Arc<Semaphore>>,
    }

    impl MockPersistence {
        fn with_fallback(fallback: MockReply) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(VecDeque::new()),
                fallback,
                gate: None,
            }
        }

        /// Every call succeeds.
        pub fn accepting() -> Self {
            Self::with_fallback(MockReply::Accept)
        }

        /// Every call returns `Ok(false)`.
        pub fn declining() -> Self {
            Self::with_fallback(MockReply::Decline)
        }

        /// Every call raises `error`.
        pub fn failing(error: PersistenceError) -> Self {
            Self::with_fallback(MockReply::Fail(error))
        }

        /// Holds calls until released.
        pub fn gated(mut self) -> Self {
            self.gate = Some(Arc::new(Semaphore::new(0)));
            self
        }

        /// Queues replies used before the fallback.
        pub fn with_replies(self, replies: impl IntoIterator<Item = MockReply>) -> Self {
            lock(&self.replies).extend(replies);
            self
        }

        /// Queues one more reply.
        pub fn push_reply(&self, reply: MockReply) {
            lock(&self.replies).push_back(reply);
        }

        /// Lets `n` held calls proceed.
        pub fn release(&self, n: usize) {
            if let Some(gate) = &self.gate {
                gate.add_permits(n);
            }
        }

        /// Calls made so far, in order.
        pub fn calls(&self) -> Vec<PersistCall> {
            lock(&self.calls).clone()
        }

        pub fn call_count(&self) -> usize {
            lock(&self.calls).len()
        }

        async fn respond(&self, call: PersistCall) -> PersistenceResult<bool> {
            lock(&self.calls).push(call);

            if let Some(gate) = &self.gate {
                match gate.acquire().await {
                    Ok(permit) => permit.forget(),
                    Err(_) => return Err(PersistenceError::Network("gate closed".into())),
                }
            }

            let reply = lock(&self.replies)
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            reply.into_result()
        }
    }

    #[async_trait]
    impl PersistencePort for MockPersistence {
        async fn set_upvote(&self, entity_id: EntityId) -> PersistenceResult<bool> {
            self.respond(PersistCall::Upvote(entity_id)).await
        }

        async fn set_downvote(&self, entity_id: EntityId) -> PersistenceResult<bool> {
            self.respond(PersistCall::Downvote(entity_id)).await
        }

        async fn set_favorite(
            &self,
            entity: EntityKey,
            previously_favorited: bool,
        ) -> PersistenceResult<bool> {
            self.respond(PersistCall::Favorite {
                entity,
                previously_favorited,
            })
            .await
        }
    }

    /// In-memory vote source.
    #[derive(Debug, Default)]
    pub struct MockVoteSource {
        tallies: Mutex<HashMap<EntityId, VoteTally>>,
        failure: Mutex<Option<ReconcileError>>,
        fetches: Mutex<Vec<EntityId>>,
    }

    impl MockVoteSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_tally(&self, entity_id: EntityId, tally: VoteTally) {
            lock(&self.tallies).insert(entity_id, tally);
        }

        /// Makes every subsequent fetch fail with `error`.
        pub fn fail_with(&self, error: ReconcileError) {
            *lock(&self.failure) = Some(error);
        }

        /// Entities fetched so far, in order.
        pub fn fetches(&self) -> Vec<EntityId> {
            lock(&self.fetches).clone()
        }
    }

    #[async_trait]
    impl VoteCountSource for MockVoteSource {
        async fn fetch_vote_tally(&self, entity_id: EntityId) -> ReconcileResult<VoteTally> {
            lock(&self.fetches).push(entity_id);
            if let Some(error) = lock(&self.failure).clone() {
                return Err(error);
            }
            lock(&self.tallies)
                .get(&entity_id)
                .copied()
                .ok_or_else(|| ReconcileError::Source(format!("no tally for {entity_id}")))
        }
    }

    /// A callback seen by [`RecordingObserver`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Observed {
        Commit {
            entity: EntityKey,
            action: InteractionAction,
            state: InteractionState,
        },
        Error {
            entity: EntityKey,
            message: String,
            action: InteractionAction,
        },
    }

    /// Observer that records every callback.
    #[derive(Debug, Default)]
    pub struct RecordingObserver {
        events: Mutex<Vec<Observed>>,
    }

    impl RecordingObserver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<Observed> {
            lock(&self.events).clone()
        }

        pub fn commits(&self) -> Vec<(InteractionAction, InteractionState)> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Observed::Commit { action, state, .. } => Some((action, state)),
                    Observed::Error { .. } => None,
                })
                .collect()
        }

        pub fn errors(&self) -> Vec<(String, InteractionAction)> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Observed::Error { message, action, .. } => Some((message, action)),
                    Observed::Commit { .. } => None,
                })
                .collect()
        }
    }

    impl InteractionObserver for RecordingObserver {
        fn on_commit(&self, entity: EntityKey, action: InteractionAction, state: &InteractionState) {
            lock(&self.events).push(Observed::Commit {
                entity,
                action,
                state: *state,
            });
        }

        fn on_error(&self, entity: EntityKey, message: &str, action: InteractionAction) {
            lock(&self.events).push(Observed::Error {
                entity,
                message: message.to_string(),
                action,
            });
        }
    }
}
