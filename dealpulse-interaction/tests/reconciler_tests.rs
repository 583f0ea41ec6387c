mod common;

use common::{Deal, init_tracing, sample_feed};
use dealpulse_interaction::mock::{MockPersistence, MockVoteSource};
use dealpulse_interaction::{
    FavoriteTracker, IgnoreReason, InteractionStateMachine, ListInteractionAdapter, ListRole,
    RealtimeReconciler, ReconcileError, ReconcileOutcome, ReconcilerConfig, VoteTally,
};
use dealpulse_types::{
    ChangeKind, EntityId, EntityKey, InteractionState, InteractionType, RealtimeEvent, UserId,
};
use futures::poll;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Harness {
    me: UserId,
    source: Arc<MockVoteSource>,
    tracker: FavoriteTracker,
    reconciler: RealtimeReconciler,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(ReconcilerConfig::default())
    }

    fn with_config(config: ReconcilerConfig) -> Self {
        init_tracing();
        let me = UserId::new();
        let source = Arc::new(MockVoteSource::new());
        let tracker = FavoriteTracker::new();
        let reconciler = RealtimeReconciler::new(me, config, source.clone(), tracker.clone());
        Self {
            me,
            source,
            tracker,
            reconciler,
        }
    }

    fn feed(&self) -> Arc<ListInteractionAdapter<Deal>> {
        let list = Arc::new(ListInteractionAdapter::new(
            sample_feed(),
            Arc::new(MockPersistence::accepting()),
            self.tracker.clone(),
        ));
        self.reconciler.register(list.clone());
        list
    }
}

#[tokio::test]
async fn own_vote_echo_is_ignored() {
    let h = Harness::new();
    let list = h.feed();
    let id = list.items()[0].id;
    list.toggle_upvote(id).await;

    let outcome = h
        .reconciler
        .handle(&RealtimeEvent::vote(id, h.me, InteractionType::Upvote))
        .await;

    assert_eq!(outcome, ReconcileOutcome::Ignored(IgnoreReason::OwnAction));
    assert!(h.source.fetches().is_empty());
    assert_eq!(list.state(&id), Some(InteractionState::upvoted(6)));
}

#[tokio::test]
async fn clicks_and_views_are_ignored() {
    let h = Harness::new();
    let id = EntityId::new();

    for kind in [InteractionType::Click, InteractionType::View] {
        let outcome = h
            .reconciler
            .handle(&RealtimeEvent::vote(id, UserId::new(), kind))
            .await;
        assert_eq!(outcome, ReconcileOutcome::Ignored(IgnoreReason::NotAVote));
    }
    assert!(h.source.fetches().is_empty());
}

#[tokio::test]
async fn other_users_vote_updates_count_only() {
    let h = Harness::new();
    let list = h.feed();
    let id = list.items()[1].id;
    h.source.set_tally(id, VoteTally::new(20, 3));

    let outcome = h
        .reconciler
        .handle(&RealtimeEvent::vote(id, UserId::new(), InteractionType::Downvote))
        .await;

    assert_eq!(outcome, ReconcileOutcome::Applied { surfaces: 1 });
    assert_eq!(h.source.fetches(), vec![id]);
    assert_eq!(list.state(&id), Some(InteractionState::upvoted(17)));
}

#[tokio::test]
async fn vote_count_reaches_every_surface() {
    let h = Harness::new();
    let list = h.feed();
    let deal = list.items()[0].clone();
    let detail = Arc::new(InteractionStateMachine::new(
        deal.key(),
        deal.state,
        Arc::new(MockPersistence::accepting()),
        h.tracker.clone(),
    ));
    h.reconciler.register(detail.clone());
    h.source.set_tally(deal.id, VoteTally::new(9, 1));

    let outcome = h
        .reconciler
        .handle(&RealtimeEvent::vote(deal.id, UserId::new(), InteractionType::Upvote))
        .await;

    assert_eq!(outcome, ReconcileOutcome::Applied { surfaces: 2 });
    assert_eq!(detail.state().vote_count, 8);
    assert_eq!(list.state(&deal.id).map(|s| s.vote_count), Some(8));
}

#[tokio::test(start_paused = true)]
async fn repeated_events_inside_window_are_suppressed() {
    let h = Harness::new();
    let id = EntityId::new();
    h.source.set_tally(id, VoteTally::new(1, 0));
    let event = RealtimeEvent::vote(id, UserId::new(), InteractionType::Upvote);

    assert!(matches!(
        h.reconciler.handle(&event).await,
        ReconcileOutcome::Applied { .. }
    ));

    tokio::time::advance(Duration::from_millis(400)).await;
    assert_eq!(
        h.reconciler.handle(&event).await,
        ReconcileOutcome::Ignored(IgnoreReason::Duplicate)
    );
    assert_eq!(h.source.fetches().len(), 1);

    tokio::time::advance(Duration::from_millis(700)).await;
    assert!(matches!(
        h.reconciler.handle(&event).await,
        ReconcileOutcome::Applied { .. }
    ));
    assert_eq!(h.source.fetches().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn dedupe_is_per_entity_and_kind() {
    let h = Harness::new();
    let a = EntityId::new();
    let b = EntityId::new();
    h.source.set_tally(a, VoteTally::new(1, 0));
    h.source.set_tally(b, VoteTally::new(1, 0));
    let other = UserId::new();

    h.reconciler
        .handle(&RealtimeEvent::vote(a, other, InteractionType::Upvote))
        .await;
    let on_b = h
        .reconciler
        .handle(&RealtimeEvent::vote(b, other, InteractionType::Upvote))
        .await;
    assert!(matches!(on_b, ReconcileOutcome::Applied { .. }));

    let insert = h
        .reconciler
        .handle(&RealtimeEvent::favorite(
            ChangeKind::Insert,
            h.me,
            EntityKey::deal(a),
        ))
        .await;
    assert!(matches!(insert, ReconcileOutcome::Applied { .. }));

    let delete = h
        .reconciler
        .handle(&RealtimeEvent::favorite(
            ChangeKind::Delete,
            h.me,
            EntityKey::deal(a),
        ))
        .await;
    assert!(matches!(delete, ReconcileOutcome::Applied { .. }));
}

#[tokio::test]
async fn refetch_failure_is_swallowed() {
    let h = Harness::new();
    let list = h.feed();
    let id = list.items()[0].id;
    h.source
        .fail_with(ReconcileError::Source("connection reset".into()));

    let outcome = h
        .reconciler
        .handle(&RealtimeEvent::vote(id, UserId::new(), InteractionType::Upvote))
        .await;

    assert_eq!(
        outcome,
        ReconcileOutcome::Failed(ReconcileError::Source("connection reset".into()))
    );
    assert_eq!(list.state(&id), Some(InteractionState::with_count(5)));
}

#[tokio::test]
async fn refetch_can_be_disabled() {
    let h = Harness::with_config(ReconcilerConfig {
        refetch_on_vote: false,
        ..ReconcilerConfig::default()
    });
    let id = EntityId::new();

    let outcome = h
        .reconciler
        .handle(&RealtimeEvent::vote(id, UserId::new(), InteractionType::Upvote))
        .await;

    assert_eq!(
        outcome,
        ReconcileOutcome::Ignored(IgnoreReason::RefetchDisabled)
    );
    assert!(h.source.fetches().is_empty());
}

#[tokio::test]
async fn pending_surfaces_are_left_alone() {
    let h = Harness::new();
    let port = Arc::new(MockPersistence::accepting().gated());
    let list = Arc::new(ListInteractionAdapter::new(
        sample_feed(),
        port.clone(),
        h.tracker.clone(),
    ));
    h.reconciler.register(list.clone());
    let id = list.items()[0].id;
    h.source.set_tally(id, VoteTally::new(40, 0));

    let fut = list.toggle_upvote(id);
    tokio::pin!(fut);
    assert!(poll!(fut.as_mut()).is_pending());

    let outcome = h
        .reconciler
        .handle(&RealtimeEvent::vote(id, UserId::new(), InteractionType::Upvote))
        .await;

    assert_eq!(outcome, ReconcileOutcome::Applied { surfaces: 0 });
    assert_eq!(list.state(&id), Some(InteractionState::upvoted(6)));

    port.release(1);
    fut.await;
}

// ── Favorites ────────────────────────────────────────────────────

#[tokio::test]
async fn favorite_delete_from_another_device() {
    let h = Harness::new();
    let feed = h.feed();
    let favorites = Arc::new(ListInteractionAdapter::with_role(
        feed.items().iter().map(|d| (**d).clone()).collect(),
        ListRole::Favorites,
        Arc::new(MockPersistence::accepting()),
        h.tracker.clone(),
    ));
    h.reconciler.register(favorites.clone());
    let deal = feed.items()[2].clone();
    assert!(deal.state.is_favorited);

    let outcome = h
        .reconciler
        .handle(&RealtimeEvent::favorite(ChangeKind::Delete, h.me, deal.key()))
        .await;

    assert_eq!(outcome, ReconcileOutcome::Applied { surfaces: 2 });
    assert!(h.tracker.is_unfavorited(&deal.key()));
    assert!(!feed.state(&deal.id).unwrap().is_favorited);
    assert!(favorites.get(&deal.id).is_none());
    assert_eq!(favorites.len(), 2);
}

#[tokio::test]
async fn favorite_insert_from_another_device() {
    let h = Harness::new();
    let feed = h.feed();
    let deal = feed.items()[0].clone();
    h.tracker.mark_unfavorited(deal.key());

    let outcome = h
        .reconciler
        .handle(&RealtimeEvent::favorite(ChangeKind::Insert, h.me, deal.key()))
        .await;

    assert_eq!(outcome, ReconcileOutcome::Applied { surfaces: 1 });
    assert!(!h.tracker.is_unfavorited(&deal.key()));
    assert!(feed.state(&deal.id).unwrap().is_favorited);
}

#[tokio::test]
async fn favorite_events_for_other_users_are_ignored() {
    let h = Harness::new();
    let feed = h.feed();
    let deal = feed.items()[2].clone();

    let outcome = h
        .reconciler
        .handle(&RealtimeEvent::favorite(
            ChangeKind::Delete,
            UserId::new(),
            deal.key(),
        ))
        .await;

    assert_eq!(outcome, ReconcileOutcome::Ignored(IgnoreReason::OtherUser));
    assert!(!h.tracker.is_unfavorited(&deal.key()));
    assert!(feed.state(&deal.id).unwrap().is_favorited);
}

// ── Registration and event loop ─────────────────────────────────

#[tokio::test]
async fn unregistered_sinks_stop_receiving() {
    let h = Harness::new();
    let list = Arc::new(ListInteractionAdapter::new(
        sample_feed(),
        Arc::new(MockPersistence::accepting()),
        h.tracker.clone(),
    ));
    let sink = h.reconciler.register(list.clone());
    assert_eq!(h.reconciler.sink_count(), 1);

    assert!(h.reconciler.unregister(sink));
    assert!(!h.reconciler.unregister(sink));
    assert_eq!(h.reconciler.sink_count(), 0);

    let id = list.items()[0].id;
    h.source.set_tally(id, VoteTally::new(50, 0));
    let outcome = h
        .reconciler
        .handle(&RealtimeEvent::vote(id, UserId::new(), InteractionType::Upvote))
        .await;
    assert_eq!(outcome, ReconcileOutcome::Applied { surfaces: 0 });
    assert_eq!(list.state(&id), Some(InteractionState::with_count(5)));
}

#[tokio::test]
async fn run_drains_channel_until_closed() {
    let h = Harness::new();
    let list = h.feed();
    let items = list.items();
    let (a, b) = (items[0].id, items[1].id);
    h.source.set_tally(a, VoteTally::new(3, 0));
    let other = UserId::new();

    let (tx, rx) = mpsc::channel(8);
    tx.send(RealtimeEvent::vote(a, other, InteractionType::Upvote))
        .await
        .unwrap();
    tx.send(RealtimeEvent::vote(b, h.me, InteractionType::Upvote))
        .await
        .unwrap();
    tx.send(RealtimeEvent::favorite(ChangeKind::Insert, h.me, EntityKey::deal(b)))
        .await
        .unwrap();
    drop(tx);

    let handled = h.reconciler.run(rx).await;

    assert_eq!(handled, 3);
    assert_eq!(list.state(&a), Some(InteractionState::with_count(3)));
    assert_eq!(list.state(&b), Some(InteractionState::upvoted(12).favorited(true)));
}

#[tokio::test]
async fn events_decoded_from_the_wire() {
    let h = Harness::new();
    let list = h.feed();
    let deal = list.items()[2].clone();
    let json = format!(
        r#"{{"type":"favorite_changed","event_kind":"delete","user_id":"{}","entity_id":"{}","entity_kind":"deal"}}"#,
        h.me, deal.id
    );
    let event = RealtimeEvent::from_json(&json).unwrap();

    let outcome = h.reconciler.handle(&event).await;

    assert_eq!(outcome, ReconcileOutcome::Applied { surfaces: 1 });
    assert!(!list.state(&deal.id).unwrap().is_favorited);
}
