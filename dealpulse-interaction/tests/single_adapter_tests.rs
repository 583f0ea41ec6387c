mod common;

use common::{Deal, init_tracing};
use dealpulse_interaction::mock::{MockPersistence, RecordingObserver};
use dealpulse_interaction::{
    ActionOutcome, FavoriteTracker, PersistenceError, ReconcileSink,
    SingleEntityInteractionAdapter, SkipReason,
};
use dealpulse_types::{EntityKey, InteractionAction, InteractionState, TransitionState};
use futures::poll;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn detail(
    deal: Deal,
    port: &Arc<MockPersistence>,
    tracker: &FavoriteTracker,
) -> SingleEntityInteractionAdapter<Deal> {
    init_tracing();
    SingleEntityInteractionAdapter::new(deal, port.clone(), tracker.clone())
}

#[tokio::test]
async fn upvote_on_detail_screen() {
    let port = Arc::new(MockPersistence::accepting());
    let observer = Arc::new(RecordingObserver::new());
    let adapter = detail(
        Deal::new("Lunch combo", InteractionState::with_count(5)),
        &port,
        &FavoriteTracker::new(),
    )
    .with_observer(observer.clone());

    let outcome = adapter.toggle_upvote().await;

    assert_eq!(outcome, ActionOutcome::Committed(InteractionState::upvoted(6)));
    assert_eq!(adapter.entity().state, InteractionState::upvoted(6));
    assert_eq!(adapter.entity().title, "Lunch combo");
    assert_eq!(observer.commits().len(), 1);
}

#[tokio::test]
async fn rollback_restores_entire_value() {
    let port = Arc::new(MockPersistence::failing(PersistenceError::Rejected(
        "vote limit reached".into(),
    )));
    let observer = Arc::new(RecordingObserver::new());
    let original = Deal::new("Brunch special", InteractionState::downvoted(2).favorited(true));
    let adapter = detail(original.clone(), &port, &FavoriteTracker::new())
        .with_observer(observer.clone());

    let outcome = adapter.toggle_downvote().await;

    assert_eq!(
        outcome,
        ActionOutcome::RolledBack {
            message: "vote limit reached".to_string(),
            restored: original.state,
        }
    );
    assert_eq!(adapter.entity(), original);
    assert_eq!(
        observer.errors(),
        vec![("vote limit reached".to_string(), InteractionAction::Downvote)]
    );
}

#[tokio::test]
async fn pending_gate_and_transitions() {
    let port = Arc::new(MockPersistence::accepting().gated());
    let adapter = detail(
        Deal::new("Family meal", InteractionState::with_count(0)),
        &port,
        &FavoriteTracker::new(),
    );

    let fut = adapter.toggle_favorite();
    tokio::pin!(fut);
    assert!(poll!(fut.as_mut()).is_pending());
    assert!(adapter.is_pending());
    assert!(adapter.state().is_favorited);
    assert_eq!(
        adapter.toggle_upvote().await,
        ActionOutcome::Skipped(SkipReason::AlreadyPending)
    );

    port.release(1);
    assert!(poll!(fut.as_mut()).is_pending());
    assert_eq!(adapter.transition_state(), TransitionState::Committed);
    fut.await;
    assert_eq!(adapter.transition_state(), TransitionState::Idle);
    assert_eq!(adapter.pending_action(), None);
    assert_eq!(port.call_count(), 1);
}

#[tokio::test]
async fn reset_with_fresh_entity() {
    let port = Arc::new(MockPersistence::accepting().gated());
    let deal = Deal::new("Wing night", InteractionState::with_count(1));
    let adapter = detail(deal.clone(), &port, &FavoriteTracker::new());

    let fut = adapter.toggle_upvote();
    tokio::pin!(fut);
    assert!(poll!(fut.as_mut()).is_pending());

    let fresh = Deal {
        title: "Wing night (extended)".to_string(),
        state: InteractionState::with_count(30),
        ..deal
    };
    adapter.reset(fresh.clone());
    port.release(1);

    assert_eq!(fut.await, ActionOutcome::Superseded);
    assert_eq!(adapter.entity(), fresh);
}

#[tokio::test]
async fn sink_updates_match_entity() {
    let port = Arc::new(MockPersistence::accepting());
    let deal = Deal::new("Pizza Friday", InteractionState::downvoted(3));
    let adapter = detail(deal.clone(), &port, &FavoriteTracker::new());

    assert!(adapter.apply_vote_count(deal.id, 9));
    assert_eq!(adapter.state(), InteractionState::downvoted(9));

    assert!(!adapter.apply_favorite(EntityKey::restaurant(deal.id), true));
    assert!(adapter.apply_favorite(deal.key(), true));
    assert!(adapter.state().is_favorited);
}

#[tokio::test]
async fn dropped_toggle_restores_entity() {
    let port = Arc::new(MockPersistence::accepting().gated());
    let original = Deal::new("Oyster hour", InteractionState::upvoted(4));
    let adapter = detail(original.clone(), &port, &FavoriteTracker::new());

    let fut = adapter.toggle_upvote();
    assert_eq!(adapter.state(), InteractionState::with_count(3));
    assert!(adapter.is_pending());
    drop(fut);

    assert_eq!(adapter.entity(), original);
    assert_eq!(adapter.transition_state(), TransitionState::Idle);

    port.release(1);
    assert!(adapter.toggle_downvote().await.is_committed());
    assert_eq!(adapter.state(), InteractionState::downvoted(2));
}
