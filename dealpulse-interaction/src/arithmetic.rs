//! Vote arithmetic.
//!
//! Every surface (state machine, list adapter, single-entity adapter) goes
//! through [`next_state`], so all of them agree on vote transitions:
//!
//! | current   | upvote tap          | downvote tap          |
//! |-----------|---------------------|-----------------------|
//! | neutral   | upvoted, `+1`       | downvoted, `-1`       |
//! | upvoted   | neutral, `-1`       | downvoted, `-2`       |
//! | downvoted | upvoted, `+2`       | neutral, `+1`         |

use dealpulse_types::{InteractionAction, InteractionState};

/// Toggles the upvote.
#[must_use]
pub fn compute_upvote_toggle(state: &InteractionState) -> InteractionState {
    if state.is_upvoted {
        InteractionState {
            is_upvoted: false,
            vote_count: state.vote_count.saturating_sub(1),
            ..*state
        }
    } else if state.is_downvoted {
        InteractionState {
            is_upvoted: true,
            is_downvoted: false,
            vote_count: state.vote_count.saturating_add(2),
            ..*state
        }
    } else {
        InteractionState {
            is_upvoted: true,
            vote_count: state.vote_count.saturating_add(1),
            ..*state
        }
    }
}

/// Toggles the downvote. Mirror image of [`compute_upvote_toggle`].
#[must_use]
pub fn compute_downvote_toggle(state: &InteractionState) -> InteractionState {
    if state.is_downvoted {
        InteractionState {
            is_downvoted: false,
            vote_count: state.vote_count.saturating_add(1),
            ..*state
        }
    } else if state.is_upvoted {
        InteractionState {
            is_upvoted: false,
            is_downvoted: true,
            vote_count: state.vote_count.saturating_sub(2),
            ..*state
        }
    } else {
        InteractionState {
            is_downvoted: true,
            vote_count: state.vote_count.saturating_sub(1),
            ..*state
        }
    }
}

/// Flips the favorite flag. Votes are untouched.
#[must_use]
pub fn compute_favorite_toggle(state: &InteractionState) -> InteractionState {
    InteractionState {
        is_favorited: !state.is_favorited,
        ..*state
    }
}

/// Computes the optimistic state for `action`.
#[must_use]
pub fn next_state(action: InteractionAction, state: &InteractionState) -> InteractionState {
    match action {
        InteractionAction::Upvote => compute_upvote_toggle(state),
        InteractionAction::Downvote => compute_downvote_toggle(state),
        InteractionAction::Favorite => compute_favorite_toggle(state),
    }
}
