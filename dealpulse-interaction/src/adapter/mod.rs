//! Container adapters.
//!
//! Screens hold deals in two shapes: a feed-style ordered list and a
//! detail-style single value. Both adapters drive the same dispatch path
//! as [`InteractionStateMachine`](crate::InteractionStateMachine), so a tap
//! produces identical flags and counts whichever surface it came from.

mod list;
mod single;

pub use list::ListInteractionAdapter;
pub use single::SingleEntityInteractionAdapter;

use dealpulse_types::{EntityKey, FavoriteSnapshot, InteractionState};

/// A screen value that carries interaction state.
pub trait Interactable: Clone + Send + Sync + 'static {
    /// The entity this value represents.
    fn entity_key(&self) -> EntityKey;

    /// Current interaction state.
    fn interaction(&self) -> InteractionState;

    /// A copy of `self` with `state` applied.
    fn with_interaction(&self, state: InteractionState) -> Self;

    /// Snapshot handed to the favorite tracker when the user favorites this
    /// value. Only deals use it.
    fn favorite_snapshot(&self) -> Option<FavoriteSnapshot> {
        None
    }
}

/// What a list represents, which decides how server-confirmed unfavorites
/// are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListRole {
    /// Feed, search results, restaurant deals: unfavorites clear the flag.
    #[default]
    Feed,
    /// The user's favorites: unfavorites remove the element.
    Favorites,
}
