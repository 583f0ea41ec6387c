//! Shared test helpers for interaction tests.

#![allow(dead_code)]

use dealpulse_interaction::Interactable;
use dealpulse_types::{EntityId, EntityKey, FavoriteSnapshot, InteractionState};
use tracing_subscriber::EnvFilter;

/// Installs a test-friendly subscriber once. Set `RUST_LOG=debug` to see
/// transition logs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A feed card.
#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    pub id: EntityId,
    pub title: String,
    pub restaurant: String,
    pub state: InteractionState,
}

impl Deal {
    pub fn new(title: &str, state: InteractionState) -> Self {
        Self {
            id: EntityId::new(),
            title: title.to_string(),
            restaurant: "Corner Bistro".to_string(),
            state,
        }
    }

    pub fn key(&self) -> EntityKey {
        EntityKey::deal(self.id)
    }
}

impl Interactable for Deal {
    fn entity_key(&self) -> EntityKey {
        EntityKey::deal(self.id)
    }

    fn interaction(&self) -> InteractionState {
        self.state
    }

    fn with_interaction(&self, state: InteractionState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }

    fn favorite_snapshot(&self) -> Option<FavoriteSnapshot> {
        Some(FavoriteSnapshot::new(self.id, self.title.clone()).with_restaurant(self.restaurant.clone()))
    }
}

/// A restaurant row; favoritable, never voted on.
#[derive(Debug, Clone, PartialEq)]
pub struct Restaurant {
    pub id: EntityId,
    pub name: String,
    pub favorited: bool,
}

impl Restaurant {
    pub fn new(name: &str) -> Self {
        Self {
            id: EntityId::new(),
            name: name.to_string(),
            favorited: false,
        }
    }
}

impl Interactable for Restaurant {
    fn entity_key(&self) -> EntityKey {
        EntityKey::restaurant(self.id)
    }

    fn interaction(&self) -> InteractionState {
        InteractionState::default().favorited(self.favorited)
    }

    fn with_interaction(&self, state: InteractionState) -> Self {
        Self {
            favorited: state.is_favorited,
            ..self.clone()
        }
    }
}

/// Three deals with distinct states.
pub fn sample_feed() -> Vec<Deal> {
    vec![
        Deal::new("Taco Tuesday", InteractionState::with_count(5)),
        Deal::new("Happy hour wings", InteractionState::upvoted(12)),
        Deal::new("Free dessert", InteractionState::downvoted(-1).favorited(true)),
    ]
}
