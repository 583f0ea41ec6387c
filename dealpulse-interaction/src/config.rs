//! Runtime configuration for the realtime reconciler.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default suppression window for repeated realtime events.
pub const DEFAULT_DEDUPE_WINDOW_MS: u64 = 1_000;

/// Configuration for [`RealtimeReconciler`](crate::RealtimeReconciler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Repeats of the same `(entity, event kind)` inside this window are
    /// dropped. A heuristic, not a protocol guarantee.
    pub dedupe_window_ms: u64,
    /// Refetch the vote tally when another user votes.
    pub refetch_on_vote: bool,
}

impl ReconcilerConfig {
    /// The dedupe window as a `Duration`.
    pub fn dedupe_window(&self) -> Duration {
        Duration::from_millis(self.dedupe_window_ms)
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            dedupe_window_ms: DEFAULT_DEDUPE_WINDOW_MS,
            refetch_on_vote: true,
        }
    }
}
