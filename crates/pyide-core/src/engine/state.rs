use serde::{Deserialize, Serialize};
use strum::Display;

/// Lifecycle of an engine session.
///
/// `Uninitialized → Initializing → Ready ⇄ Running`, with `Failed` reachable
/// only from `Initializing` and never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EngineState {
    Uninitialized,
    Initializing,
    Ready,
    Running,
    Failed,
}

impl EngineState {
    /// True if a new execution may start.
    pub fn accepts_runs(self) -> bool {
        self == Self::Ready
    }

    /// True while the engine may still become ready.
    pub fn is_loading(self) -> bool {
        matches!(self, Self::Uninitialized | Self::Initializing)
    }
}
