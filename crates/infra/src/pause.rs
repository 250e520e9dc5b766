use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalPauseState {
    pub paused: bool,
    pub reason: Option<String>,
    pub paused_at: Option<DateTime<Utc>>,
}

/// Process-wide switch that blocks every tool call while set.
#[derive(Default)]
pub struct PauseController {
    state: RwLock<GlobalPauseState>,
}

impl PauseController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pause all tool calls. Pausing again refreshes the reason and timestamp.
    pub fn pause(&self, reason: Option<String>) {
        let mut state = self.state.write();
        state.paused = true;
        state.paused_at = Some(Utc::now());
        info!(reason = reason.as_deref().unwrap_or(""), "Gateway paused");
        state.reason = reason;
    }

    pub fn resume(&self) {
        let mut state = self.state.write();
        if state.paused {
            info!("Gateway resumed");
        }
        *state = GlobalPauseState::default();
    }

    pub fn is_paused(&self) -> bool {
        self.state.read().paused
    }

    pub fn state(&self) -> GlobalPauseState {
        self.state.read().clone()
    }
}
