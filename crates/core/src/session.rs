use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::ContextualMemory;
use crate::rotation::RotationState;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the assistant remembers about one conversation.
///
/// Callers own persistence; the assistant only reads and mutates this value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub memory: ContextualMemory,
    #[serde(default)]
    pub rotation: RotationState,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_message_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::SessionState;
    use crate::domain::intent::ContextFilters;

    #[test]
    fn state_survives_json_round_trip() {
        let now = Utc::now();
        let mut state = SessionState::default();
        state.memory.register(
            ContextFilters { category: Some("GIN".to_string()), ..ContextFilters::default() },
            now,
        );
        state.touch(now);

        let json = serde_json::to_string(&state).expect("serialize state");
        let restored: SessionState = serde_json::from_str(&json).expect("deserialize state");
        assert_eq!(restored, state);
    }

    #[test]
    fn missing_fields_default() {
        let restored: SessionState = serde_json::from_str("{}").expect("deserialize empty state");
        assert_eq!(restored, SessionState::default());
    }
}
