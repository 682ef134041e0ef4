use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::HrError;

/// Liveness-check state of one open remote attendance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PresenceState {
    Inactive,
    Armed {
        #[serde(rename = "armedAt")]
        #[schema(value_type = String, format = "date-time")]
        armed_at: DateTime<Utc>,
        #[schema(value_type = String, format = "date-time")]
        deadline: DateTime<Utc>,
    },
    Prompted {
        #[serde(rename = "promptedAt")]
        #[schema(value_type = String, format = "date-time")]
        prompted_at: DateTime<Utc>,
    },
}

impl PresenceState {
    pub fn arm(now: DateTime<Utc>, interval_minutes: u32) -> Self {
        PresenceState::Armed {
            armed_at: now,
            deadline: now + Duration::minutes(i64::from(interval_minutes)),
        }
    }

    /// Moves an expired ARMED state to PROMPTED. The flag is true only on
    /// the call that performs the transition.
    pub fn advance(self, now: DateTime<Utc>) -> (Self, bool) {
        match self {
            PresenceState::Armed { deadline, .. } if now >= deadline => (
                PresenceState::Prompted {
                    prompted_at: deadline,
                },
                true,
            ),
            other => (other, false),
        }
    }

    pub fn confirm(self, now: DateTime<Utc>, interval_minutes: u32) -> Result<Self, HrError> {
        match self.advance(now).0 {
            PresenceState::Prompted { .. } => Ok(PresenceState::arm(now, interval_minutes)),
            _ => Err(HrError::NoPendingPrompt),
        }
    }
}
