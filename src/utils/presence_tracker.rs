use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::HrError;
use crate::model::presence::PresenceState;
use crate::utils::clock::Clock;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSession {
    pub record_id: Uuid,
    pub workspace_id: String,
    pub user_id: String,
    pub interval_minutes: u32,
    pub state: PresenceState,
    pub confirmations: u32,
}

/// Server-side presence scheduler, one session per open remote record.
#[derive(Clone)]
pub struct PresenceTracker {
    sessions: Cache<Uuid, PresenceSession>,
}

impl PresenceTracker {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(idle_ttl)
                .build(),
        }
    }

    pub async fn arm(
        &self,
        record_id: Uuid,
        workspace_id: &str,
        user_id: &str,
        interval_minutes: u32,
        now: DateTime<Utc>,
    ) -> PresenceSession {
        let session = PresenceSession {
            record_id,
            workspace_id: workspace_id.to_string(),
            user_id: user_id.to_string(),
            interval_minutes,
            state: PresenceState::arm(now, interval_minutes),
            confirmations: 0,
        };
        self.sessions.insert(record_id, session.clone()).await;
        debug!(%record_id, workspace_id, user_id, interval_minutes, "presence armed");
        session
    }

    pub async fn cancel(&self, record_id: Uuid) {
        if self.sessions.remove(&record_id).await.is_some() {
            debug!(%record_id, "presence cancelled");
        }
    }

    pub async fn cancel_workspace(&self, workspace_id: &str) -> usize {
        let ids: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.workspace_id == workspace_id)
            .map(|(id, _)| *id)
            .collect();

        for id in &ids {
            self.sessions.invalidate(id).await;
        }
        if !ids.is_empty() {
            info!(workspace_id, cancelled = ids.len(), "presence sessions cancelled");
        }
        ids.len()
    }

    /// Applies a new interval to the workspace's sessions. ARMED sessions
    /// keep their arm time and get a new deadline.
    pub async fn retune_workspace(&self, workspace_id: &str, interval_minutes: u32) -> usize {
        let stale: Vec<PresenceSession> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.workspace_id == workspace_id && s.interval_minutes != interval_minutes)
            .map(|(_, s)| s)
            .collect();

        for mut session in stale.iter().cloned() {
            if let PresenceState::Armed { armed_at, .. } = session.state {
                session.state = PresenceState::arm(armed_at, interval_minutes);
            }
            session.interval_minutes = interval_minutes;
            self.sessions.insert(session.record_id, session).await;
        }
        if !stale.is_empty() {
            info!(workspace_id, interval_minutes, retuned = stale.len(), "presence sessions retuned");
        }
        stale.len()
    }

    /// Current state, with an overdue deadline already applied.
    pub async fn poll(&self, record_id: Uuid, now: DateTime<Utc>) -> PresenceState {
        match self.sessions.get(&record_id).await {
            Some(session) => session.state.advance(now).0,
            None => PresenceState::Inactive,
        }
    }

    pub async fn confirm(
        &self,
        record_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<PresenceSession, HrError> {
        let mut session = self
            .sessions
            .get(&record_id)
            .await
            .ok_or(HrError::NoPendingPrompt)?;

        session.state = session.state.confirm(now, session.interval_minutes)?;
        session.confirmations += 1;
        self.sessions.insert(record_id, session.clone()).await;
        info!(%record_id, user_id = %session.user_id, confirmations = session.confirmations, "presence confirmed");
        Ok(session)
    }

    /// Moves every session whose deadline has passed to PROMPTED and
    /// returns the sessions that fired on this call.
    pub async fn fire_due(&self, now: DateTime<Utc>) -> Vec<PresenceSession> {
        let due: Vec<PresenceSession> = self
            .sessions
            .iter()
            .filter_map(|(_, s)| {
                let (state, fired) = s.state.advance(now);
                fired.then(|| PresenceSession { state, ..s })
            })
            .collect();

        for session in &due {
            self.sessions.insert(session.record_id, session.clone()).await;
            info!(
                record_id = %session.record_id,
                workspace_id = %session.workspace_id,
                user_id = %session.user_id,
                "presence prompt fired"
            );
        }
        due
    }

    pub async fn session(&self, record_id: Uuid) -> Option<PresenceSession> {
        self.sessions.get(&record_id).await
    }
}

/// Ticks `fire_due` forever on the actix runtime.
pub fn spawn_sweeper(tracker: PresenceTracker, clock: Arc<dyn Clock>, every: Duration) {
    actix_web::rt::spawn(async move {
        let mut ticker = actix_web::rt::time::interval(every);
        loop {
            ticker.tick().await;
            let fired = tracker.fire_due(clock.now()).await;
            if !fired.is_empty() {
                debug!(fired = fired.len(), "presence sweep");
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 30, 0).unwrap()
    }

    fn tracker() -> PresenceTracker {
        PresenceTracker::new(Duration::from_secs(3600))
    }

    #[actix_web::test]
    async fn prompt_fires_once_after_interval() {
        let tracker = tracker();
        let id = Uuid::new_v4();
        tracker.arm(id, "ws", "u1", 90, t0()).await;

        assert!(tracker.fire_due(t0() + chrono::Duration::minutes(89)).await.is_empty());

        let fired = tracker.fire_due(t0() + chrono::Duration::minutes(90)).await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].record_id, id);

        assert!(tracker.fire_due(t0() + chrono::Duration::minutes(200)).await.is_empty());
        assert!(matches!(
            tracker.poll(id, t0() + chrono::Duration::minutes(200)).await,
            PresenceState::Prompted { .. }
        ));
    }

    #[actix_web::test]
    async fn confirm_rearms_and_counts() {
        let tracker = tracker();
        let id = Uuid::new_v4();
        tracker.arm(id, "ws", "u1", 90, t0()).await;

        let early = tracker.confirm(id, t0() + chrono::Duration::minutes(30)).await;
        assert!(matches!(early, Err(HrError::NoPendingPrompt)));

        let later = t0() + chrono::Duration::minutes(91);
        let session = tracker.confirm(id, later).await.unwrap();
        assert_eq!(session.confirmations, 1);
        assert_eq!(session.state, PresenceState::arm(later, 90));
    }

    #[actix_web::test]
    async fn checkout_cancels_session() {
        let tracker = tracker();
        let id = Uuid::new_v4();
        tracker.arm(id, "ws", "u1", 90, t0()).await;
        tracker.cancel(id).await;

        assert!(tracker.fire_due(t0() + chrono::Duration::minutes(90)).await.is_empty());
        assert_eq!(tracker.poll(id, t0()).await, PresenceState::Inactive);
        assert!(matches!(
            tracker.confirm(id, t0()).await,
            Err(HrError::NoPendingPrompt)
        ));
    }

    #[actix_web::test]
    async fn retune_moves_armed_deadlines_only_in_workspace() {
        let tracker = tracker();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        tracker.arm(a, "ws-1", "u1", 90, t0()).await;
        tracker.arm(b, "ws-2", "u2", 90, t0()).await;

        assert_eq!(tracker.retune_workspace("ws-1", 30).await, 1);
        assert_eq!(tracker.retune_workspace("ws-1", 30).await, 0);

        let fired = tracker.fire_due(t0() + chrono::Duration::minutes(30)).await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].record_id, a);
        assert_eq!(fired[0].interval_minutes, 30);
        assert_eq!(tracker.session(b).await.unwrap().interval_minutes, 90);
    }

    #[actix_web::test]
    async fn workspace_cancellation_spares_other_workspaces() {
        let tracker = tracker();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        tracker.arm(a, "ws-1", "u1", 60, t0()).await;
        tracker.arm(b, "ws-1", "u2", 60, t0()).await;
        tracker.arm(c, "ws-2", "u3", 60, t0()).await;

        assert_eq!(tracker.cancel_workspace("ws-1").await, 2);

        let fired = tracker.fire_due(t0() + chrono::Duration::minutes(60)).await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].record_id, c);
    }
}
