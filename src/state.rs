use chrono::FixedOffset;
use std::sync::Arc;

use crate::error::HrError;
use crate::model::policy::WorkspacePolicy;
use crate::store::HrStore;
use crate::utils::clock::Clock;
use crate::utils::presence_tracker::PresenceTracker;

/// Shared by every handler through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn HrStore>,
    pub presence: PresenceTracker,
    pub clock: Arc<dyn Clock>,
    pub offset: FixedOffset,
}

impl AppState {
    pub fn new(
        store: Arc<dyn HrStore>,
        presence: PresenceTracker,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            store,
            presence,
            clock,
            offset,
        }
    }

    /// Stored policy for the workspace, or the built-in default.
    pub async fn policy(&self, workspace_id: &str) -> Result<WorkspacePolicy, HrError> {
        Ok(self
            .store
            .load_policy(workspace_id)
            .await?
            .unwrap_or_default())
    }
}
