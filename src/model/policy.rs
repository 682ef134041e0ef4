use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::HrError;
use crate::model::leave_policy::LeavePolicy;
use crate::model::payroll::PayrollEngineSettings;
use crate::model::role::Action;
use crate::model::work_settings::{LatePolicy, WorkSettings};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyStatus {
    Draft,
    PendingApproval,
    Active,
}

impl PolicyStatus {
    /// Permission needed to move from `self` to `next`, if the move is allowed.
    pub fn transition_action(self, next: PolicyStatus) -> Option<Action> {
        use PolicyStatus::*;
        match (self, next) {
            (Draft, PendingApproval) => Some(Action::Edit),
            (PendingApproval, Active) => Some(Action::Approve),
            (PendingApproval, Draft) => Some(Action::Edit),
            (Active, Draft) => Some(Action::Edit),
            _ => None,
        }
    }
}

pub const MAX_POLICY_VERSION_CHARS: u64 = 64;

/// Workspace-scoped settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WorkspacePolicy {
    #[validate(length(min = 1, max = MAX_POLICY_VERSION_CHARS, message = "policyVersion must be 1-64 characters"))]
    #[schema(example = "2026.1")]
    pub policy_version: String,
    pub policy_status: PolicyStatus,
    #[validate(nested)]
    #[serde(default)]
    pub work_settings: WorkSettings,
    #[validate(nested)]
    #[serde(default)]
    pub late_policy: LatePolicy,
    #[validate(nested)]
    #[serde(default)]
    pub payroll: PayrollEngineSettings,
    #[validate(nested)]
    #[serde(default)]
    pub leave_policy: LeavePolicy,
    #[serde(default)]
    pub hourly_workers_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = "date-time")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for WorkspacePolicy {
    fn default() -> Self {
        Self {
            policy_version: "default".into(),
            policy_status: PolicyStatus::Draft,
            work_settings: WorkSettings::default(),
            late_policy: LatePolicy::default(),
            payroll: PayrollEngineSettings::default(),
            leave_policy: LeavePolicy::default(),
            hourly_workers_enabled: false,
            updated_at: None,
        }
    }
}

impl WorkspacePolicy {
    pub fn ensure_valid(&self) -> Result<(), HrError> {
        self.validate().map_err(HrError::from)
    }
}
