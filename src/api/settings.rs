use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::HrError;
use crate::model::policy::{PolicyStatus, WorkspacePolicy};
use crate::model::role::{Action, Module, RBAC, RbacModel};
use crate::state::AppState;
use crate::utils::clock::local_date;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusChange {
    pub status: PolicyStatus,
}

/// Brings the workspace's presence sessions in line with `policy`: off
/// cancels them, on retunes live sessions and arms open REMOTE records that
/// have none.
async fn sync_presence(
    state: &AppState,
    workspace_id: &str,
    policy: &WorkspacePolicy,
) -> Result<(), HrError> {
    let settings = &policy.work_settings;
    if !settings.presence_check_enabled {
        state.presence.cancel_workspace(workspace_id).await;
        return Ok(());
    }

    let interval = settings.presence_interval_minutes;
    state.presence.retune_workspace(workspace_id, interval).await;

    let now = state.clock.now();
    let open = state
        .store
        .list_open_remote(workspace_id, local_date(now, state.offset))
        .await?;
    for record in open {
        if state.presence.session(record.id).await.is_none() {
            state
                .presence
                .arm(record.id, &record.workspace_id, &record.user_id, interval, now)
                .await;
        }
    }
    Ok(())
}

/// Validates and stores a policy document, keeping presence sessions in step.
pub(crate) async fn store_policy(
    state: &AppState,
    workspace_id: &str,
    mut policy: WorkspacePolicy,
) -> Result<WorkspacePolicy, HrError> {
    policy.ensure_valid()?;
    policy.updated_at = Some(state.clock.now());
    state.store.save_policy(workspace_id, &policy).await?;

    sync_presence(state, workspace_id, &policy).await?;
    info!(
        workspace_id,
        version = %policy.policy_version,
        status = %policy.policy_status,
        "policy saved"
    );
    Ok(policy)
}

/// Workspace policy (the built-in default when none was saved)
#[utoipa::path(
    get,
    path = "/api/attendance/settings",
    responses(
        (status = 200, description = "Workspace policy", body = WorkspacePolicy),
        (status = 401), (status = 403)
    ),
    tag = "Settings"
)]
pub async fn get_settings(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, HrError> {
    auth.require(Module::HrSettings, Action::View)?;
    let policy = state.policy(&auth.workspace_id).await?;
    Ok(HttpResponse::Ok().json(policy))
}

/// Replaces the workspace policy. Editing an ACTIVE policy returns it to DRAFT.
#[utoipa::path(
    post,
    path = "/api/attendance/settings",
    request_body = WorkspacePolicy,
    responses(
        (status = 200, description = "Saved policy", body = WorkspacePolicy),
        (status = 401),
        (status = 403, description = "Role may not edit HR settings"),
        (status = 422, description = "Invalid settings", body = Object, example = json!({
            "error": "Validation failed",
            "code": "VALIDATION_FAILURE",
            "details": { "errors": ["payroll.overtime_multipliers.overtime: multiplier must be at least 1.0"] }
        }))
    ),
    tag = "Settings"
)]
pub async fn save_settings(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<WorkspacePolicy>,
) -> Result<HttpResponse, HrError> {
    auth.require(Module::HrSettings, Action::Edit)?;

    let mut policy = payload.into_inner();
    let current = state.store.load_policy(&auth.workspace_id).await?;
    policy.policy_status = match current.map(|p| p.policy_status) {
        Some(PolicyStatus::Active) | None => PolicyStatus::Draft,
        Some(status) => status,
    };

    let saved = store_policy(&state, &auth.workspace_id, policy).await?;
    Ok(HttpResponse::Ok().json(saved))
}

/// Moves the policy through DRAFT → PENDING_APPROVAL → ACTIVE
#[utoipa::path(
    post,
    path = "/api/attendance/settings/status",
    request_body = StatusChange,
    responses(
        (status = 200, description = "Updated policy", body = WorkspacePolicy),
        (status = 401),
        (status = 403, description = "Role lacks the needed permission"),
        (status = 409, description = "Transition not allowed", body = Object, example = json!({
            "error": "Cannot move policy from DRAFT to ACTIVE",
            "code": "INVALID_TRANSITION"
        }))
    ),
    tag = "Settings"
)]
pub async fn change_status(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<StatusChange>,
) -> Result<HttpResponse, HrError> {
    let next = payload.into_inner().status;
    let mut policy = state.policy(&auth.workspace_id).await?;
    let current = policy.policy_status;

    let action = current.transition_action(next).ok_or_else(|| {
        HrError::InvalidTransition(format!("Cannot move policy from {current} to {next}"))
    })?;
    auth.require(Module::HrSettings, action)?;

    policy.policy_status = next;
    let saved = store_policy(&state, &auth.workspace_id, policy).await?;
    Ok(HttpResponse::Ok().json(saved))
}

/// Seeded role/permission matrix
#[utoipa::path(
    get,
    path = "/api/rbac/roles",
    responses(
        (status = 200, description = "Roles and permissions", body = RbacModel),
        (status = 401)
    ),
    tag = "Settings"
)]
pub async fn list_roles(_auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(&*RBAC)
}
