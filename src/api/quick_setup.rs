use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::api::settings::store_policy;
use crate::auth::auth::AuthUser;
use crate::error::HrError;
use crate::model::policy::WorkspacePolicy;
use crate::model::quick_setup::{self, QuickSetupState, SetupAction};
use crate::model::role::{Action, Module};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReduceRequest {
    /// Omit to start a new wizard.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub state: Option<QuickSetupState>,
    #[schema(value_type = Object)]
    pub action: SetupAction,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReduceResponse {
    #[schema(value_type = Object)]
    pub state: QuickSetupState,
    pub step: u8,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CommitRequest {
    #[schema(value_type = Object)]
    pub state: QuickSetupState,
    #[serde(default)]
    pub save: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CommitResponse {
    pub policy: WorkspacePolicy,
    pub saved: bool,
}

/// Applies one wizard action and returns the next state
#[utoipa::path(
    post,
    path = "/api/quick-setup/reduce",
    request_body(content = ReduceRequest, example = json!({
        "state": { "step": "COUNTRY", "data": { "country": "KR" } },
        "action": { "type": "NEXT" }
    })),
    responses(
        (status = 200, description = "Next wizard state", body = ReduceResponse),
        (status = 401),
        (status = 409, description = "Action not allowed on this step")
    ),
    tag = "Quick setup"
)]
pub async fn reduce(_auth: AuthUser, payload: web::Json<ReduceRequest>) -> Result<HttpResponse, HrError> {
    let request = payload.into_inner();
    let state = quick_setup::reduce(request.state.unwrap_or_default(), request.action)?;
    Ok(HttpResponse::Ok().json(ReduceResponse {
        step: state.step_number(),
        state,
    }))
}

/// Materializes the summary into a DRAFT policy, optionally saving it
#[utoipa::path(
    post,
    path = "/api/quick-setup/commit",
    request_body = CommitRequest,
    responses(
        (status = 200, description = "Materialized policy", body = CommitResponse),
        (status = 401),
        (status = 403, description = "Role may not edit HR settings"),
        (status = 409, description = "Wizard is not on the summary step"),
        (status = 422, description = "Selections produce an invalid policy")
    ),
    tag = "Quick setup"
)]
pub async fn commit(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CommitRequest>,
) -> Result<HttpResponse, HrError> {
    let request = payload.into_inner();
    if request.save {
        auth.require(Module::HrSettings, Action::Edit)?;
    }

    let QuickSetupState::Summary(selections) = request.state else {
        return Err(HrError::InvalidTransition(
            "Quick setup can only be committed from the summary step".into(),
        ));
    };

    let base = state.policy(&auth.workspace_id).await?;
    let mut policy = quick_setup::commit(&selections, &base)?;

    if request.save {
        policy = store_policy(&state, &auth.workspace_id, policy).await?;
        info!(workspace_id = %auth.workspace_id, "quick setup saved");
    }

    Ok(HttpResponse::Ok().json(CommitResponse {
        policy,
        saved: request.save,
    }))
}
