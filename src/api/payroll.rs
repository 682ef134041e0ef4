use actix_web::{HttpResponse, web};
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::HrError;
use crate::model::payroll::{PayrollResult, SalaryType, WorkedMinutes, compute_payroll};
use crate::model::role::{Action, Module};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComputePayroll {
    pub worked: WorkedMinutes,
    /// Pay this worker as HOURLY/FREELANCER instead of the workspace default.
    pub salary_type: Option<SalaryType>,
}

/// Pay-period computation against the workspace payroll settings
#[utoipa::path(
    post,
    path = "/api/payroll/compute",
    request_body(content = ComputePayroll, example = json!({
        "worked": { "regular": 12540, "overtime": 600, "night": 120, "holiday": 0, "holidayOvertime": 0 }
    })),
    responses(
        (status = 200, description = "Payroll breakdown", body = PayrollResult),
        (status = 401),
        (status = 403, description = "Role may not view payroll"),
        (status = 422, description = "Payroll settings are invalid")
    ),
    tag = "Payroll"
)]
pub async fn compute(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<ComputePayroll>,
) -> Result<HttpResponse, HrError> {
    auth.require(Module::Payroll, Action::View)?;

    let request = payload.into_inner();
    let policy = state.policy(&auth.workspace_id).await?;

    if request.salary_type == Some(SalaryType::Hourly) && !policy.hourly_workers_enabled {
        return Err(HrError::PolicyViolation(
            "Hourly workers are not enabled for this workspace".into(),
        ));
    }

    let result = compute_payroll(&policy.payroll, &request.worked, request.salary_type)?;
    info!(
        workspace_id = %auth.workspace_id,
        gross = result.gross_pay,
        net = result.net_pay,
        warnings = result.warnings.len(),
        "payroll computed"
    );
    Ok(HttpResponse::Ok().json(result))
}
