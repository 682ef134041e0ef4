use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::error::HrError;
use crate::model::leave_policy::{ApprovalRoute, LeaveBalance, LeaveKind, carry_over, leave_balance};
use crate::state::AppState;
use crate::utils::clock::local_date;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccrualRequest {
    #[schema(example = "2025-01-15", value_type = String, format = "date")]
    pub hire_date: NaiveDate,
    /// Defaults to today.
    #[schema(example = "2026-03-01", value_type = Option<String>, format = "date")]
    pub as_of: Option<NaiveDate>,
    /// Unused days from the previous grant, considered for carry-over.
    #[schema(example = 3.0)]
    pub unused_days: Option<f64>,
    #[schema(example = "2025-01-15", value_type = Option<String>, format = "date")]
    pub last_grant_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ApprovalRouteRequest {
    #[schema(example = 2.0)]
    pub days: f64,
    pub kind: LeaveKind,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRouteResponse {
    pub route: ApprovalRoute,
    pub requires_document: bool,
    /// Allotment when `kind` is a special leave.
    pub allotted_days: Option<f64>,
}

/// Annual leave entitlement as of a date
#[utoipa::path(
    post,
    path = "/api/leave/accrual",
    request_body = AccrualRequest,
    responses(
        (status = 200, description = "Accrued days and carry-over", body = LeaveBalance),
        (status = 401),
        (status = 422)
    ),
    tag = "Leave"
)]
pub async fn accrual(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<AccrualRequest>,
) -> Result<HttpResponse, HrError> {
    let request = payload.into_inner();
    let as_of = request
        .as_of
        .unwrap_or_else(|| local_date(state.clock.now(), state.offset));
    if request.hire_date > as_of {
        return Err(HrError::validation("hireDate: must not be after asOf"));
    }
    if request.unused_days.is_some_and(|d| d < 0.0) {
        return Err(HrError::validation("unusedDays: must not be negative"));
    }

    let policy = state.policy(&auth.workspace_id).await?.leave_policy;
    let carried = match (request.unused_days, request.last_grant_date) {
        (Some(days), Some(granted)) => carry_over(&policy, days, granted),
        _ => None,
    };

    Ok(HttpResponse::Ok().json(leave_balance(&policy, request.hire_date, as_of, carried)))
}

/// Who has to approve a leave request
#[utoipa::path(
    post,
    path = "/api/leave/approval-route",
    request_body = ApprovalRouteRequest,
    responses(
        (status = 200, description = "Approval route", body = ApprovalRouteResponse),
        (status = 401),
        (status = 422)
    ),
    tag = "Leave"
)]
pub async fn approval_route(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<ApprovalRouteRequest>,
) -> Result<HttpResponse, HrError> {
    let request = payload.into_inner();
    if request.days.is_nan() || request.days <= 0.0 {
        return Err(HrError::validation("days: must be positive"));
    }

    let policy = state.policy(&auth.workspace_id).await?.leave_policy;
    Ok(HttpResponse::Ok().json(ApprovalRouteResponse {
        route: policy.approval_route(request.days),
        requires_document: request.kind == LeaveKind::Sick
            && policy.sick_leave_requires_document(request.days),
        allotted_days: policy.special_leave_days(request.kind),
    }))
}
