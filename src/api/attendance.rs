use actix_web::{HttpRequest, HttpResponse, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::error::HrError;
use crate::model::attendance::{
    self, AttendanceContext, AttendanceKey, AttendanceRecord, AttendanceSummary, CheckInAttempt,
    WorkLocation,
};
use crate::model::presence::PresenceState;
use crate::model::role::{Action, Module};
use crate::state::AppState;
use crate::utils::clock::local_date;
use crate::utils::presence_tracker::PresenceSession;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub work_location: WorkLocation,
    #[schema(example = 37.5665)]
    pub latitude: Option<f64>,
    #[schema(example = 126.978)]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceAction {
    Checkin,
    Checkout,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceActionRequest {
    pub action: AttendanceAction,
    pub work_location: Option<WorkLocation>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    /// Defaults to the first day of the current month.
    #[schema(example = "2026-03-01", value_type = Option<String>, format = "date")]
    pub from: Option<NaiveDate>,
    /// Defaults to today.
    #[schema(example = "2026-03-31", value_type = Option<String>, format = "date")]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceResponse {
    pub record: AttendanceRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresenceSession>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceListResponse {
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
    pub records: Vec<AttendanceRecord>,
    pub summary: AttendanceSummary,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    pub record_id: Option<uuid::Uuid>,
    pub state: PresenceState,
    pub confirmations: u32,
}

fn client_ip(req: &HttpRequest) -> String {
    if let Some(peer) = req.peer_addr() {
        return peer.ip().to_string();
    }
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or_default()
        .to_string()
}

async fn today_record(state: &AppState, auth: &AuthUser) -> Result<Option<AttendanceRecord>, HrError> {
    let key = AttendanceKey {
        workspace_id: auth.workspace_id.clone(),
        user_id: auth.user_id.clone(),
        date: local_date(state.clock.now(), state.offset),
    };
    Ok(state.store.find_attendance(&key).await?)
}

async fn perform_check_in(
    state: &AppState,
    auth: &AuthUser,
    ip: &str,
    location: WorkLocation,
    coordinates: Option<(f64, f64)>,
) -> Result<AttendanceResponse, HrError> {
    auth.require(Module::Attendance, Action::Create)?;

    let policy = state.policy(&auth.workspace_id).await?;
    let ctx = AttendanceContext {
        settings: &policy.work_settings,
        late_policy: &policy.late_policy,
        offset: state.offset,
    };
    let attempt = CheckInAttempt {
        workspace_id: &auth.workspace_id,
        user_id: &auth.user_id,
        location,
        ip,
        coordinates,
    };

    let now = state.clock.now();
    let existing = today_record(state, auth).await?;
    let record = attendance::check_in(existing.as_ref(), &ctx, &attempt, now).inspect_err(|e| {
        warn!(workspace_id = %auth.workspace_id, user_id = %auth.user_id, ip, error = %e, "check-in refused")
    })?;

    if !state.store.upsert_check_in(&record).await? {
        return Err(HrError::AlreadyCheckedIn);
    }
    info!(key = %record.key(), status = %record.status, location = %record.work_location, "checked in");

    let presence = if record.work_location == WorkLocation::Remote
        && policy.work_settings.presence_check_enabled
    {
        Some(
            state
                .presence
                .arm(
                    record.id,
                    &record.workspace_id,
                    &record.user_id,
                    policy.work_settings.presence_interval_minutes,
                    now,
                )
                .await,
        )
    } else {
        None
    };

    Ok(AttendanceResponse { record, presence })
}

async fn perform_check_out(state: &AppState, auth: &AuthUser) -> Result<AttendanceResponse, HrError> {
    auth.require(Module::Attendance, Action::Create)?;

    let policy = state.policy(&auth.workspace_id).await?;
    let ctx = AttendanceContext {
        settings: &policy.work_settings,
        late_policy: &policy.late_policy,
        offset: state.offset,
    };

    let existing = today_record(state, auth).await?;
    let record = attendance::check_out(existing.as_ref(), &ctx, state.clock.now())?;

    if !state.store.complete_check_out(&record).await? {
        return Err(HrError::NotCheckedIn);
    }
    state.presence.cancel(record.id).await;
    info!(key = %record.key(), total_minutes = record.total_minutes, "checked out");

    Ok(AttendanceResponse {
        record,
        presence: None,
    })
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/checkin",
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Checked in", body = AttendanceResponse),
        (status = 401, description = "Missing caller identity"),
        (status = 403, description = "Outside the office network or geofence", body = Object, example = json!({
            "error": "IP 203.0.113.9 is not on the office allow-list",
            "code": "POLICY_VIOLATION"
        })),
        (status = 409, description = "Already checked in today", body = Object, example = json!({
            "error": "Already checked in today",
            "code": "ALREADY_CHECKED_IN"
        })),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Attendance"
)]
#[instrument(skip_all, fields(user_id = %auth.user_id, workspace_id = %auth.workspace_id))]
pub async fn check_in(
    auth: AuthUser,
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<CheckInRequest>,
) -> Result<HttpResponse, HrError> {
    let body = payload.into_inner();
    let coordinates = body.latitude.zip(body.longitude);
    let response =
        perform_check_in(&state, &auth, &client_ip(&req), body.work_location, coordinates).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Check-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/checkout",
    responses(
        (status = 200, description = "Checked out", body = AttendanceResponse),
        (status = 401, description = "Missing caller identity"),
        (status = 409, description = "No open check-in for today", body = Object, example = json!({
            "error": "No active check-in found for today",
            "code": "NOT_CHECKED_IN"
        })),
        (status = 503, description = "Store unavailable")
    ),
    tag = "Attendance"
)]
#[instrument(skip_all, fields(user_id = %auth.user_id, workspace_id = %auth.workspace_id))]
pub async fn check_out(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, HrError> {
    let response = perform_check_out(&state, &auth).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Single entry point taking `{action: "checkin" | "checkout"}`
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = AttendanceActionRequest,
    responses(
        (status = 200, description = "Action applied", body = AttendanceResponse),
        (status = 401), (status = 403), (status = 409), (status = 422)
    ),
    tag = "Attendance"
)]
pub async fn attendance_action(
    auth: AuthUser,
    state: web::Data<AppState>,
    req: HttpRequest,
    payload: web::Json<AttendanceActionRequest>,
) -> Result<HttpResponse, HrError> {
    let body = payload.into_inner();
    let response = match body.action {
        AttendanceAction::Checkin => {
            let location = body
                .work_location
                .ok_or_else(|| HrError::validation("workLocation: required for checkin"))?;
            let coordinates = body.latitude.zip(body.longitude);
            perform_check_in(&state, &auth, &client_ip(&req), location, coordinates).await?
        }
        AttendanceAction::Checkout => perform_check_out(&state, &auth).await?,
    };
    Ok(HttpResponse::Ok().json(response))
}

/// Caller's records for a period, with totals
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Records and summary", body = AttendanceListResponse),
        (status = 401), (status = 422)
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, HrError> {
    auth.require(Module::Attendance, Action::View)?;

    let today = local_date(state.clock.now(), state.offset);
    let to = query.to.unwrap_or(today);
    let from = query.from.unwrap_or_else(|| to.with_day(1).unwrap_or(to));
    if from > to {
        return Err(HrError::validation("from: must not be after to"));
    }

    let policy = state.policy(&auth.workspace_id).await?;
    let records = state
        .store
        .list_attendance(&auth.workspace_id, &auth.user_id, from, to)
        .await?;
    let summary = attendance::summarize(
        &records,
        &policy.work_settings,
        &policy.late_policy,
        from,
        to,
    );

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        from,
        to,
        records,
        summary,
    }))
}

/// Presence-check state of today's record
#[utoipa::path(
    get,
    path = "/api/attendance/presence-check",
    responses(
        (status = 200, description = "Current presence state", body = PresenceResponse),
        (status = 401)
    ),
    tag = "Attendance"
)]
pub async fn presence_status(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, HrError> {
    let existing = today_record(&state, &auth).await?;
    let now = state.clock.now();

    let response = match existing.filter(|r| r.is_open()) {
        Some(record) => {
            let session = state.presence.session(record.id).await;
            PresenceResponse {
                record_id: Some(record.id),
                state: state.presence.poll(record.id, now).await,
                confirmations: session.map_or(0, |s| s.confirmations),
            }
        }
        None => PresenceResponse {
            record_id: None,
            state: PresenceState::Inactive,
            confirmations: 0,
        },
    };
    Ok(HttpResponse::Ok().json(response))
}

/// Confirms a pending presence prompt and re-arms the timer
#[utoipa::path(
    post,
    path = "/api/attendance/presence-check",
    responses(
        (status = 200, description = "Confirmed", body = PresenceResponse),
        (status = 401),
        (status = 409, description = "No prompt pending", body = Object, example = json!({
            "error": "No pending presence prompt",
            "code": "NO_PENDING_PROMPT"
        }))
    ),
    tag = "Attendance"
)]
pub async fn confirm_presence(auth: AuthUser, state: web::Data<AppState>) -> Result<HttpResponse, HrError> {
    let existing = today_record(&state, &auth).await?;
    let record = existing
        .filter(|r| r.is_open())
        .ok_or(HrError::NoPendingPrompt)?;

    let session = state.presence.confirm(record.id, state.clock.now()).await?;
    Ok(HttpResponse::Ok().json(PresenceResponse {
        record_id: Some(record.id),
        state: session.state,
        confirmations: session.confirmations,
    }))
}
