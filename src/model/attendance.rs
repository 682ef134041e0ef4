use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc, Weekday};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum_macros::{AsRefStr, Display as StrumDisplay, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::HrError;
use crate::model::work_settings::{LatePolicy, WorkSettings};
use crate::utils::{clock::local_date, geo::haversine_meters, net::is_whitelisted};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    StrumDisplay,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkLocation {
    Office,
    Remote,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    StrumDisplay,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Late,
    Absent,
}

/// At most one record exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[display(fmt = "{}/{}/{}", workspace_id, user_id, date)]
pub struct AttendanceKey {
    pub workspace_id: String,
    pub user_id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub workspace_id: String,
    pub user_id: String,
    #[schema(value_type = String, format = "date", example = "2026-03-02")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<DateTime<Utc>>,
    pub work_location: WorkLocation,
    pub status: AttendanceStatus,
    pub total_minutes: i64,
}

impl AttendanceRecord {
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey {
            workspace_id: self.workspace_id.clone(),
            user_id: self.user_id.clone(),
            date: self.date,
        }
    }

    /// Checked in and not yet checked out.
    pub fn is_open(&self) -> bool {
        self.check_in.is_some() && self.check_out.is_none()
    }
}

/// Workspace rules a check-in/out is judged against.
pub struct AttendanceContext<'a> {
    pub settings: &'a WorkSettings,
    pub late_policy: &'a LatePolicy,
    pub offset: FixedOffset,
}

#[derive(Debug, Clone)]
pub struct CheckInAttempt<'a> {
    pub workspace_id: &'a str,
    pub user_id: &'a str,
    pub location: WorkLocation,
    pub ip: &'a str,
    pub coordinates: Option<(f64, f64)>,
}

fn verify_office_presence(ctx: &AttendanceContext<'_>, attempt: &CheckInAttempt<'_>) -> Result<(), HrError> {
    if attempt.location != WorkLocation::Office {
        return Ok(());
    }

    let settings = ctx.settings;
    if settings.verification.wifi_verification
        && !settings.office_ip_whitelist.is_empty()
        && !is_whitelisted(&settings.office_ip_whitelist, attempt.ip)
    {
        return Err(HrError::PolicyViolation(format!(
            "IP {} is not on the office allow-list",
            attempt.ip
        )));
    }

    if let Some(fence) = &settings.verification.gps {
        let (lat, lon) = attempt.coordinates.ok_or_else(|| {
            HrError::PolicyViolation("GPS coordinates are required for office check-in".into())
        })?;
        let distance = haversine_meters(fence.latitude, fence.longitude, lat, lon);
        if distance > fence.radius_meters {
            return Err(HrError::PolicyViolation(format!(
                "Location is {:.0}m from the office (limit {:.0}m)",
                distance, fence.radius_meters
            )));
        }
    }

    Ok(())
}

/// Status for a check-in at `now`: on or before start + grace is PRESENT.
pub fn arrival_status(ctx: &AttendanceContext<'_>, now: DateTime<Utc>) -> AttendanceStatus {
    let Some(start) = ctx.settings.reference_start() else {
        return AttendanceStatus::Present;
    };
    let local = now.with_timezone(&ctx.offset).naive_local();
    let deadline =
        local.date().and_time(start) + chrono::Duration::minutes(i64::from(ctx.late_policy.grace_minutes));
    if local <= deadline {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::Late
    }
}

/// Opens today's record. Nothing is produced unless every check passes.
pub fn check_in(
    existing: Option<&AttendanceRecord>,
    ctx: &AttendanceContext<'_>,
    attempt: &CheckInAttempt<'_>,
    now: DateTime<Utc>,
) -> Result<AttendanceRecord, HrError> {
    verify_office_presence(ctx, attempt)?;

    if existing.is_some_and(|record| record.check_in.is_some()) {
        return Err(HrError::AlreadyCheckedIn);
    }

    Ok(AttendanceRecord {
        id: existing.map(|r| r.id).unwrap_or_else(Uuid::new_v4),
        workspace_id: attempt.workspace_id.to_string(),
        user_id: attempt.user_id.to_string(),
        date: local_date(now, ctx.offset),
        check_in: Some(now),
        check_out: None,
        work_location: attempt.location,
        status: arrival_status(ctx, now),
        total_minutes: 0,
    })
}

/// Closes an open record and computes worked minutes net of lunch.
pub fn check_out(
    existing: Option<&AttendanceRecord>,
    ctx: &AttendanceContext<'_>,
    now: DateTime<Utc>,
) -> Result<AttendanceRecord, HrError> {
    let record = existing
        .filter(|r| r.is_open())
        .ok_or(HrError::NotCheckedIn)?;
    let check_in = record.check_in.ok_or(HrError::NotCheckedIn)?;

    let start = check_in.with_timezone(&ctx.offset).naive_local();
    let end = now.with_timezone(&ctx.offset).naive_local();
    let gross = (now - check_in).num_minutes();
    let lunch = ctx.settings.lunch_overlap_minutes(record.date, start, end);

    let mut closed = record.clone();
    closed.check_out = Some(now);
    closed.total_minutes = (gross - lunch).max(0);
    Ok(closed)
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSummary {
    pub worked_minutes: i64,
    pub required_minutes: i64,
    pub days_present: u32,
    pub late_count: u32,
    /// Won, capped per LatePolicy.
    pub late_deduction: i64,
}

fn weekdays_between(from: NaiveDate, to: NaiveDate) -> i64 {
    from.iter_days()
        .take_while(|d| *d <= to)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .count() as i64
}

pub fn summarize(
    records: &[AttendanceRecord],
    settings: &WorkSettings,
    late_policy: &LatePolicy,
    from: NaiveDate,
    to: NaiveDate,
) -> AttendanceSummary {
    let attended = records.iter().filter(|r| r.check_in.is_some());

    // The cap is monthly, so a multi-month range is capped month by month.
    let mut late_by_month: BTreeMap<(i32, u32), u32> = BTreeMap::new();
    for record in attended.clone().filter(|r| r.status == AttendanceStatus::Late) {
        *late_by_month
            .entry((record.date.year(), record.date.month()))
            .or_default() += 1;
    }

    AttendanceSummary {
        worked_minutes: records.iter().map(|r| r.total_minutes).sum(),
        required_minutes: weekdays_between(from, to) * i64::from(settings.daily_required_minutes),
        days_present: attended.count() as u32,
        late_count: late_by_month.values().sum(),
        late_deduction: late_by_month
            .values()
            .map(|count| late_policy.monthly_deduction(*count))
            .fold(0i64, i64::saturating_add),
    }
}
