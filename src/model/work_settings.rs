use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::utils::net::normalize_ip;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkType {
    Fixed,
    Flexible,
    CoreTime,
    Autonomous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LunchBreak {
    #[schema(value_type = String, example = "12:00:00")]
    pub start: NaiveTime,
    #[schema(value_type = String, example = "13:00:00")]
    pub end: NaiveTime,
}

/// Office geofence for GPS check-in verification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GpsFence {
    #[validate(range(min = -90.0, max = 90.0, message = "latitude out of range"))]
    #[schema(example = 37.5665)]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude out of range"))]
    #[schema(example = 126.978)]
    pub longitude: f64,
    #[validate(range(exclusive_min = 0.0, message = "radius must be positive"))]
    #[schema(example = 200.0)]
    pub radius_meters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationConfig {
    /// Enforce the office IP allow-list on OFFICE check-ins.
    pub wifi_verification: bool,
    pub gps: Option<GpsFence>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            wifi_verification: true,
            gps: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", default)]
#[validate(schema(function = "check_work_hours", skip_on_field_errors = false))]
#[validate(schema(function = "check_core_time", skip_on_field_errors = false))]
#[validate(schema(function = "check_lunch_break", skip_on_field_errors = false))]
#[validate(schema(function = "check_presence_interval", skip_on_field_errors = false))]
#[validate(schema(function = "check_whitelist", skip_on_field_errors = false))]
#[validate(schema(function = "check_gps_fence", skip_on_field_errors = false))]
pub struct WorkSettings {
    #[serde(rename = "type")]
    pub work_type: WorkType,
    #[validate(range(max = 1440, message = "must not exceed 1440 minutes"))]
    pub daily_required_minutes: u32,
    #[validate(range(max = 10080, message = "must not exceed 10080 minutes"))]
    pub weekly_required_minutes: u32,
    #[schema(value_type = String, example = "09:00:00")]
    pub work_start_time: NaiveTime,
    #[schema(value_type = String, example = "18:00:00")]
    pub work_end_time: NaiveTime,
    #[schema(value_type = Option<String>, example = "10:00:00")]
    pub core_time_start: Option<NaiveTime>,
    #[schema(value_type = Option<String>, example = "16:00:00")]
    pub core_time_end: Option<NaiveTime>,
    pub lunch_break: Option<LunchBreak>,
    pub presence_check_enabled: bool,
    #[schema(example = 90)]
    pub presence_interval_minutes: u32,
    #[schema(value_type = Vec<String>, example = json!(["203.0.113.10"]))]
    pub office_ip_whitelist: BTreeSet<String>,
    pub verification: VerificationConfig,
}

impl Default for WorkSettings {
    fn default() -> Self {
        Self {
            work_type: WorkType::Fixed,
            daily_required_minutes: 480,
            weekly_required_minutes: 2400,
            work_start_time: hm(9, 0),
            work_end_time: hm(18, 0),
            core_time_start: None,
            core_time_end: None,
            lunch_break: Some(LunchBreak {
                start: hm(12, 0),
                end: hm(13, 0),
            }),
            presence_check_enabled: false,
            presence_interval_minutes: 90,
            office_ip_whitelist: BTreeSet::new(),
            verification: VerificationConfig::default(),
        }
    }
}

pub(crate) fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

fn violation(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn check_work_hours(settings: &WorkSettings) -> Result<(), ValidationError> {
    if settings.work_start_time >= settings.work_end_time {
        return Err(violation(
            "work_hours_order",
            "workStartTime must be before workEndTime",
        ));
    }
    Ok(())
}

fn check_core_time(settings: &WorkSettings) -> Result<(), ValidationError> {
    if settings.work_type != WorkType::CoreTime {
        return Ok(());
    }
    let (Some(core_start), Some(core_end)) = (settings.core_time_start, settings.core_time_end) else {
        return Err(violation(
            "core_time_missing",
            "CORE_TIME requires coreTimeStart and coreTimeEnd",
        ));
    };
    if core_start >= core_end
        || core_start < settings.work_start_time
        || core_end > settings.work_end_time
    {
        return Err(violation(
            "core_time_bounds",
            "core time must be a non-empty window inside working hours",
        ));
    }
    Ok(())
}

fn check_lunch_break(settings: &WorkSettings) -> Result<(), ValidationError> {
    match settings.lunch_break {
        Some(lunch) if lunch.start >= lunch.end => Err(violation(
            "lunch_order",
            "lunch break start must be before its end",
        )),
        _ => Ok(()),
    }
}

fn check_presence_interval(settings: &WorkSettings) -> Result<(), ValidationError> {
    if settings.presence_check_enabled && settings.presence_interval_minutes == 0 {
        return Err(violation(
            "presence_interval",
            "presenceIntervalMinutes must be at least 1 when presence checks are enabled",
        ));
    }
    Ok(())
}

fn check_whitelist(settings: &WorkSettings) -> Result<(), ValidationError> {
    if settings
        .office_ip_whitelist
        .iter()
        .any(|entry| normalize_ip(entry).is_none())
    {
        return Err(violation(
            "whitelist_entry",
            "officeIpWhitelist entries must be IP addresses",
        ));
    }
    Ok(())
}

fn check_gps_fence(settings: &WorkSettings) -> Result<(), ValidationError> {
    match &settings.verification.gps {
        Some(gps) if gps.validate().is_err() => Err(violation(
            "gps_fence",
            "GPS fence needs valid coordinates and a positive radius",
        )),
        _ => Ok(()),
    }
}

impl WorkSettings {
    /// The time of day against which lateness is judged, if any.
    pub fn reference_start(&self) -> Option<NaiveTime> {
        match self.work_type {
            WorkType::Fixed | WorkType::Flexible => Some(self.work_start_time),
            WorkType::CoreTime => Some(self.core_time_start.unwrap_or(self.work_start_time)),
            WorkType::Autonomous => None,
        }
    }

    /// Minutes of `[start, end]` that fall inside the lunch window of `date`.
    pub fn lunch_overlap_minutes(
        &self,
        date: NaiveDate,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> i64 {
        let Some(lunch) = self.lunch_break else {
            return 0;
        };
        let window_start = date.and_time(lunch.start).max(start);
        let window_end = date.and_time(lunch.end).min(end);
        if window_end <= window_start {
            0
        } else {
            (window_end - window_start).num_minutes()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct LatePolicy {
    #[schema(example = 10)]
    pub grace_minutes: u32,
    /// Won deducted per late arrival.
    #[validate(range(min = 0, message = "must not be negative"))]
    #[schema(example = 10000)]
    pub deduction_per_late: i64,
    #[validate(range(min = 0, message = "must not be negative"))]
    #[schema(example = 100000)]
    pub monthly_cap: i64,
}

impl Default for LatePolicy {
    fn default() -> Self {
        Self {
            grace_minutes: 10,
            deduction_per_late: 10_000,
            monthly_cap: 100_000,
        }
    }
}

impl LatePolicy {
    pub fn monthly_deduction(&self, late_count: u32) -> i64 {
        self.deduction_per_late
            .saturating_mul(i64::from(late_count))
            .min(self.monthly_cap)
    }
}
