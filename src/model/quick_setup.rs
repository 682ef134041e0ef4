//! Quick setup wizard: Country → WorkType → Remote → Hourly → Leave → Summary.
//!
//! The wizard is a value. `reduce` returns the next state and never mutates;
//! `commit` turns a finished summary into a full `WorkspacePolicy` in one go.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::HrError;
use crate::model::leave_policy::{AnnualLeaveType, LeavePolicy};
use crate::model::payroll::{
    BaseSalary, Deduction, DeductionType, OvertimeMultipliers, PayrollEngineSettings, SalaryType,
};
use crate::model::policy::{MAX_POLICY_VERSION_CHARS, PolicyStatus, WorkspacePolicy};
use crate::model::work_settings::{VerificationConfig, WorkSettings, WorkType, hm};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Country {
    Kr,
    Jp,
    Us,
    Other,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteChoice {
    pub remote_work_enabled: bool,
    pub gps_verification: bool,
    pub wifi_verification: bool,
}

/// Selections gathered so far; any may still be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Draft {
    pub country: Option<Country>,
    pub work_type: Option<WorkType>,
    pub remote: RemoteChoice,
    pub hourly_worker_enabled: bool,
    pub leave_policy: Option<AnnualLeaveType>,
}

/// Fully resolved selections, available only on the summary step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Selections {
    pub country: Country,
    pub work_type: WorkType,
    pub remote: RemoteChoice,
    pub hourly_worker_enabled: bool,
    pub leave_policy: AnnualLeaveType,
}

impl From<Selections> for Draft {
    fn from(s: Selections) -> Self {
        Draft {
            country: Some(s.country),
            work_type: Some(s.work_type),
            remote: s.remote,
            hourly_worker_enabled: s.hourly_worker_enabled,
            leave_policy: Some(s.leave_policy),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuickSetupState {
    Country(Draft),
    WorkType(Draft),
    Remote(Draft),
    Hourly(Draft),
    Leave(Draft),
    Summary(Selections),
}

impl Default for QuickSetupState {
    fn default() -> Self {
        QuickSetupState::Country(Draft::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum SetupAction {
    SelectCountry { country: Country },
    SelectWorkType { work_type: WorkType },
    ConfigureRemote(RemoteChoice),
    SetHourlyWorkers { enabled: bool },
    SelectLeavePolicy { leave_policy: AnnualLeaveType },
    Next,
    Back,
    Reset,
}

impl QuickSetupState {
    /// 1-based step number.
    pub fn step_number(&self) -> u8 {
        match self {
            QuickSetupState::Country(_) => 1,
            QuickSetupState::WorkType(_) => 2,
            QuickSetupState::Remote(_) => 3,
            QuickSetupState::Hourly(_) => 4,
            QuickSetupState::Leave(_) => 5,
            QuickSetupState::Summary(_) => 6,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            QuickSetupState::Country(_) => "COUNTRY",
            QuickSetupState::WorkType(_) => "WORK_TYPE",
            QuickSetupState::Remote(_) => "REMOTE",
            QuickSetupState::Hourly(_) => "HOURLY",
            QuickSetupState::Leave(_) => "LEAVE",
            QuickSetupState::Summary(_) => "SUMMARY",
        }
    }
}

fn rejected(state: &QuickSetupState, what: &str) -> HrError {
    HrError::InvalidTransition(format!("{what} is not allowed on step {}", state.name()))
}

pub fn reduce(state: QuickSetupState, action: SetupAction) -> Result<QuickSetupState, HrError> {
    use QuickSetupState as S;

    match (state, action) {
        (_, SetupAction::Reset) => Ok(S::default()),

        (S::Country(mut d), SetupAction::SelectCountry { country }) => {
            d.country = Some(country);
            Ok(S::Country(d))
        }
        (S::WorkType(mut d), SetupAction::SelectWorkType { work_type }) => {
            d.work_type = Some(work_type);
            Ok(S::WorkType(d))
        }
        (S::Remote(mut d), SetupAction::ConfigureRemote(choice)) => {
            d.remote = if choice.remote_work_enabled {
                choice
            } else {
                RemoteChoice::default()
            };
            Ok(S::Remote(d))
        }
        (S::Hourly(mut d), SetupAction::SetHourlyWorkers { enabled }) => {
            d.hourly_worker_enabled = enabled;
            Ok(S::Hourly(d))
        }
        (S::Leave(mut d), SetupAction::SelectLeavePolicy { leave_policy }) => {
            d.leave_policy = Some(leave_policy);
            Ok(S::Leave(d))
        }

        (S::Country(d), SetupAction::Next) if d.country.is_some() => Ok(S::WorkType(d)),
        (S::WorkType(d), SetupAction::Next) if d.work_type.is_some() => Ok(S::Remote(d)),
        (S::Remote(d), SetupAction::Next) => Ok(S::Hourly(d)),
        (S::Hourly(d), SetupAction::Next) => Ok(S::Leave(d)),
        (S::Leave(d), SetupAction::Next) => match (d.country, d.work_type, d.leave_policy) {
            (Some(country), Some(work_type), Some(leave_policy)) => Ok(S::Summary(Selections {
                country,
                work_type,
                remote: d.remote,
                hourly_worker_enabled: d.hourly_worker_enabled,
                leave_policy,
            })),
            _ => Err(HrError::InvalidTransition(
                "select a leave policy before continuing".into(),
            )),
        },
        (state @ (S::Country(_) | S::WorkType(_)), SetupAction::Next) => {
            Err(rejected(&state, "continuing without a selection"))
        }

        (S::WorkType(d), SetupAction::Back) => Ok(S::Country(d)),
        (S::Remote(d), SetupAction::Back) => Ok(S::WorkType(d)),
        (S::Hourly(d), SetupAction::Back) => Ok(S::Remote(d)),
        (S::Leave(d), SetupAction::Back) => Ok(S::Hourly(d)),
        (S::Summary(s), SetupAction::Back) => Ok(S::Leave(s.into())),

        (state, action) => Err(rejected(&state, &format!("{action:?}"))),
    }
}

fn country_payroll(country: Country) -> PayrollEngineSettings {
    match country {
        Country::Kr | Country::Other => PayrollEngineSettings::default(),
        Country::Jp => PayrollEngineSettings {
            base_salary: BaseSalary {
                salary_type: SalaryType::Monthly,
                amount: 3_000_000,
                standard_working_hours_per_month: 173.8,
            },
            overtime_multipliers: OvertimeMultipliers {
                overtime: 1.25,
                night: 1.25,
                holiday: 1.35,
                holiday_overtime: 1.6,
            },
            fixed_allowances: vec![],
            deductions: vec![
                Deduction {
                    name: "厚生年金".into(),
                    deduction_type: DeductionType::Rate,
                    value: 0.0915,
                    description: "Employees' pension insurance".into(),
                },
                Deduction {
                    name: "健康保険".into(),
                    deduction_type: DeductionType::Rate,
                    value: 0.05,
                    description: "Health insurance".into(),
                },
            ],
        },
        Country::Us => PayrollEngineSettings {
            base_salary: BaseSalary {
                salary_type: SalaryType::Monthly,
                amount: 3_000_000,
                standard_working_hours_per_month: 173.3,
            },
            overtime_multipliers: OvertimeMultipliers {
                overtime: 1.5,
                night: 1.0,
                holiday: 1.0,
                holiday_overtime: 1.5,
            },
            fixed_allowances: vec![],
            deductions: vec![
                Deduction {
                    name: "Social Security".into(),
                    deduction_type: DeductionType::Rate,
                    value: 0.062,
                    description: "OASDI".into(),
                },
                Deduction {
                    name: "Medicare".into(),
                    deduction_type: DeductionType::Rate,
                    value: 0.0145,
                    description: "HI".into(),
                },
            ],
        },
    }
}

fn country_leave(country: Country, leave_type: AnnualLeaveType) -> LeavePolicy {
    let mut policy = LeavePolicy::default();
    let annual = &mut policy.annual_leave;
    annual.leave_type = leave_type;
    match country {
        Country::Kr | Country::Other => {}
        Country::Jp => {
            annual.first_year_days = 10.0;
            annual.after_first_year_days = 11.0;
            annual.max_accumulated_days = 20.0;
            annual.carry_over_enabled = true;
            annual.carry_over_max_days = 20.0;
            annual.expiry_months = 24;
        }
        Country::Us => {
            annual.first_year_days = 10.0;
            annual.after_first_year_days = 15.0;
            annual.max_accumulated_days = 20.0;
        }
    }
    policy
}

fn work_type_settings(work_type: WorkType) -> WorkSettings {
    let mut settings = WorkSettings {
        work_type,
        ..Default::default()
    };
    match work_type {
        WorkType::Fixed | WorkType::Flexible => {}
        WorkType::CoreTime => {
            settings.work_start_time = hm(7, 0);
            settings.work_end_time = hm(22, 0);
            settings.core_time_start = Some(hm(10, 0));
            settings.core_time_end = Some(hm(16, 0));
        }
        WorkType::Autonomous => {
            settings.work_start_time = hm(0, 0);
            settings.work_end_time = hm(23, 59);
            settings.lunch_break = None;
        }
    }
    settings
}

const VERSION_PREFIX: &str = "quick-setup-";

/// `quick-setup-<base>`, without stacking prefixes across repeated commits.
fn quick_setup_version(base: &str) -> String {
    let room = MAX_POLICY_VERSION_CHARS as usize - VERSION_PREFIX.len();
    let origin: String = base
        .strip_prefix(VERSION_PREFIX)
        .unwrap_or(base)
        .chars()
        .take(room)
        .collect();
    format!("{VERSION_PREFIX}{origin}")
}

/// Materializes a finished wizard on top of `base`; the result is a DRAFT.
///
/// GPS verification reuses the office geofence already configured on `base`.
pub fn commit(selections: &Selections, base: &WorkspacePolicy) -> Result<WorkspacePolicy, HrError> {
    let gps = if selections.remote.gps_verification {
        Some(base.work_settings.verification.gps.ok_or_else(|| {
            HrError::validation("GPS verification needs an office geofence in workSettings.verification.gps")
        })?)
    } else {
        None
    };

    let mut work_settings = work_type_settings(selections.work_type);
    work_settings.office_ip_whitelist = base.work_settings.office_ip_whitelist.clone();
    work_settings.presence_check_enabled = selections.remote.remote_work_enabled;
    work_settings.presence_interval_minutes = base.work_settings.presence_interval_minutes.max(1);
    work_settings.verification = VerificationConfig {
        wifi_verification: selections.remote.wifi_verification,
        gps,
    };

    let policy = WorkspacePolicy {
        policy_version: quick_setup_version(&base.policy_version),
        policy_status: PolicyStatus::Draft,
        work_settings,
        late_policy: base.late_policy.clone(),
        payroll: country_payroll(selections.country),
        leave_policy: country_leave(selections.country, selections.leave_policy),
        hourly_workers_enabled: selections.hourly_worker_enabled,
        updated_at: None,
    };
    policy.ensure_valid()?;
    Ok(policy)
}
