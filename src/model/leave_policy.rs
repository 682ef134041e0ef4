use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AnnualLeaveType {
    LegalStandard,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_annual_leave"))]
pub struct AnnualLeave {
    #[serde(rename = "type")]
    pub leave_type: AnnualLeaveType,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    #[schema(example = 11.0)]
    pub first_year_days: f64,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    #[schema(example = 15.0)]
    pub after_first_year_days: f64,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    #[schema(example = 25.0)]
    pub max_accumulated_days: f64,
    pub carry_over_enabled: bool,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    #[schema(example = 5.0)]
    pub carry_over_max_days: f64,
    #[schema(example = 12)]
    pub expiry_months: u32,
}

fn validate_annual_leave(leave: &AnnualLeave) -> Result<(), ValidationError> {
    if leave.leave_type == AnnualLeaveType::LegalStandard
        && leave.after_first_year_days < leave.first_year_days
    {
        let mut err = ValidationError::new("after_first_year_days");
        err.message = Some("afterFirstYearDays must be at least firstYearDays".into());
        return Err(err);
    }
    if leave.carry_over_enabled && leave.carry_over_max_days > leave.max_accumulated_days {
        let mut err = ValidationError::new("carry_over_max_days");
        err.message = Some("carryOverMaxDays must not exceed maxAccumulatedDays".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SickLeave {
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub paid_days: f64,
    pub requires_document: bool,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub document_after_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpecialLeave {
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub marriage: f64,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub bereavement: f64,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub child_birth: f64,
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub family_care: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalProcess {
    /// Requests shorter than this many days are approved automatically.
    #[validate(range(min = 0.0, message = "must not be negative"))]
    pub auto_approve_under: f64,
    pub require_manager_approval: bool,
    #[serde(rename = "requireHRApproval")]
    pub require_hr_approval: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LeavePolicy {
    #[validate(nested)]
    pub annual_leave: AnnualLeave,
    #[validate(nested)]
    pub sick_leave: SickLeave,
    #[validate(nested)]
    pub special_leave: SpecialLeave,
    #[validate(nested)]
    pub approval_process: ApprovalProcess,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        Self {
            annual_leave: AnnualLeave {
                leave_type: AnnualLeaveType::LegalStandard,
                first_year_days: 11.0,
                after_first_year_days: 15.0,
                max_accumulated_days: 25.0,
                carry_over_enabled: false,
                carry_over_max_days: 5.0,
                expiry_months: 12,
            },
            sick_leave: SickLeave {
                paid_days: 3.0,
                requires_document: true,
                document_after_days: 2.0,
            },
            special_leave: SpecialLeave {
                marriage: 5.0,
                bereavement: 5.0,
                child_birth: 10.0,
                family_care: 10.0,
            },
            approval_process: ApprovalProcess {
                auto_approve_under: 1.0,
                require_manager_approval: true,
                require_hr_approval: false,
            },
        }
    }
}

/// Whole months from `from` to `to`; a month completes on the same day-of-month.
pub fn completed_months(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }
    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }
    // A hire on the 31st completes a month at the end of a shorter month.
    if months >= 0 {
        let next = from.checked_add_months(Months::new(months as u32 + 1));
        if next.is_some_and(|n| n <= to) {
            months += 1;
        }
    }
    months.max(0) as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveAccrual {
    pub completed_months: u32,
    pub accrued_days: f64,
}

pub fn accrue_annual_leave(policy: &LeavePolicy, hire_date: NaiveDate, as_of: NaiveDate) -> LeaveAccrual {
    let annual = &policy.annual_leave;
    let months = completed_months(hire_date, as_of);

    let accrued_days = match annual.leave_type {
        AnnualLeaveType::LegalStandard if months < 12 => f64::from(months).min(annual.first_year_days),
        AnnualLeaveType::LegalStandard => annual.after_first_year_days.min(annual.max_accumulated_days),
        AnnualLeaveType::Custom if months < 12 => annual.first_year_days,
        AnnualLeaveType::Custom => annual.after_first_year_days,
    };

    LeaveAccrual {
        completed_months: months,
        accrued_days,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CarryOver {
    pub days: f64,
    #[schema(value_type = String, format = "date")]
    pub expires_on: NaiveDate,
}

/// Unused days rolled into the next cycle, if the policy allows it.
pub fn carry_over(policy: &LeavePolicy, unused_days: f64, grant_date: NaiveDate) -> Option<CarryOver> {
    let annual = &policy.annual_leave;
    if !annual.carry_over_enabled || unused_days <= 0.0 {
        return None;
    }
    let expires_on = grant_date
        .checked_add_months(Months::new(annual.expiry_months))
        .unwrap_or(NaiveDate::MAX);
    Some(CarryOver {
        days: unused_days.min(annual.carry_over_max_days),
        expires_on,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveBalance {
    pub accrual: LeaveAccrual,
    pub carry_over: Option<CarryOver>,
    pub total_days: f64,
}

pub fn leave_balance(
    policy: &LeavePolicy,
    hire_date: NaiveDate,
    as_of: NaiveDate,
    carried: Option<CarryOver>,
) -> LeaveBalance {
    let accrual = accrue_annual_leave(policy, hire_date, as_of);
    let carry_over = carried.filter(|c| c.expires_on > as_of);
    let total_days = accrual.accrued_days + carry_over.as_ref().map_or(0.0, |c| c.days);
    LeaveBalance {
        accrual,
        carry_over,
        total_days,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveKind {
    Annual,
    Sick,
    Marriage,
    Bereavement,
    ChildBirth,
    FamilyCare,
}

impl LeavePolicy {
    /// Allotment for special leave kinds; `None` for annual and sick leave.
    pub fn special_leave_days(&self, kind: LeaveKind) -> Option<f64> {
        let special = &self.special_leave;
        match kind {
            LeaveKind::Marriage => Some(special.marriage),
            LeaveKind::Bereavement => Some(special.bereavement),
            LeaveKind::ChildBirth => Some(special.child_birth),
            LeaveKind::FamilyCare => Some(special.family_care),
            LeaveKind::Annual | LeaveKind::Sick => None,
        }
    }

    pub fn sick_leave_requires_document(&self, days: f64) -> bool {
        self.sick_leave.requires_document && days > self.sick_leave.document_after_days
    }

    pub fn approval_route(&self, days: f64) -> ApprovalRoute {
        let process = &self.approval_process;
        if days < process.auto_approve_under {
            return ApprovalRoute {
                auto_approved: true,
                manager: false,
                hr: false,
            };
        }
        ApprovalRoute {
            auto_approved: !process.require_manager_approval && !process.require_hr_approval,
            manager: process.require_manager_approval,
            hr: process.require_hr_approval,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRoute {
    pub auto_approved: bool,
    pub manager: bool,
    pub hr: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn completed_months_counts_anniversaries() {
        assert_eq!(completed_months(date(2025, 1, 15), date(2025, 1, 14)), 0);
        assert_eq!(completed_months(date(2025, 1, 15), date(2025, 2, 14)), 0);
        assert_eq!(completed_months(date(2025, 1, 15), date(2025, 2, 15)), 1);
        assert_eq!(completed_months(date(2025, 1, 15), date(2026, 1, 15)), 12);
        assert_eq!(completed_months(date(2025, 1, 31), date(2025, 2, 28)), 1);
    }

    #[test]
    fn first_year_accrues_one_day_per_month() {
        let policy = LeavePolicy::default();
        let accrual = accrue_annual_leave(&policy, date(2025, 1, 15), date(2025, 6, 20));
        assert_eq!(accrual.completed_months, 5);
        assert_eq!(accrual.accrued_days, 5.0);

        let accrual = accrue_annual_leave(&policy, date(2025, 1, 15), date(2026, 1, 10));
        assert_eq!(accrual.completed_months, 11);
        assert_eq!(accrual.accrued_days, 11.0);
    }

    #[test]
    fn twelve_completed_months_switch_to_after_first_year() {
        let policy = LeavePolicy::default();
        let accrual = accrue_annual_leave(&policy, date(2025, 1, 15), date(2026, 1, 15));
        assert_eq!(accrual.completed_months, 12);
        assert_eq!(accrual.accrued_days, 15.0);
    }

    #[test]
    fn after_first_year_is_capped() {
        let mut policy = LeavePolicy::default();
        policy.annual_leave.after_first_year_days = 30.0;
        let accrual = accrue_annual_leave(&policy, date(2020, 1, 1), date(2026, 1, 1));
        assert_eq!(accrual.accrued_days, 25.0);
    }

    #[test]
    fn custom_mode_uses_constants() {
        let mut policy = LeavePolicy::default();
        policy.annual_leave.leave_type = AnnualLeaveType::Custom;
        policy.annual_leave.first_year_days = 8.0;
        policy.annual_leave.after_first_year_days = 30.0;

        assert_eq!(accrue_annual_leave(&policy, date(2025, 1, 1), date(2025, 2, 1)).accrued_days, 8.0);
        assert_eq!(accrue_annual_leave(&policy, date(2020, 1, 1), date(2026, 1, 1)).accrued_days, 30.0);
    }

    #[test]
    fn carry_over_is_capped_and_expires() {
        let mut policy = LeavePolicy::default();
        assert_eq!(carry_over(&policy, 7.0, date(2026, 1, 1)), None);

        policy.annual_leave.carry_over_enabled = true;
        let carried = carry_over(&policy, 7.0, date(2026, 1, 1)).unwrap();
        assert_eq!(carried.days, 5.0);
        assert_eq!(carried.expires_on, date(2027, 1, 1));

        let balance = leave_balance(&policy, date(2020, 1, 1), date(2026, 6, 1), Some(carried.clone()));
        assert_eq!(balance.total_days, 20.0);

        let expired = leave_balance(&policy, date(2020, 1, 1), date(2027, 1, 1), Some(carried));
        assert_eq!(expired.carry_over, None);
        assert_eq!(expired.total_days, 15.0);
    }

    #[test]
    fn legal_standard_requires_non_decreasing_days() {
        let mut policy = LeavePolicy::default();
        policy.annual_leave.after_first_year_days = 5.0;
        assert!(policy.validate().is_err());

        policy.annual_leave.leave_type = AnnualLeaveType::Custom;
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn negative_days_are_rejected() {
        let mut policy = LeavePolicy::default();
        policy.special_leave.marriage = -1.0;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn approval_route_and_documents() {
        let policy = LeavePolicy::default();
        assert!(policy.approval_route(0.5).auto_approved);
        let route = policy.approval_route(3.0);
        assert!(!route.auto_approved);
        assert!(route.manager);
        assert!(!route.hr);

        assert!(!policy.sick_leave_requires_document(2.0));
        assert!(policy.sick_leave_requires_document(3.0));
        assert_eq!(policy.special_leave_days(LeaveKind::ChildBirth), Some(10.0));
        assert_eq!(policy.special_leave_days(LeaveKind::Annual), None);
    }
}
