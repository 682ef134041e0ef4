use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::HrError;

/// Upper bound for any single money amount, in won.
pub const MAX_WON: i64 = 1_000_000_000_000;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SalaryType {
    Monthly,
    Hourly,
    Freelancer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BaseSalary {
    #[serde(rename = "type")]
    pub salary_type: SalaryType,
    /// Monthly salary for MONTHLY, hourly wage otherwise. Won.
    #[validate(range(min = 0, max = MAX_WON, message = "must be between 0 and 1,000,000,000,000 won"))]
    #[schema(example = 3000000)]
    pub amount: i64,
    #[validate(range(exclusive_min = 0.0, max = 744.0, message = "must be between 0 and 744 hours"))]
    #[schema(example = 209.0)]
    pub standard_working_hours_per_month: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeMultipliers {
    #[validate(range(min = 1.0, message = "multiplier must be at least 1.0"))]
    #[schema(example = 1.5)]
    pub overtime: f64,
    #[validate(range(min = 1.0, message = "multiplier must be at least 1.0"))]
    #[schema(example = 1.5)]
    pub night: f64,
    #[validate(range(min = 1.0, message = "multiplier must be at least 1.0"))]
    #[schema(example = 1.5)]
    pub holiday: f64,
    #[validate(range(min = 1.0, message = "multiplier must be at least 1.0"))]
    #[schema(example = 2.0)]
    pub holiday_overtime: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FixedAllowance {
    #[validate(length(min = 1, message = "name is required"))]
    #[schema(example = "식대")]
    pub name: String,
    #[validate(range(min = 0, max = MAX_WON, message = "must be between 0 and 1,000,000,000,000 won"))]
    #[schema(example = 200000)]
    pub amount: i64,
    pub taxable: bool,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeductionType {
    Rate,
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_deduction_value"))]
pub struct Deduction {
    #[validate(length(min = 1, message = "name is required"))]
    #[schema(example = "국민연금")]
    pub name: String,
    #[serde(rename = "type")]
    pub deduction_type: DeductionType,
    /// Fraction of taxable gross for RATE, won for FIXED.
    #[schema(example = 0.045)]
    pub value: f64,
    #[serde(default)]
    pub description: String,
}

fn validate_deduction_value(deduction: &Deduction) -> Result<(), ValidationError> {
    let ok = match deduction.deduction_type {
        DeductionType::Rate => (0.0..=1.0).contains(&deduction.value),
        DeductionType::Fixed => (0.0..=MAX_WON as f64).contains(&deduction.value),
    };
    if ok {
        return Ok(());
    }
    let mut err = ValidationError::new("deduction_value");
    err.message = Some(match deduction.deduction_type {
        DeductionType::Rate => "RATE deduction value must be within [0, 1]".into(),
        DeductionType::Fixed => "FIXED deduction value must be between 0 and 1,000,000,000,000 won".into(),
    });
    Err(err)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PayrollEngineSettings {
    #[validate(nested)]
    pub base_salary: BaseSalary,
    #[validate(nested)]
    pub overtime_multipliers: OvertimeMultipliers,
    #[validate(nested)]
    pub fixed_allowances: Vec<FixedAllowance>,
    #[validate(nested)]
    pub deductions: Vec<Deduction>,
}

fn rate(name: &str, value: f64, description: &str) -> Deduction {
    Deduction {
        name: name.to_string(),
        deduction_type: DeductionType::Rate,
        value,
        description: description.to_string(),
    }
}

impl Default for PayrollEngineSettings {
    fn default() -> Self {
        Self {
            base_salary: BaseSalary {
                salary_type: SalaryType::Monthly,
                amount: 3_000_000,
                standard_working_hours_per_month: 209.0,
            },
            overtime_multipliers: OvertimeMultipliers {
                overtime: 1.5,
                night: 1.5,
                holiday: 1.5,
                holiday_overtime: 2.0,
            },
            fixed_allowances: vec![FixedAllowance {
                name: "식대".into(),
                amount: 200_000,
                taxable: false,
            }],
            deductions: vec![
                rate("국민연금", 0.045, "National pension"),
                rate("건강보험", 0.03545, "National health insurance"),
                rate("장기요양보험", 0.004591, "Long-term care insurance"),
                rate("고용보험", 0.009, "Employment insurance"),
            ],
        }
    }
}

/// Worked minutes split by pay category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkedMinutes {
    pub regular: u32,
    pub overtime: u32,
    pub night: u32,
    pub holiday: u32,
    pub holiday_overtime: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, EnumIter)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayCategory {
    Overtime,
    Night,
    Holiday,
    HolidayOvertime,
}

impl PayCategory {
    fn minutes(self, worked: &WorkedMinutes) -> u32 {
        match self {
            PayCategory::Overtime => worked.overtime,
            PayCategory::Night => worked.night,
            PayCategory::Holiday => worked.holiday,
            PayCategory::HolidayOvertime => worked.holiday_overtime,
        }
    }

    fn multiplier(self, multipliers: &OvertimeMultipliers) -> f64 {
        match self {
            PayCategory::Overtime => multipliers.overtime,
            PayCategory::Night => multipliers.night,
            PayCategory::Holiday => multipliers.holiday,
            PayCategory::HolidayOvertime => multipliers.holiday_overtime,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PremiumLine {
    pub category: PayCategory,
    pub minutes: u32,
    pub multiplier: f64,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeductionLine {
    pub name: String,
    #[serde(rename = "type")]
    pub deduction_type: DeductionType,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayrollWarning {
    /// Deductions exceed gross pay; net pay was clamped to zero.
    DeductionsExceedGross { shortfall: i64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PayrollResult {
    pub salary_type: SalaryType,
    pub hourly_rate: f64,
    pub base_pay: i64,
    pub premiums: Vec<PremiumLine>,
    pub allowances_total: i64,
    pub gross_pay: i64,
    pub taxable_gross: i64,
    pub deductions: Vec<DeductionLine>,
    pub total_deductions: i64,
    pub net_pay: i64,
    pub warnings: Vec<PayrollWarning>,
}

fn won(amount: f64) -> i64 {
    amount.round() as i64
}

fn total(amounts: impl IntoIterator<Item = i64>) -> Result<i64, HrError> {
    amounts
        .into_iter()
        .try_fold(0i64, i64::checked_add)
        .ok_or_else(|| HrError::validation("payroll: amounts exceed the supported range"))
}

/// Gross, deductions and net pay for one pay period.
pub fn compute_payroll(
    settings: &PayrollEngineSettings,
    worked: &WorkedMinutes,
    salary_type_override: Option<SalaryType>,
) -> Result<PayrollResult, HrError> {
    settings.validate()?;

    let base = &settings.base_salary;
    let salary_type = salary_type_override.unwrap_or(base.salary_type);
    let hourly_rate = match salary_type {
        SalaryType::Monthly => base.amount as f64 / base.standard_working_hours_per_month,
        SalaryType::Hourly | SalaryType::Freelancer => base.amount as f64,
    };
    let base_pay = match salary_type {
        SalaryType::Monthly => base.amount,
        SalaryType::Hourly | SalaryType::Freelancer => {
            won(f64::from(worked.regular) / 60.0 * hourly_rate)
        }
    };

    let premiums: Vec<PremiumLine> = <PayCategory as strum::IntoEnumIterator>::iter()
        .map(|category| {
            let minutes = category.minutes(worked);
            let multiplier = category.multiplier(&settings.overtime_multipliers);
            PremiumLine {
                category,
                minutes,
                multiplier,
                amount: won(f64::from(minutes) / 60.0 * hourly_rate * multiplier),
            }
        })
        .filter(|line| line.minutes > 0)
        .collect();

    let allowances_total = total(settings.fixed_allowances.iter().map(|a| a.amount))?;
    let non_taxable = total(
        settings
            .fixed_allowances
            .iter()
            .filter(|a| !a.taxable)
            .map(|a| a.amount),
    )?;

    let gross_pay = total(
        [base_pay, allowances_total]
            .into_iter()
            .chain(premiums.iter().map(|p| p.amount)),
    )?;
    let taxable_gross = gross_pay - non_taxable;

    let deductions: Vec<DeductionLine> = settings
        .deductions
        .iter()
        .map(|d| DeductionLine {
            name: d.name.clone(),
            deduction_type: d.deduction_type,
            amount: match d.deduction_type {
                DeductionType::Rate => won(d.value * taxable_gross as f64),
                DeductionType::Fixed => won(d.value),
            },
        })
        .collect();
    let total_deductions = total(deductions.iter().map(|d| d.amount))?;

    let mut warnings = Vec::new();
    let net_pay = if total_deductions > gross_pay {
        warnings.push(PayrollWarning::DeductionsExceedGross {
            shortfall: total_deductions - gross_pay,
        });
        0
    } else {
        gross_pay - total_deductions
    };

    Ok(PayrollResult {
        salary_type,
        hourly_rate,
        base_pay,
        premiums,
        allowances_total,
        gross_pay,
        taxable_gross,
        deductions,
        total_deductions,
        net_pay,
        warnings,
    })
}
