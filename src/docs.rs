use crate::api::attendance::{
    AttendanceAction, AttendanceActionRequest, AttendanceListResponse, AttendanceQuery,
    AttendanceResponse, CheckInRequest, PresenceResponse,
};
use crate::api::leave::{AccrualRequest, ApprovalRouteRequest, ApprovalRouteResponse};
use crate::api::payroll::ComputePayroll;
use crate::api::quick_setup::{CommitRequest, CommitResponse, ReduceRequest, ReduceResponse};
use crate::api::settings::StatusChange;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, AttendanceSummary, WorkLocation};
use crate::model::leave_policy::{
    AnnualLeave, AnnualLeaveType, ApprovalProcess, ApprovalRoute, CarryOver, LeaveAccrual,
    LeaveBalance, LeaveKind, LeavePolicy, SickLeave, SpecialLeave,
};
use crate::model::payroll::{
    BaseSalary, Deduction, DeductionLine, DeductionType, FixedAllowance, OvertimeMultipliers,
    PayCategory, PayrollEngineSettings, PayrollResult, PayrollWarning, PremiumLine, SalaryType,
    WorkedMinutes,
};
use crate::model::policy::{PolicyStatus, WorkspacePolicy};
use crate::model::presence::PresenceState;
use crate::model::role::{Action, Module, Permission, RbacModel, Role};
use crate::model::work_settings::{
    GpsFence, LatePolicy, LunchBreak, VerificationConfig, WorkSettings, WorkType,
};
use crate::utils::presence_tracker::PresenceSession;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "WorkHub HR API",
        version = "1.0.0",
        description = r#"
## WorkHub HR: attendance & work-policy engine

Backend for the attendance and HR-policy part of a groupware workspace.

### 🔹 Key Features
- **Attendance**
  - Daily check-in / check-out with office IP allow-list and GPS geofence
  - Lateness against the workspace work type, lunch-adjusted worked minutes
  - Server-side presence checks for remote workers
- **Payroll**
  - Hourly rate, overtime / night / holiday premiums, allowances and deductions
- **Leave**
  - Annual leave accrual, carry-over and approval routing
- **Settings**
  - Workspace policy documents with DRAFT → PENDING_APPROVAL → ACTIVE approval
  - Six-step quick setup wizard
  - Role / permission matrix

### 🔐 Caller identity
Authentication happens upstream. Protected endpoints read the caller from
the `x-user-id`, `x-workspace-id` and optional `x-user-role` headers.

### 📦 Errors
Every error body is `{ "error", "code", "details"? }`.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::attendance_action,
        crate::api::attendance::list_attendance,
        crate::api::attendance::presence_status,
        crate::api::attendance::confirm_presence,

        crate::api::settings::get_settings,
        crate::api::settings::save_settings,
        crate::api::settings::change_status,
        crate::api::settings::list_roles,

        crate::api::payroll::compute,

        crate::api::leave::accrual,
        crate::api::leave::approval_route,

        crate::api::quick_setup::reduce,
        crate::api::quick_setup::commit
    ),
    components(
        schemas(
            CheckInRequest,
            AttendanceAction,
            AttendanceActionRequest,
            AttendanceQuery,
            AttendanceResponse,
            AttendanceListResponse,
            PresenceResponse,
            PresenceSession,
            PresenceState,
            AttendanceRecord,
            AttendanceStatus,
            AttendanceSummary,
            WorkLocation,
            WorkspacePolicy,
            PolicyStatus,
            StatusChange,
            WorkSettings,
            WorkType,
            LunchBreak,
            GpsFence,
            VerificationConfig,
            LatePolicy,
            PayrollEngineSettings,
            BaseSalary,
            SalaryType,
            OvertimeMultipliers,
            FixedAllowance,
            Deduction,
            DeductionType,
            ComputePayroll,
            WorkedMinutes,
            PayCategory,
            PremiumLine,
            DeductionLine,
            PayrollWarning,
            PayrollResult,
            LeavePolicy,
            AnnualLeave,
            AnnualLeaveType,
            SickLeave,
            SpecialLeave,
            ApprovalProcess,
            LeaveKind,
            LeaveAccrual,
            CarryOver,
            LeaveBalance,
            AccrualRequest,
            ApprovalRouteRequest,
            ApprovalRouteResponse,
            ApprovalRoute,
            ReduceRequest,
            ReduceResponse,
            CommitRequest,
            CommitResponse,
            RbacModel,
            Role,
            Permission,
            Module,
            Action
        )
    ),
    tags(
        (name = "Attendance", description = "Check-in, check-out and presence checks"),
        (name = "Settings", description = "Workspace policy and roles"),
        (name = "Payroll", description = "Pay-period computation"),
        (name = "Leave", description = "Leave accrual and approval routing"),
        (name = "Quick setup", description = "Guided workspace setup"),
    )
)]
pub struct ApiDoc;
