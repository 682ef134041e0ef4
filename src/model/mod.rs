pub mod attendance;
pub mod leave_policy;
pub mod payroll;
pub mod policy;
pub mod presence;
pub mod quick_setup;
pub mod role;
pub mod work_settings;
