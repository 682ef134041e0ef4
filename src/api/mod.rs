pub mod attendance;
pub mod leave;
pub mod payroll;
pub mod quick_setup;
pub mod settings;
