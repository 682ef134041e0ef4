use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Module {
    Attendance,
    HrSettings,
    Payroll,
    Project,
    Contract,
    Meeting,
}

#[derive(
    Debug,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Approve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Permission {
    pub module: Module,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[schema(example = "hr_manager")]
    pub id: String,
    #[schema(example = "HR Manager")]
    pub name: String,
    #[schema(example = "인사담당자")]
    pub name_kor: String,
    pub permissions: Vec<Permission>,
}

impl Role {
    pub fn allows(&self, module: Module, action: Action) -> bool {
        self.permissions
            .iter()
            .any(|p| p.module == module && p.actions.contains(&action))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RbacModel {
    pub roles: Vec<Role>,
}

impl RbacModel {
    pub fn role(&self, id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == id)
    }
}

pub const DEFAULT_ROLE: &str = "employee";

fn grant(module: Module, actions: &[Action]) -> Permission {
    Permission {
        module,
        actions: actions.to_vec(),
    }
}

fn role(id: &str, name: &str, name_kor: &str, permissions: Vec<Permission>) -> Role {
    Role {
        id: id.to_string(),
        name: name.to_string(),
        name_kor: name_kor.to_string(),
        permissions,
    }
}

/// Static seed roles.
pub static RBAC: Lazy<RbacModel> = Lazy::new(|| {
    use Action::*;
    use strum::IntoEnumIterator;

    let everything: Vec<Action> = Action::iter().collect();
    RbacModel {
        roles: vec![
            role(
                "super_admin",
                "Super Admin",
                "최고관리자",
                Module::iter().map(|m| grant(m, &everything)).collect(),
            ),
            role(
                "hr_manager",
                "HR Manager",
                "인사담당자",
                vec![
                    grant(Module::Attendance, &[View, Create, Edit, Approve]),
                    grant(Module::HrSettings, &[View, Create, Edit, Approve]),
                    grant(Module::Payroll, &[View, Create, Edit]),
                    grant(Module::Project, &[View]),
                    grant(Module::Contract, &[View, Create, Edit]),
                    grant(Module::Meeting, &[View, Create]),
                ],
            ),
            role(
                "team_leader",
                "Team Leader",
                "팀장",
                vec![
                    grant(Module::Attendance, &[View, Approve]),
                    grant(Module::HrSettings, &[View]),
                    grant(Module::Project, &[View, Create, Edit, Delete]),
                    grant(Module::Contract, &[View]),
                    grant(Module::Meeting, &[View, Create, Edit, Delete]),
                ],
            ),
            role(
                DEFAULT_ROLE,
                "Employee",
                "직원",
                vec![
                    grant(Module::Attendance, &[View, Create]),
                    grant(Module::HrSettings, &[View]),
                    grant(Module::Project, &[View]),
                    grant(Module::Meeting, &[View, Create]),
                ],
            ),
        ],
    }
});
