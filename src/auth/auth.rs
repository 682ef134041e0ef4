use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::HrError;
use crate::model::role::{Action, Module, Role};

/// Caller identity placed in the request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub workspace_id: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = HrError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| HrError::Unauthorized("Missing caller identity".into())),
        )
    }
}

impl AuthUser {
    pub fn require(&self, module: Module, action: Action) -> Result<(), HrError> {
        if self.role.allows(module, action) {
            Ok(())
        } else {
            Err(HrError::Forbidden(format!(
                "Role {} lacks {}:{}",
                self.role.id, module, action
            )))
        }
    }
}
