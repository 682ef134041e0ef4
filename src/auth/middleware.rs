use crate::auth::auth::AuthUser;
use crate::model::role::{DEFAULT_ROLE, RBAC};
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
};
use serde_json::json;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const WORKSPACE_ID_HEADER: &str = "x-workspace-id";
pub const ROLE_HEADER: &str = "x-user-role";

fn header<'a>(req: &'a ServiceRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn unauthorized(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(json!({"error": message, "code": "UNAUTHORIZED"}));
    req.into_response(resp.map_into_boxed_body())
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let user_id = match header(&req, USER_ID_HEADER) {
        Some(v) => v.to_string(),
        None => return Ok(unauthorized(req, "Missing x-user-id header")),
    };
    let workspace_id = match header(&req, WORKSPACE_ID_HEADER) {
        Some(v) => v.to_string(),
        None => return Ok(unauthorized(req, "Missing x-workspace-id header")),
    };
    let role_id = header(&req, ROLE_HEADER).unwrap_or(DEFAULT_ROLE).to_string();

    let role = match RBAC.role(&role_id) {
        Some(role) => role.clone(),
        None => return Ok(unauthorized(req, "Unknown role")),
    };

    req.extensions_mut().insert(AuthUser {
        user_id,
        workspace_id,
        role,
    });

    next.call(req).await
}
