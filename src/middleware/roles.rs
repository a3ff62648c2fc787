use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::models::RoleName;

/// Guard for admin-only operations (user writes, article delete/status).
pub async fn require_administrador(request: Request, next: Next) -> Result<Response, ApiError> {
    check_roles(&request, &[RoleName::Administrador])?;
    Ok(next.run(request).await)
}

/// Guard for article create/update.
pub async fn require_admin_o_supervisor(
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    check_roles(&request, &[RoleName::Administrador, RoleName::Supervisor])?;
    Ok(next.run(request).await)
}

/// Allow-list check against the identity attached by the auth middleware.
/// Must run after authentication; a missing identity is a 401, not a 403.
fn check_roles(request: &Request, allowed: &[RoleName]) -> Result<(), ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::unauthorized("Usuario no autenticado"))?;

    if allowed.contains(&user.rol) {
        Ok(())
    } else {
        Err(ApiError::forbidden(allowed, user.rol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use uuid::Uuid;

    fn request_as(rol: RoleName) -> Request {
        let mut request = Request::new(Body::empty());
        request.extensions_mut().insert(CurrentUser {
            id: 1,
            uuid: Uuid::nil(),
            username: "jperez".into(),
            email: "jperez@example.com".into(),
            nombre: "Juan".into(),
            apellido: "Pérez".into(),
            rol_id: 2,
            rol,
        });
        request
    }

    #[test]
    fn allowed_role_passes() {
        let request = request_as(RoleName::Supervisor);
        assert!(check_roles(&request, &[RoleName::Administrador, RoleName::Supervisor]).is_ok());
    }

    #[test]
    fn disallowed_role_is_forbidden_with_role_echo() {
        let request = request_as(RoleName::Supervisor);
        let err = check_roles(&request, &[RoleName::Administrador]).unwrap_err();
        let body = err.to_json();
        assert_eq!(body["rolRequerido"], serde_json::json!(["Administrador"]));
        assert_eq!(body["tuRol"], "Supervisor");
    }

    #[test]
    fn missing_identity_is_unauthenticated() {
        let request = Request::new(Body::empty());
        let err = check_roles(&request, &[RoleName::Administrador]).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
