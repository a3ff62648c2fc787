use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::auth::{decode_jwt, TokenError};
use crate::database;
use crate::error::ApiError;
use crate::models::RoleName;

/// Authenticated identity attached to the request after token validation.
#[derive(Clone, Debug, Serialize)]
pub struct CurrentUser {
    pub id: i32,
    pub uuid: Uuid,
    pub username: String,
    pub email: String,
    pub nombre: String,
    pub apellido: String,
    #[serde(rename = "rolId")]
    pub rol_id: i32,
    pub rol: RoleName,
}

#[derive(FromRow)]
struct AuthRow {
    id: i32,
    uuid: Uuid,
    username: String,
    email: String,
    nombre: String,
    apellido: String,
    rol_id: i32,
    rol_nombre: String,
}

const RELOAD_USER_SQL: &str = r#"
    SELECT u.id, u.uuid, u.username, u.email, u.nombre, u.apellido,
           u.rol_id, r.nombre AS rol_nombre
    FROM usuarios u
    INNER JOIN roles r ON u.rol_id = r.id
    WHERE u.id = $1 AND u.activo = true
"#;

/// Bearer-token middleware for protected routes. Rejects with 401 on any
/// failure; on success attaches [`CurrentUser`] for downstream handlers.
pub async fn require_auth(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&headers).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Optional variant: same checks, but any failure silently proceeds
/// without an identity instead of rejecting.
pub async fn optional_auth(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    if let Ok(user) = authenticate(&headers).await {
        request.extensions_mut().insert(user);
    }
    next.run(request).await
}

async fn authenticate(headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let token = extract_bearer_token(headers)?;

    let claims = decode_jwt(&token).map_err(|e| match e {
        TokenError::Expired => ApiError::unauthorized("Token expirado"),
        _ => ApiError::unauthorized("Token inválido"),
    })?;

    // A cryptographically valid token is not enough: the user must still
    // exist and be active. Revocation is modeled by flipping `activo`.
    let pool = database::pool()?;
    let row = sqlx::query_as::<_, AuthRow>(RELOAD_USER_SQL)
        .bind(claims.user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::db("Error al verificar token", e))?
        .ok_or_else(|| ApiError::unauthorized("Usuario no encontrado o inactivo"))?;

    let rol = RoleName::from_str(&row.rol_nombre)
        .map_err(|_| ApiError::internal("Rol de usuario desconocido"))?;

    Ok(CurrentUser {
        id: row.id,
        uuid: row.uuid,
        username: row.username,
        email: row.email,
        nombre: row.nombre,
        apellido: row.apellido,
        rol_id: row.rol_id,
        rol,
    })
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("No se proporcionó token de autenticación"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Formato de token inválido"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        _ => Err(ApiError::unauthorized("Formato de token inválido")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_header_is_rejected() {
        let err = extract_bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.message(), "No se proporcionó token de autenticación");
    }

    #[test]
    fn malformed_header_is_rejected() {
        for bad in ["Bearer", "Bearer ", "Token abc", "abc"] {
            let err = extract_bearer_token(&headers_with(bad)).unwrap_err();
            assert_eq!(err.message(), "Formato de token inválido", "case: {bad}");
        }
    }

    #[test]
    fn bearer_token_is_extracted() {
        let token = extract_bearer_token(&headers_with("Bearer abc.def.ghi")).unwrap();
        assert_eq!(token, "abc.def.ghi");
    }

    #[tokio::test]
    async fn optional_auth_passes_through_without_identity() {
        use axum::body::Body;
        use axum::http::{Request, StatusCode};
        use axum::middleware::from_fn;
        use axum::routing::get;
        use axum::{Extension, Router};
        use http_body_util::BodyExt;
        use tower::ServiceExt;

        async fn whoami(user: Option<Extension<CurrentUser>>) -> &'static str {
            if user.is_some() {
                "identificado"
            } else {
                "anonimo"
            }
        }

        let app = Router::new()
            .route("/", get(whoami))
            .layer(from_fn(optional_auth));

        // Without a header the request reaches the handler with no identity
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"anonimo");

        // A token that fails validation behaves the same, not a 401
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("authorization", "Bearer no.es.jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"anonimo");
    }
}
