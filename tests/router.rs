// Router-level tests driven in-process with tower's oneshot.
// These cover the surface that does not require a live database:
// public endpoints, the 404 fallback and the token gate.

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use etiquetas_api::auth::{generate_jwt, Claims};
use etiquetas_api::models::RoleName;

async fn send(request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = etiquetas_api::app().oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let body: Value = serde_json::from_slice(&bytes)?;
    Ok((status, body))
}

#[tokio::test]
async fn root_reports_service_info() -> Result<()> {
    let (status, body) = send(Request::builder().uri("/").body(Body::empty())?).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "API Sistema de Etiquetas");
    assert!(body.get("version").is_some());
    Ok(())
}

#[tokio::test]
async fn unknown_route_returns_envelope_with_path() -> Result<()> {
    let (status, body) =
        send(Request::builder().uri("/api/no-existe").body(Body::empty())?).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Ruta no encontrada");
    assert_eq!(body["path"], "/api/no-existe");
    Ok(())
}

#[tokio::test]
async fn protected_route_without_token_is_401() -> Result<()> {
    let (status, body) =
        send(Request::builder().uri("/api/articulos").body(Body::empty())?).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "No se proporcionó token de autenticación");
    Ok(())
}

#[tokio::test]
async fn malformed_authorization_header_is_401() -> Result<()> {
    let (status, body) = send(
        Request::builder()
            .uri("/api/usuarios")
            .header("authorization", "Token abc")
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Formato de token inválido");
    Ok(())
}

#[tokio::test]
async fn garbage_bearer_token_is_401() -> Result<()> {
    let (status, body) = send(
        Request::builder()
            .uri("/api/auth/verificar-token")
            .header("authorization", "Bearer no.es.jwt")
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token inválido");
    Ok(())
}

#[tokio::test]
async fn expired_token_is_distinguished_from_invalid() -> Result<()> {
    let now = chrono::Utc::now();
    let claims = Claims {
        user_id: 1,
        username: "jperez".to_string(),
        rol: RoleName::Administrador,
        exp: (now - chrono::Duration::hours(1)).timestamp(),
        iat: (now - chrono::Duration::hours(9)).timestamp(),
    };
    let token = generate_jwt(&claims)?;

    let (status, body) = send(
        Request::builder()
            .uri("/api/articulos")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token expirado");
    Ok(())
}

#[tokio::test]
async fn login_without_credentials_is_validation_error() -> Result<()> {
    let (status, body) = send(
        Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header("content-type", "application/json")
            .body(Body::from("{}"))?,
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Username y password son requeridos");
    assert_eq!(body["code"], "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn login_with_missing_body_is_validation_error() -> Result<()> {
    let (status, body) = send(
        Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .body(Body::empty())?,
    )
    .await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Username y password son requeridos");
    Ok(())
}
