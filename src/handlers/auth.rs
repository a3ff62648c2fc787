use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::FromRow;
use std::str::FromStr;

use crate::auth::{self, Claims};
use crate::database;
use crate::error::ApiError;
use crate::middleware::auth::CurrentUser;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{Perfil, RoleName, UsuarioConRol};

const LOGIN_SQL: &str = r#"
    SELECT u.id, u.uuid, u.username, u.email, u.password_hash,
           u.nombre, u.apellido, u.rol_id, r.nombre AS rol_nombre, u.activo
    FROM usuarios u
    INNER JOIN roles r ON u.rol_id = r.id
    WHERE u.username = $1
"#;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// POST /api/auth/login
pub async fn login(body: Option<Json<LoginRequest>>) -> ApiResult<Value> {
    let Some(Json(body)) = body else {
        return Err(ApiError::validation("Username y password son requeridos"));
    };
    let (Some(username), Some(password)) = (body.username, body.password) else {
        return Err(ApiError::validation("Username y password son requeridos"));
    };

    let pool = database::pool()?;
    let usuario = sqlx::query_as::<_, UsuarioConRol>(LOGIN_SQL)
        .bind(&username)
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::db("Error al procesar login", e))?
        .ok_or_else(|| ApiError::unauthorized("Credenciales inválidas"))?;

    if !usuario.activo {
        return Err(ApiError::unauthorized("Usuario inactivo. Contacta al administrador."));
    }

    // Token issuance is strictly gated on the password check; a mismatch
    // must not touch ultimo_acceso either.
    let password_valido = auth::verify_password(&password, &usuario.password_hash)
        .map_err(|e| {
            tracing::error!("password verification failed: {}", e);
            ApiError::internal("Error al procesar login")
        })?;

    if !password_valido {
        return Err(ApiError::unauthorized("Credenciales inválidas"));
    }

    sqlx::query("UPDATE usuarios SET ultimo_acceso = CURRENT_TIMESTAMP WHERE id = $1")
        .bind(usuario.id)
        .execute(pool)
        .await
        .map_err(|e| ApiError::db("Error al procesar login", e))?;

    let rol = RoleName::from_str(&usuario.rol_nombre)
        .map_err(|_| ApiError::internal("Rol de usuario desconocido"))?;

    let claims = Claims::new(usuario.id, usuario.username.clone(), rol);
    let token = auth::generate_jwt(&claims).map_err(|e| {
        tracing::error!("token generation failed: {}", e);
        ApiError::internal("Error al procesar login")
    })?;

    let perfil = Perfil {
        id: usuario.id,
        uuid: usuario.uuid,
        nombre_completo: format!("{} {}", usuario.nombre, usuario.apellido),
        username: usuario.username,
        email: usuario.email,
        nombre: usuario.nombre,
        apellido: usuario.apellido,
        rol,
        rol_id: usuario.rol_id,
        ultimo_acceso: None,
        creado_en: None,
    };

    Ok(ApiResponse::success(json!({
        "message": "Login exitoso",
        "token": token,
        "usuario": perfil,
    })))
}

#[derive(FromRow)]
struct PerfilRow {
    id: i32,
    uuid: uuid::Uuid,
    username: String,
    email: String,
    nombre: String,
    apellido: String,
    rol_id: i32,
    rol_nombre: String,
    ultimo_acceso: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
}

const PERFIL_SQL: &str = r#"
    SELECT u.id, u.uuid, u.username, u.email, u.nombre, u.apellido,
           u.rol_id, r.nombre AS rol_nombre, u.ultimo_acceso, u.created_at
    FROM usuarios u
    INNER JOIN roles r ON u.rol_id = r.id
    WHERE u.id = $1
"#;

/// GET /api/auth/perfil
pub async fn perfil(Extension(user): Extension<CurrentUser>) -> ApiResult<Value> {
    let pool = database::pool()?;
    let row = sqlx::query_as::<_, PerfilRow>(PERFIL_SQL)
        .bind(user.id)
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::db("Error al obtener perfil", e))?
        .ok_or_else(|| ApiError::not_found("Usuario no encontrado"))?;

    let rol = RoleName::from_str(&row.rol_nombre)
        .map_err(|_| ApiError::internal("Rol de usuario desconocido"))?;

    let perfil = Perfil {
        id: row.id,
        uuid: row.uuid,
        nombre_completo: format!("{} {}", row.nombre, row.apellido),
        username: row.username,
        email: row.email,
        nombre: row.nombre,
        apellido: row.apellido,
        rol,
        rol_id: row.rol_id,
        ultimo_acceso: row.ultimo_acceso,
        creado_en: Some(row.created_at),
    };

    Ok(ApiResponse::success(json!({ "usuario": perfil })))
}

#[derive(Debug, Deserialize)]
pub struct CambiarPasswordRequest {
    #[serde(rename = "passwordActual")]
    pub password_actual: Option<String>,
    #[serde(rename = "passwordNuevo")]
    pub password_nuevo: Option<String>,
}

/// POST /api/auth/cambiar-password
pub async fn cambiar_password(
    Extension(user): Extension<CurrentUser>,
    body: Option<Json<CambiarPasswordRequest>>,
) -> ApiResult<Value> {
    let Some(Json(body)) = body else {
        return Err(ApiError::validation("Password actual y nuevo son requeridos"));
    };
    let (Some(actual), Some(nuevo)) = (body.password_actual, body.password_nuevo) else {
        return Err(ApiError::validation("Password actual y nuevo son requeridos"));
    };

    if nuevo.len() < 6 {
        return Err(ApiError::validation(
            "El password nuevo debe tener al menos 6 caracteres",
        ));
    }

    let pool = database::pool()?;
    let hash_actual: String =
        sqlx::query_scalar("SELECT password_hash FROM usuarios WHERE id = $1")
            .bind(user.id)
            .fetch_optional(pool)
            .await
            .map_err(|e| ApiError::db("Error al cambiar password", e))?
            .ok_or_else(|| ApiError::not_found("Usuario no encontrado"))?;

    let password_valido = auth::verify_password(&actual, &hash_actual).map_err(|e| {
        tracing::error!("password verification failed: {}", e);
        ApiError::internal("Error al cambiar password")
    })?;

    if !password_valido {
        return Err(ApiError::unauthorized("Password actual incorrecto"));
    }

    let nuevo_hash = auth::hash_password(&nuevo).map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        ApiError::internal("Error al cambiar password")
    })?;

    sqlx::query(
        "UPDATE usuarios SET password_hash = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2",
    )
    .bind(&nuevo_hash)
    .bind(user.id)
    .execute(pool)
    .await
    .map_err(|e| ApiError::db("Error al cambiar password", e))?;

    Ok(ApiResponse::success(json!({
        "message": "Password actualizado correctamente"
    })))
}

/// GET /api/auth/verificar-token
///
/// Reaching this handler means the middleware already validated the token
/// and reloaded the user; this is just a liveness echo for clients.
pub async fn verificar_token(Extension(user): Extension<CurrentUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "message": "Token válido",
        "usuario": user,
    })))
}
