use axum::extract::{Path, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth;
use crate::database;
use crate::error::ApiError;
use crate::filter::{ListQuery, SqlParam};
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::Usuario;

const USUARIO_COLS: &str =
    "id, username, email, nombre, apellido, rol_id, activo, ultimo_acceso, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct ListarUsuariosParams {
    pub rol_id: Option<i64>,
    pub activo: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/usuarios
pub async fn listar(Query(params): Query<ListarUsuariosParams>) -> ApiResult<Value> {
    let pool = database::pool()?;

    let query = ListQuery::new("usuarios", USUARIO_COLS)
        .filter_eq_int("rol_id", params.rol_id)
        .filter_bool_text("activo", params.activo)
        .search(&["nombre", "email", "username"], params.search)
        .paginate(params.page, params.limit);

    let total = query
        .count(pool)
        .await
        .map_err(|e| ApiError::db("Error al listar usuarios", e))?;
    let usuarios: Vec<Usuario> = query
        .fetch_page(pool)
        .await
        .map_err(|e| ApiError::db("Error al listar usuarios", e))?;

    Ok(ApiResponse::success(json!({
        "data": usuarios,
        "pagination": query.pagination(total),
    })))
}

/// GET /api/usuarios/:id
pub async fn obtener(Path(id): Path<i32>) -> ApiResult<Value> {
    let pool = database::pool()?;
    let usuario = sqlx::query_as::<_, Usuario>(&format!(
        "SELECT {} FROM usuarios WHERE id = $1",
        USUARIO_COLS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::db("Error al obtener usuario", e))?
    .ok_or_else(|| ApiError::not_found("Usuario no encontrado"))?;

    Ok(ApiResponse::success(json!({ "data": usuario })))
}

#[derive(Debug, Deserialize)]
pub struct CrearUsuarioRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub rol_id: Option<i32>,
    pub password: Option<String>,
}

/// POST /api/usuarios
pub async fn crear(body: Option<Json<CrearUsuarioRequest>>) -> ApiResult<Value> {
    const REQUERIDOS: &str =
        "Username, email, nombre, apellido, rol_id y password son requeridos";

    let Some(Json(body)) = body else {
        return Err(ApiError::validation(REQUERIDOS));
    };
    let (Some(username), Some(email), Some(nombre), Some(apellido), Some(rol_id), Some(password)) = (
        body.username,
        body.email,
        body.nombre,
        body.apellido,
        body.rol_id,
        body.password,
    ) else {
        return Err(ApiError::validation(REQUERIDOS));
    };

    let password_hash = auth::hash_password(&password).map_err(|e| {
        tracing::error!("password hashing failed: {}", e);
        ApiError::internal("Error al crear usuario")
    })?;

    // Pre-check and insert run in one transaction; the unique indexes on
    // username/email remain the authoritative Conflict signal either way.
    let mut tx = database::transaction().await?;

    let existente: Option<i32> =
        sqlx::query_scalar("SELECT id FROM usuarios WHERE username = $1 OR email = $2")
            .bind(&username)
            .bind(&email)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| ApiError::db("Error al crear usuario", e))?;

    if existente.is_some() {
        return Err(ApiError::conflict("El username o email ya están en uso"));
    }

    let usuario = sqlx::query_as::<_, Usuario>(&format!(
        "INSERT INTO usuarios \
         (username, email, nombre, apellido, rol_id, password_hash, activo, ultimo_acceso) \
         VALUES ($1, $2, $3, $4, $5, $6, true, CURRENT_TIMESTAMP) \
         RETURNING {}",
        USUARIO_COLS
    ))
    .bind(&username)
    .bind(&email)
    .bind(&nombre)
    .bind(&apellido)
    .bind(rol_id)
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| ApiError::db("Error al crear usuario", e))?;

    tx.commit()
        .await
        .map_err(|e| ApiError::db("Error al crear usuario", e))?;

    Ok(ApiResponse::created(json!({
        "message": "Usuario creado exitosamente",
        "data": usuario,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ActualizarUsuarioRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub nombre: Option<String>,
    pub apellido: Option<String>,
    pub rol_id: Option<i32>,
    pub activo: Option<bool>,
    pub password: Option<String>,
}

/// PUT /api/usuarios/:id
///
/// Dynamic partial update: only supplied fields enter the statement, and
/// the password is re-hashed only when one is supplied.
pub async fn actualizar(
    Path(id): Path<i32>,
    body: Option<Json<ActualizarUsuarioRequest>>,
) -> ApiResult<Value> {
    let Some(Json(body)) = body else {
        return Err(ApiError::validation("No hay campos para actualizar"));
    };

    let pool = database::pool()?;

    let existe: Option<i32> = sqlx::query_scalar("SELECT id FROM usuarios WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::db("Error al actualizar usuario", e))?;

    if existe.is_none() {
        return Err(ApiError::not_found("Usuario no encontrado"));
    }

    let mut fields: Vec<String> = vec![];
    let mut params: Vec<SqlParam> = vec![];

    let set_text = |column: &str, value: Option<String>, fields: &mut Vec<String>, params: &mut Vec<SqlParam>| {
        if let Some(value) = value {
            fields.push(format!("{} = ${}", column, params.len() + 1));
            params.push(SqlParam::Text(value));
        }
    };

    set_text("username", body.username, &mut fields, &mut params);
    set_text("email", body.email, &mut fields, &mut params);
    set_text("nombre", body.nombre, &mut fields, &mut params);
    set_text("apellido", body.apellido, &mut fields, &mut params);

    if let Some(rol_id) = body.rol_id {
        fields.push(format!("rol_id = ${}", params.len() + 1));
        params.push(SqlParam::Int(rol_id as i64));
    }
    if let Some(activo) = body.activo {
        fields.push(format!("activo = ${}", params.len() + 1));
        params.push(SqlParam::Bool(activo));
    }
    if let Some(password) = body.password {
        let password_hash = auth::hash_password(&password).map_err(|e| {
            tracing::error!("password hashing failed: {}", e);
            ApiError::internal("Error al actualizar usuario")
        })?;
        fields.push(format!("password_hash = ${}", params.len() + 1));
        params.push(SqlParam::Text(password_hash));
    }

    if fields.is_empty() {
        return Err(ApiError::validation("No hay campos para actualizar"));
    }

    fields.push("updated_at = CURRENT_TIMESTAMP".to_string());

    let sql = format!(
        "UPDATE usuarios SET {} WHERE id = ${} RETURNING {}",
        fields.join(", "),
        params.len() + 1,
        USUARIO_COLS
    );

    let mut query = sqlx::query_as::<_, Usuario>(&sql);
    for param in &params {
        query = match param {
            SqlParam::Text(v) => query.bind(v),
            SqlParam::Bool(v) => query.bind(v),
            SqlParam::Int(v) => query.bind(v),
        };
    }

    let usuario = query
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(|e| ApiError::db("Error al actualizar usuario", e))?;

    Ok(ApiResponse::success(json!({
        "message": "Usuario actualizado exitosamente",
        "data": usuario,
    })))
}

/// DELETE /api/usuarios/:id — soft delete; login is blocked but the row
/// stays retrievable by id.
pub async fn eliminar(Path(id): Path<i32>) -> ApiResult<Value> {
    let pool = database::pool()?;
    let usuario = sqlx::query_as::<_, Usuario>(&format!(
        "UPDATE usuarios SET activo = false, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $1 RETURNING {}",
        USUARIO_COLS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::db("Error al eliminar usuario", e))?
    .ok_or_else(|| ApiError::not_found("Usuario no encontrado"))?;

    Ok(ApiResponse::success(json!({
        "message": "Usuario desactivado exitosamente",
        "data": usuario,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CambiarEstadoRequest {
    pub activo: Option<bool>,
}

/// PATCH /api/usuarios/:id/estado — explicit set, not a toggle.
pub async fn cambiar_estado(
    Path(id): Path<i32>,
    body: Option<Json<CambiarEstadoRequest>>,
) -> ApiResult<Value> {
    let activo = body
        .and_then(|Json(b)| b.activo)
        .ok_or_else(|| ApiError::validation("El campo 'activo' es requerido"))?;

    let pool = database::pool()?;
    let usuario = sqlx::query_as::<_, Usuario>(&format!(
        "UPDATE usuarios SET activo = $1, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $2 RETURNING {}",
        USUARIO_COLS
    ))
    .bind(activo)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::db("Error al cambiar estado del usuario", e))?
    .ok_or_else(|| ApiError::not_found("Usuario no encontrado"))?;

    let mensaje = if activo {
        "Usuario activado exitosamente"
    } else {
        "Usuario desactivado exitosamente"
    };

    Ok(ApiResponse::success(json!({
        "message": mensaje,
        "data": usuario,
    })))
}
