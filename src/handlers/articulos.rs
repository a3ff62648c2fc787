use axum::extract::{Path, Query};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;
use std::str::FromStr;

use crate::database;
use crate::error::ApiError;
use crate::filter::ListQuery;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::models::{Articulo, LabelType};

const ARTICULO_COLS: &str = "id, sku, descripcion, categoria, color, size, \
     tipo_etiqueta, codigo_barras, imagen_url, activo, created_at, updated_at";

#[derive(Debug, Deserialize)]
pub struct ListarArticulosParams {
    pub categoria: Option<String>,
    pub tipo_etiqueta: Option<String>,
    pub activo: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/articulos
pub async fn listar(Query(params): Query<ListarArticulosParams>) -> ApiResult<Value> {
    let pool = database::pool()?;

    let query = ListQuery::new("articulos", ARTICULO_COLS)
        .filter_eq("categoria", params.categoria)
        .filter_eq("tipo_etiqueta", params.tipo_etiqueta)
        .filter_bool_text("activo", params.activo)
        .search(&["sku", "descripcion"], params.search)
        .paginate(params.page, params.limit);

    let total = query
        .count(pool)
        .await
        .map_err(|e| ApiError::db("Error al listar artículos", e))?;
    let articulos: Vec<Articulo> = query
        .fetch_page(pool)
        .await
        .map_err(|e| ApiError::db("Error al listar artículos", e))?;

    Ok(ApiResponse::success(json!({
        "data": articulos,
        "pagination": query.pagination(total),
    })))
}

/// GET /api/articulos/categorias
pub async fn categorias() -> ApiResult<Value> {
    let pool = database::pool()?;
    let categorias: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT categoria FROM articulos WHERE activo = true ORDER BY categoria",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| ApiError::db("Error al obtener categorías", e))?;

    Ok(ApiResponse::success(json!({ "data": categorias })))
}

/// GET /api/articulos/sku/:sku
pub async fn obtener_por_sku(Path(sku): Path<String>) -> ApiResult<Value> {
    let pool = database::pool()?;
    let articulo = sqlx::query_as::<_, Articulo>(&format!(
        "SELECT {} FROM articulos WHERE sku = $1",
        ARTICULO_COLS
    ))
    .bind(&sku)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::db("Error al buscar artículo", e))?
    .ok_or_else(|| ApiError::not_found("Artículo no encontrado"))?;

    Ok(ApiResponse::success(json!({ "data": articulo })))
}

/// GET /api/articulos/:id
pub async fn obtener(Path(id): Path<i32>) -> ApiResult<Value> {
    let pool = database::pool()?;
    let articulo = sqlx::query_as::<_, Articulo>(&format!(
        "SELECT {} FROM articulos WHERE id = $1",
        ARTICULO_COLS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::db("Error al obtener artículo", e))?
    .ok_or_else(|| ApiError::not_found("Artículo no encontrado"))?;

    Ok(ApiResponse::success(json!({ "data": articulo })))
}

#[derive(Debug, Deserialize)]
pub struct ArticuloPayload {
    pub sku: Option<String>,
    pub descripcion: Option<String>,
    pub categoria: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    pub tipo_etiqueta: Option<String>,
    pub codigo_barras: Option<String>,
    pub imagen_url: Option<String>,
}

fn validar_tipo_etiqueta(tipo: &str) -> Result<(), ApiError> {
    LabelType::from_str(tipo)
        .map(|_| ())
        .map_err(|_| ApiError::validation("Tipo de etiqueta inválido (qr, barcode, shipping)"))
}

/// POST /api/articulos
pub async fn crear(body: Option<Json<ArticuloPayload>>) -> ApiResult<Value> {
    let Some(Json(body)) = body else {
        return Err(ApiError::validation(
            "SKU, descripción, categoría y tipo de etiqueta son requeridos",
        ));
    };
    let (Some(sku), Some(descripcion), Some(categoria), Some(tipo_etiqueta)) =
        (body.sku, body.descripcion, body.categoria, body.tipo_etiqueta)
    else {
        return Err(ApiError::validation(
            "SKU, descripción, categoría y tipo de etiqueta son requeridos",
        ));
    };

    validar_tipo_etiqueta(&tipo_etiqueta)?;

    let pool = database::pool()?;

    // Fast path for a friendly message; the unique index on sku is the
    // authoritative check and surfaces as Conflict from the insert.
    let existente: Option<i32> = sqlx::query_scalar("SELECT id FROM articulos WHERE sku = $1")
        .bind(&sku)
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::db("Error al crear artículo", e))?;

    if existente.is_some() {
        return Err(ApiError::conflict("El SKU ya existe"));
    }

    let articulo = sqlx::query_as::<_, Articulo>(&format!(
        "INSERT INTO articulos \
         (sku, descripcion, categoria, color, size, tipo_etiqueta, codigo_barras, imagen_url) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING {}",
        ARTICULO_COLS
    ))
    .bind(&sku)
    .bind(&descripcion)
    .bind(&categoria)
    .bind(&body.color)
    .bind(&body.size)
    .bind(&tipo_etiqueta)
    .bind(&body.codigo_barras)
    .bind(&body.imagen_url)
    .fetch_one(pool)
    .await
    .map_err(|e| ApiError::db("Error al crear artículo", e))?;

    Ok(ApiResponse::created(json!({
        "message": "Artículo creado exitosamente",
        "data": articulo,
    })))
}

/// PUT /api/articulos/:id
///
/// Partial merge: fields absent from the payload keep their stored value.
pub async fn actualizar(
    Path(id): Path<i32>,
    body: Option<Json<ArticuloPayload>>,
) -> ApiResult<Value> {
    let Some(Json(body)) = body else {
        return Err(ApiError::validation("No hay campos para actualizar"));
    };

    if let Some(tipo) = &body.tipo_etiqueta {
        validar_tipo_etiqueta(tipo)?;
    }

    let pool = database::pool()?;

    let existe: Option<i32> = sqlx::query_scalar("SELECT id FROM articulos WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| ApiError::db("Error al actualizar artículo", e))?;

    if existe.is_none() {
        return Err(ApiError::not_found("Artículo no encontrado"));
    }

    // A changed sku must not collide with a different row
    if let Some(sku) = &body.sku {
        let colision: Option<i32> =
            sqlx::query_scalar("SELECT id FROM articulos WHERE sku = $1 AND id != $2")
                .bind(sku)
                .bind(id)
                .fetch_optional(pool)
                .await
                .map_err(|e| ApiError::db("Error al actualizar artículo", e))?;

        if colision.is_some() {
            return Err(ApiError::conflict("El SKU ya existe en otro artículo"));
        }
    }

    let articulo = sqlx::query_as::<_, Articulo>(&format!(
        "UPDATE articulos \
         SET sku = COALESCE($1, sku), \
             descripcion = COALESCE($2, descripcion), \
             categoria = COALESCE($3, categoria), \
             color = COALESCE($4, color), \
             size = COALESCE($5, size), \
             tipo_etiqueta = COALESCE($6, tipo_etiqueta), \
             codigo_barras = COALESCE($7, codigo_barras), \
             imagen_url = COALESCE($8, imagen_url), \
             updated_at = CURRENT_TIMESTAMP \
         WHERE id = $9 \
         RETURNING {}",
        ARTICULO_COLS
    ))
    .bind(&body.sku)
    .bind(&body.descripcion)
    .bind(&body.categoria)
    .bind(&body.color)
    .bind(&body.size)
    .bind(&body.tipo_etiqueta)
    .bind(&body.codigo_barras)
    .bind(&body.imagen_url)
    .bind(id)
    .fetch_one(pool)
    .await
    .map_err(|e| ApiError::db("Error al actualizar artículo", e))?;

    Ok(ApiResponse::success(json!({
        "message": "Artículo actualizado exitosamente",
        "data": articulo,
    })))
}

#[derive(Debug, Serialize, FromRow)]
struct ArticuloResumen {
    id: i32,
    sku: String,
    descripcion: String,
    activo: bool,
}

/// DELETE /api/articulos/:id — soft delete, the row stays retrievable.
pub async fn eliminar(Path(id): Path<i32>) -> ApiResult<Value> {
    let pool = database::pool()?;
    let articulo = sqlx::query_as::<_, ArticuloResumen>(
        "UPDATE articulos SET activo = false, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $1 RETURNING id, sku, descripcion, activo",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::db("Error al eliminar artículo", e))?
    .ok_or_else(|| ApiError::not_found("Artículo no encontrado"))?;

    Ok(ApiResponse::success(json!({
        "message": "Artículo desactivado exitosamente",
        "data": articulo,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CambiarEstadoRequest {
    pub activo: Option<bool>,
}

/// PATCH /api/articulos/:id/estado — explicit set, not a toggle.
pub async fn cambiar_estado(
    Path(id): Path<i32>,
    body: Option<Json<CambiarEstadoRequest>>,
) -> ApiResult<Value> {
    let activo = body
        .and_then(|Json(b)| b.activo)
        .ok_or_else(|| ApiError::validation("El campo 'activo' es requerido"))?;

    let pool = database::pool()?;
    let articulo = sqlx::query_as::<_, ArticuloResumen>(
        "UPDATE articulos SET activo = $1, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $2 RETURNING id, sku, descripcion, activo",
    )
    .bind(activo)
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(|e| ApiError::db("Error al cambiar estado del artículo", e))?
    .ok_or_else(|| ApiError::not_found("Artículo no encontrado"))?;

    let mensaje = if activo {
        "Artículo activado exitosamente"
    } else {
        "Artículo desactivado exitosamente"
    };

    Ok(ApiResponse::success(json!({
        "message": mensaje,
        "data": articulo,
    })))
}
