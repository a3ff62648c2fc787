pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod models;

use axum::handler::Handler;
use axum::http::{StatusCode, Uri};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, patch, post};
use axum::Router;
use once_cell::sync::Lazy;
use serde_json::json;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::auth::require_auth;
use crate::middleware::roles::{require_admin_o_supervisor, require_administrador};

static START: Lazy<Instant> = Lazy::new(Instant::now);

/// Build the full application router.
pub fn app() -> Router {
    Lazy::force(&START);

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/auth/login", post(handlers::auth::login))
        // Protected API
        .merge(protected_routes())
        .fallback(not_found)
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn protected_routes() -> Router {
    auth_routes()
        .merge(articulos_routes())
        .merge(usuarios_routes())
        .route_layer(from_fn(require_auth))
}

fn auth_routes() -> Router {
    use handlers::auth;

    Router::new()
        .route("/api/auth/perfil", get(auth::perfil))
        .route("/api/auth/cambiar-password", post(auth::cambiar_password))
        .route("/api/auth/verificar-token", get(auth::verificar_token))
}

fn articulos_routes() -> Router {
    use handlers::articulos;

    Router::new()
        .route(
            "/api/articulos",
            get(articulos::listar)
                .post(articulos::crear.layer(from_fn(require_admin_o_supervisor))),
        )
        .route("/api/articulos/categorias", get(articulos::categorias))
        .route("/api/articulos/sku/:sku", get(articulos::obtener_por_sku))
        .route(
            "/api/articulos/:id",
            get(articulos::obtener)
                .put(articulos::actualizar.layer(from_fn(require_admin_o_supervisor)))
                .delete(articulos::eliminar.layer(from_fn(require_administrador))),
        )
        .route(
            "/api/articulos/:id/estado",
            patch(articulos::cambiar_estado.layer(from_fn(require_administrador))),
        )
}

fn usuarios_routes() -> Router {
    use handlers::usuarios;

    Router::new()
        .route(
            "/api/usuarios",
            get(usuarios::listar).post(usuarios::crear.layer(from_fn(require_administrador))),
        )
        .route(
            "/api/usuarios/:id",
            get(usuarios::obtener)
                .put(usuarios::actualizar.layer(from_fn(require_administrador)))
                .delete(usuarios::eliminar.layer(from_fn(require_administrador))),
        )
        .route(
            "/api/usuarios/:id/estado",
            patch(usuarios::cambiar_estado.layer(from_fn(require_administrador))),
        )
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "success": true,
        "message": "API Sistema de Etiquetas",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now(),
    }))
}

async fn health() -> impl IntoResponse {
    let uptime = START.elapsed().as_secs();
    let now = chrono::Utc::now();

    match database::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "status": "OK",
                "uptime": uptime,
                "database": "ok",
                "timestamp": now,
            })),
        ),
        Err(e) => {
            tracing::error!("health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "status": "degraded",
                    "uptime": uptime,
                    "message": "database unavailable",
                    "timestamp": now,
                })),
            )
        }
    }
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "message": "Ruta no encontrada",
            "path": uri.path(),
        })),
    )
}
