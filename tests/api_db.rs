// End-to-end flow against a live Postgres store. Ignored by default;
// run with a migratable database:
//
//   DATABASE_URL=postgres://... cargo test -- --ignored

use anyhow::Result;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn send(request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = etiquetas_api::app().oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let body: Value = serde_json::from_slice(&bytes)?;
    Ok((status, body))
}

fn request(method: &str, path: &str, token: &str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method(method)
        .uri(path)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())?)
}

fn json_request(
    method: &str,
    path: &str,
    token: Option<&str>,
    body: &Value,
) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    Ok(builder.body(Body::from(serde_json::to_vec(body)?))?)
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a live Postgres"]
async fn crud_flow_against_live_store() -> Result<()> {
    etiquetas_api::database::init().await?;
    let pool = etiquetas_api::database::pool()?;

    // The seed migration bootstraps an administrator that can log in
    let (status, body) = send(json_request(
        "POST",
        "/api/auth/login",
        None,
        &json!({ "username": "admin", "password": "admin123" }),
    )?)
    .await?;
    assert_eq!(status, StatusCode::OK, "bootstrap admin login: {}", body);
    assert_eq!(body["message"], "Login exitoso");
    assert_eq!(body["usuario"]["rol"], "Administrador");
    let token: String = body["token"].as_str().unwrap().to_string();
    let token = token.as_str();

    let suffix = Uuid::new_v4().simple().to_string();
    let sku = format!("SKU-{}", &suffix[..12]);

    let (status, body) = send(json_request(
        "POST",
        "/api/articulos",
        Some(token),
        &json!({
            "sku": sku,
            "descripcion": "Etiqueta de prueba",
            "categoria": "calzado",
            "tipo_etiqueta": "qr",
        }),
    )?)
    .await?;
    assert_eq!(status, StatusCode::CREATED, "crear artículo: {}", body);
    assert_eq!(body["data"]["activo"], true);
    let articulo_id = body["data"]["id"].as_i64().unwrap();

    // A second article with the same sku is a uniqueness conflict
    let (status, body) = send(json_request(
        "POST",
        "/api/articulos",
        Some(token),
        &json!({
            "sku": sku,
            "descripcion": "Duplicado",
            "categoria": "calzado",
            "tipo_etiqueta": "qr",
        }),
    )?)
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["message"], "El SKU ya existe");

    // Partial update: untouched fields keep their stored values
    let (status, body) = send(json_request(
        "PUT",
        &format!("/api/articulos/{}", articulo_id),
        Some(token),
        &json!({ "descripcion": "Etiqueta renombrada" }),
    )?)
    .await?;
    assert_eq!(status, StatusCode::OK, "actualizar artículo: {}", body);
    assert_eq!(body["data"]["descripcion"], "Etiqueta renombrada");
    assert_eq!(body["data"]["sku"], sku);
    assert_eq!(body["data"]["categoria"], "calzado");
    assert_eq!(body["data"]["tipo_etiqueta"], "qr");

    // Soft delete: the row survives, but leaves the active listing
    let (status, _) = send(request(
        "DELETE",
        &format!("/api/articulos/{}", articulo_id),
        token,
    )?)
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(request(
        "GET",
        &format!("/api/articulos/{}", articulo_id),
        token,
    )?)
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["activo"], false);

    let (status, body) = send(request(
        "GET",
        &format!("/api/articulos?activo=true&search={}", sku),
        token,
    )?)
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["total"], 0);

    let (status, body) = send(request(
        "GET",
        &format!("/api/articulos?activo=false&search={}", sku),
        token,
    )?)
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);

    // Users: duplicate username/email is the same conflict taxonomy
    let supervisor_id: i32 =
        sqlx::query_scalar("SELECT id FROM roles WHERE nombre = 'Supervisor'")
            .fetch_one(pool)
            .await?;
    let operador_id: i32 = sqlx::query_scalar("SELECT id FROM roles WHERE nombre = 'Operador'")
        .fetch_one(pool)
        .await?;

    let username = format!("user_{}", &suffix[..12]);
    let alta = json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "nombre": "Nuevo",
        "apellido": "Usuario",
        "rol_id": supervisor_id,
        "password": "secreto123",
    });

    let (status, body) =
        send(json_request("POST", "/api/usuarios", Some(token), &alta)?).await?;
    assert_eq!(status, StatusCode::CREATED, "crear usuario: {}", body);
    let usuario_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) =
        send(json_request("POST", "/api/usuarios", Some(token), &alta)?).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CONFLICT");
    assert_eq!(body["message"], "El username o email ya están en uso");

    // Dynamic user update covers the numeric bind path for rol_id
    let (status, body) = send(json_request(
        "PUT",
        &format!("/api/usuarios/{}", usuario_id),
        Some(token),
        &json!({ "rol_id": operador_id, "activo": false }),
    )?)
    .await?;
    assert_eq!(status, StatusCode::OK, "actualizar usuario: {}", body);
    assert_eq!(body["data"]["rol_id"], operador_id);
    assert_eq!(body["data"]["activo"], false);

    let (status, body) = send(json_request(
        "PATCH",
        &format!("/api/usuarios/{}/estado", usuario_id),
        Some(token),
        &json!({ "activo": true }),
    )?)
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["activo"], true);
    assert_eq!(body["message"], "Usuario activado exitosamente");

    Ok(())
}
