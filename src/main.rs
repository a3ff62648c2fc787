use etiquetas_api::{app, config, database};

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("starting etiquetas API in {:?} mode", config.environment);

    // The pool is required before serving: every request path re-queries
    // the store, so refusing to start beats serving guaranteed 500s.
    if let Err(e) = database::init().await {
        tracing::error!("failed to initialize database: {}", e);
        std::process::exit(1);
    }

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("etiquetas API listening on http://{}", bind_addr);

    axum::serve(listener, app()).await.expect("server");
}
