mod config;
mod graphql;
mod overlay;
mod storage;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_graphql_axum::{GraphQLRequest, GraphQLResponse, GraphQLSubscription};
use axum::http::{header, HeaderValue};
use axum::response::IntoResponse;
use axum::{extract::State, response::Html, routing::get, Router};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing_subscriber::EnvFilter;

use config::Config;
use graphql::Schema;
use overlay::OverlayHub;
use storage::Storage;

async fn graphql_handler(State(schema): State<Schema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> Html<String> {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint("/graphql")
            .subscription_endpoint("/graphql/ws")
            .finish(),
    )
}

/// Build a cache-controlled static file router.
///
/// Separated so tests can exercise the caching layer with arbitrary directories.
fn cached_static_router(dir: &Path, cache_header: &'static str) -> Router {
    let layer = SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_header),
    );
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(layer)
}

const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";
const CACHE_REVALIDATE: &str = "no-cache";

/// Routes serving the frontend shell: `/` for the shared dashboard and
/// `/local` for the single-user variant.
fn index_router(index_path: PathBuf) -> Router {
    let index_path = Arc::new(index_path);
    let handler = move || {
        let index_path = index_path.clone();
        async move { serve_index(&index_path).await }
    };
    Router::new()
        .route("/", get(handler.clone()))
        .route("/local", get(handler))
}

/// Build the full application router.
fn build_app(schema: Schema, dist_dir: &Path) -> Router {
    // Bundles are content-hashed by the frontend build.
    let static_files = Router::new()
        .nest("/dist", cached_static_router(dist_dir, CACHE_IMMUTABLE))
        .nest(
            "/assets",
            cached_static_router(&dist_dir.join("assets"), CACHE_IMMUTABLE),
        );

    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route_service("/graphql/ws", GraphQLSubscription::new(schema.clone()))
        .with_state(schema)
        .merge(index_router(dist_dir.join("index.html")))
        .merge(static_files)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "Server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = Config::from_env()?;

    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }
    }
    let storage = Storage::open(&config.db_path)?;
    tracing::info!(path = %config.db_path.display(), "Opened document store");

    let hub = OverlayHub::new(storage);
    let schema = graphql::build_schema(hub);
    let app = build_app(schema, &config.dist_dir);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    tracing::info!("Server running at http://localhost:{}", config.port);
    tracing::info!("GraphiQL playground at http://localhost:{}/graphql", config.port);

    axum::serve(listener, app).await.map_err(|e| e.to_string())
}

async fn serve_index(index_path: &Path) -> impl IntoResponse {
    let cache = [(header::CACHE_CONTROL, CACHE_REVALIDATE)];
    // Try to serve the built frontend, fall back to a simple message
    match tokio::fs::read_to_string(index_path).await {
        Ok(html) => (cache, Html(html)),
        Err(_) => (
            cache,
            Html(
                r#"<!DOCTYPE html>
<html>
<head><title>Sentinels Dashboard</title></head>
<body>
<h1>Sentinels Dashboard</h1>
<p>Frontend not built yet. Visit <a href="/graphql">GraphiQL</a> to explore the API.</p>
</body>
</html>"#
                    .to_string(),
            ),
        ),
    }
}
