use crate::config::AppConfig;
use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Serves the directory holding the rendered map over HTTP.
pub fn preview_router(map_dir: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(map_dir))
        .layer(CorsLayer::permissive())
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let html = &config.output.html;
    if !html.exists() {
        tracing::warn!("{:?} does not exist yet; run `render` first", html);
    }

    let map_dir = match html.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    let file_name = html
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("seagrass_map.html");

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    let app = preview_router(&map_dir);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Serving {:?} at http://{}/{}", map_dir, addr, file_name);
    axum::serve(listener, app).await?;
    Ok(())
}
