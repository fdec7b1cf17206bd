use anyhow::{Context, Result};
use comments::{
    comments_api::CommentsApi,
    config::{self, get_config},
    server::{AppState, router},
};
use dotenv::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use utils::{
    errors::{HTTP_CLIENT_BUILD_FAILED, LISTENER_BIND_FAILED, SERVER_FAILED},
    tracing::run_with_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    run_with_tracing(run).await
}

async fn run() -> Result<()> {
    config::load()?;
    let config = get_config()?;

    let api = CommentsApi::new(&config.api).context(HTTP_CLIENT_BUILD_FAILED)?;
    info!(endpoint = %api.endpoint(), "Comments API client ready");

    let app = router(AppState::new(Arc::new(api), config.dedup_strategy));
    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr)
        .await
        .with_context(|| format!("{LISTENER_BIND_FAILED}: {}", config.server.listen_addr))?;
    let addr = listener.local_addr()?;

    let server_handle = tokio::spawn(async move {
        info!(address = %addr, "Starting comments server");
        axum::serve(listener, app).await
    });

    tokio::select! {
        result = server_handle => {
            error!("Comments server stopped unexpectedly: {:?}", result);
            result.context(SERVER_FAILED)?.context(SERVER_FAILED)?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully");
        }
    }

    Ok(())
}
