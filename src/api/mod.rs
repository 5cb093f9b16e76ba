pub mod routes;

use crate::backend::Backend;
use crate::store::AppStore;
use anyhow::{Context, Result};
use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::info;

pub async fn run_server<B>(store: Arc<Mutex<AppStore<B>>>, port: u16) -> Result<()>
where
    B: Backend + Send + 'static,
{
    let state = routes::ApiState { store, port };
    let app: Router = routes::router(state);

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server: {addr}"))?;

    info!(address = %addr, "DayTracker API server started");

    axum::serve(listener, app)
        .await
        .context("API server failed")?;

    Ok(())
}
