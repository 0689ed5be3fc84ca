mod config;
mod dbp_client;
mod domain;
mod reader_api;

use std::{path::Path, sync::Arc};

use anyhow::Context;
use config::Config;
use dbp_client::{DbpClient, HttpTransport, ResponseCache};
use poem::{
    EndpointExt, Route, Server,
    listener::TcpListener,
    middleware::{Cors, Tracing as PoemTracing},
};
use poem_openapi::OpenApiService;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt::SubscriberBuilder, prelude::*};

type ReaderResult<T> = anyhow::Result<T>;

#[tokio::main]
async fn main() -> ReaderResult<()> {
    // Respect RUST_LOG if set, default to info for our crate and warn for deps.
    let default_filter = format!(
        "{}=info,poem=info,reqwest=warn,h2=warn",
        env!("CARGO_PKG_NAME")
    );
    let env_filter = std::env::var("RUST_LOG").unwrap_or(default_filter);
    SubscriberBuilder::default()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .with_level(true)
        .pretty()
        .finish()
        .with(ErrorLayer::default())
        .init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting bible reader");

    if Path::new(".env.local").exists() {
        dotenvy::from_filename(".env.local")?;
    } else if Path::new(".env").exists() {
        dotenvy::from_filename(".env")?;
    };
    let config = Config::load();
    if let Err(e) = config.validate() {
        return Err(anyhow::anyhow!(e));
    }

    let transport = HttpTransport::new(config.request_timeout)
        .with_context(|| "Failed to build HTTP client")?;
    let client = DbpClient::new(&config.api_base_url, Arc::new(transport))
        .with_api_key(&config.api_key)
        .with_buckets(&config.bucket_id, &config.video_bucket_id)
        .with_project_id(&config.project_id)
        .with_cache(ResponseCache::new(config.cache_capacity, config.cache_ttl));
    tracing::info!(
        dbp_base = %config.api_base_url,
        bucket = %config.bucket_id,
        video_bucket = %config.video_bucket_id,
        timeout_secs = config.request_timeout.as_secs(),
        cache_capacity = config.cache_capacity,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "configured DBP client"
    );

    run_poem(Arc::new(client), &config.bind_addr).await?;
    Ok(())
}

pub async fn run_poem(client: Arc<DbpClient>, bind_addr: &str) -> ReaderResult<()> {
    let version = env!("CARGO_PKG_VERSION");
    let api = reader_api::ReaderApi { client };
    let api_service = OpenApiService::new(api, "Bible Reader API", version)
        .server(format!("http://{}", bind_addr));
    let ui = api_service.rapidoc();
    let spec = api_service.spec();
    let route = Route::new()
        .nest("/", api_service)
        .nest("/ui", ui)
        .nest("/spec", poem::endpoint::make_sync(move |_| spec.clone()))
        .with(Cors::new())
        .with(PoemTracing);

    tracing::info!(%bind_addr, "starting HTTP server");
    Server::new(TcpListener::bind(bind_addr)).run(route).await?;
    Ok(())
}
