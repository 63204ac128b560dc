//! Local/server entrypoint.
//!
//! Logs as JSON when `LOG_FORMAT=json`, human-readable otherwise.

use anyhow::Context;
use std::env;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt};

use throtle_console::config::{Config, DEFAULT_SESSION_SECRET};
use throtle_console::identity::cognito::CognitoProvider;
use throtle_console::storage::{LocalStorage, S3Storage, StorageBackend};
use throtle_console::users::InMemoryUserRepository;
use throtle_console::{AppState, create_app};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

async fn build_storage(config: &Config) -> anyhow::Result<StorageBackend> {
    match config.storage_backend.as_str() {
        "s3" => {
            if config.s3_bucket.is_empty() {
                anyhow::bail!("STORAGE_BACKEND=s3 requires S3_BUCKET");
            }
            let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            tracing::info!(bucket = %config.s3_bucket, "Using S3 storage backend");
            Ok(StorageBackend::S3(S3Storage::new(
                aws_sdk_s3::Client::new(&sdk_config),
                config.s3_bucket.clone(),
            )))
        }
        "local" => {
            tokio::fs::create_dir_all(&config.upload_dir)
                .await
                .with_context(|| format!("creating upload dir {}", config.upload_dir))?;
            tracing::info!(dir = %config.upload_dir, "Using local storage backend");
            Ok(StorageBackend::Local(LocalStorage::new(&config.upload_dir)))
        }
        other => anyhow::bail!("unknown STORAGE_BACKEND: {other}"),
    }
}

/// The in-process directory is the only `UserRepository` backend; without
/// `USERS_FILE` it starts empty and every user falls back to `DEFAULT_TIER`
/// unless the ID token carries a tier claim.
async fn load_users(config: &Config) -> anyhow::Result<InMemoryUserRepository> {
    let Some(path) = &config.users_file else {
        tracing::warn!("USERS_FILE not set; user directory is empty");
        return Ok(InMemoryUserRepository::new());
    };
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading users file {path}"))?;
    let users = InMemoryUserRepository::from_json(&json)
        .with_context(|| format!("parsing users file {path}"))?;
    tracing::info!(path = %path, users = users.len(), "Loaded user directory");
    Ok(users)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env().context("loading configuration")?;
    if config.session_secret == DEFAULT_SESSION_SECRET {
        if config.is_production() {
            anyhow::bail!("SESSION_SECRET must be set in production");
        }
        tracing::warn!("SESSION_SECRET not set; using the development default");
    }

    let http_client = config.http_client().context("building HTTP client")?;
    let provider = CognitoProvider::from_config(&config, http_client);
    let storage = build_storage(&config).await?;
    let users = Arc::new(load_users(&config).await?);

    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(
        AppState::new(config, provider, users, storage).context("registering metrics")?,
    );
    let app = create_app(state);

    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
