use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use diesel_async::{
    AsyncPgConnection,
    pooled_connection::{AsyncDieselConnectionManager, deadpool::Pool},
};
use dotenv::dotenv;
use mimalloc::MiMalloc;
use serde_json::{Value, json};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::config::{Env, ServerConfig};

mod comments;
mod config;
mod error;
mod identity;
mod json;
mod messages;
mod schema;
mod subpost;
mod utils;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Clone)]
pub struct App {
    pub diesel: Pool<AsyncPgConnection>,
    pub config: Arc<ServerConfig>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenv().ok();

    init_tracing(Env::from_env());

    let config = ServerConfig::new_from_env();

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);
    let diesel = Pool::builder(manager)
        .max_size(config.database_max_connections)
        .build()?;

    let app = App {
        diesel,
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(app.config.cors_allowed_origin.parse::<HeaderValue>()?)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    let api = Router::<App>::new()
        .merge(comments::routes::route())
        .merge(subpost::routes::route())
        .merge(messages::routes::route())
        .nest("/user", identity::routes::route());

    let listen_addr = app.config.listen_addr;
    let app_is_production = app.config.is_production();

    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(app);

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(
        production = app_is_production,
        "Listening on {}",
        listener.local_addr()?
    );

    axum::serve(listener, router).await?;

    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to NexPost API" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

fn init_tracing(env: Env) {
    if env == Env::Production {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "nexpost=debug,tower_http=debug".into()),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_and_health_answer_with_json() {
        let Json(body) = root().await;
        assert_eq!(body, json!({ "message": "Welcome to NexPost API" }));

        let Json(body) = health().await;
        assert_eq!(body["status"], "healthy");
    }
}
