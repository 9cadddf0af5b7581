mod models;
mod service;
mod config;
mod dtos;
mod error;
mod db;
mod utils;
mod middleware;
mod handler;
mod routes;

use std::{net::SocketAddr, sync::Arc};

use axum::http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method};
use config::Config;
use db::{memorydb::MemoryStore, propertydb::PropertyExt, DBClient};
use dotenv::dotenv;
use routes::create_router;
use service::property_service::PropertyService;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;
use utils::{image_utils::MediaStorage, token};

#[derive(Clone)]
pub struct AppState {
    pub env: Config,
    pub property_service: Arc<PropertyService>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("env", &self.env)
            .field("property_service", &self.property_service)
            .finish()
    }
}

impl AppState {
    pub fn new(db_client: Arc<dyn PropertyExt>, config: Config) -> Self {
        let property_service = Arc::new(PropertyService::new(
            db_client,
            MediaStorage::from_config(&config),
            config.page_size,
        ));

        Self {
            env: config,
            property_service,
        }
    }
}

async fn connect_catalog(config: &Config) -> Arc<dyn PropertyExt> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set - listings are kept in memory and lost on restart");
        return Arc::new(MemoryStore::new());
    };

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("Connection to the database is successful");
            pool
        }
        Err(err) => {
            tracing::error!("Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let db_client = DBClient::new(pool);
    if let Err(err) = db_client.migrate().await {
        tracing::error!("Failed to run migrations: {}", err);
        std::process::exit(1);
    }

    Arc::new(db_client)
}

fn mint_token(config: &Config, user_id: Option<&str>) -> ! {
    let Some(user_id) = user_id.and_then(|id| uuid::Uuid::parse_str(id).ok()) else {
        eprintln!("usage: property-listings mint-token <user-uuid>");
        std::process::exit(2);
    };

    match token::create_token(&user_id.to_string(), config.jwt_secret.as_bytes(), config.jwt_maxage) {
        Ok(token) => {
            println!("{}", token);
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("Failed to create token: {}", err);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    // `property-listings mint-token <user-id>` prints a bearer token for local testing.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("mint-token") {
        mint_token(&config, args.get(2).map(String::as_str));
    }

    let level = config.log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::DEBUG);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .init();

    let db_client = connect_catalog(&config).await;

    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app_state = Arc::new(AppState::new(db_client, config.clone()));

    let app = create_router(app_state).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("Server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!("Server error: {}", err);
    }
}
