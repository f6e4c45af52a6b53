//! Server initialization and routing

use crate::api;
use crate::cache::RedisHandshakeStore;
use crate::config::Config;
use crate::jwt::JwtManager;
use crate::oauth::GoogleProvider;
use crate::repository::{
    instance::InstanceRepositoryImpl, owner::OwnerAccountRepositoryImpl,
    respondent::RespondentRepositoryImpl,
};
use crate::service::{
    AdmissionService, CredentialService, InstanceService, OAuthService, RespondentService,
};
use anyhow::Result;
use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use sqlx::{mysql::MySqlPoolOptions, MySqlPool};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

type ProductionOAuthService = OAuthService<
    GoogleProvider,
    RedisHandshakeStore,
    InstanceRepositoryImpl,
    RespondentRepositoryImpl,
    OwnerAccountRepositoryImpl,
>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db_pool: MySqlPool,
    pub jwt_manager: JwtManager,
    pub instance_service: Arc<InstanceService<InstanceRepositoryImpl>>,
    pub respondent_service: Arc<RespondentService<RespondentRepositoryImpl>>,
    pub credential_service: Arc<CredentialService<RespondentRepositoryImpl>>,
    pub oauth_service: Arc<ProductionOAuthService>,
}

impl FromRef<AppState> for JwtManager {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_manager.clone()
    }
}

/// Run the server
pub async fn run(config: Config) -> Result<()> {
    // Create database connection pool
    let db_pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    info!("Connected to database");

    sqlx::migrate!("./migrations").run(&db_pool).await?;
    info!("Database migrations completed");

    // Create the handshake stash
    let handshake_store = Arc::new(RedisHandshakeStore::new(&config.redis).await?);
    info!("Connected to Redis");

    // Create repositories
    let instance_repo = Arc::new(InstanceRepositoryImpl::new(db_pool.clone()));
    let respondent_repo = Arc::new(RespondentRepositoryImpl::new(db_pool.clone()));
    let owner_repo = Arc::new(OwnerAccountRepositoryImpl::new(db_pool.clone()));

    // Create JWT manager
    let jwt_manager = JwtManager::new(config.jwt.clone());

    // Create the identity provider client
    let provider = Arc::new(GoogleProvider::new(&config.oauth));

    // Create services
    let instance_service = Arc::new(InstanceService::new(instance_repo.clone()));
    let respondent_service = Arc::new(RespondentService::new(respondent_repo.clone()));
    let admission_service = Arc::new(AdmissionService::new(owner_repo.clone()));
    let credential_service = Arc::new(CredentialService::new(
        respondent_repo.clone(),
        jwt_manager.clone(),
    )?);
    let oauth_service = Arc::new(OAuthService::new(
        provider,
        handshake_store,
        instance_repo,
        respondent_service.clone(),
        admission_service,
        credential_service.clone(),
        config.oauth.clone(),
    ));

    // Create app state
    let state = AppState {
        config: Arc::new(config.clone()),
        db_pool,
        jwt_manager,
        instance_service,
        respondent_service,
        credential_service,
        oauth_service,
    };

    let app = build_router(state);

    let http_addr = config.http_addr();
    let listener = TcpListener::bind(&http_addr).await?;
    info!("HTTP server started on {}", http_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the HTTP router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health endpoint
        .route("/health", get(api::health::health))
        // Public instance status
        .route(
            "/api/v1/instances/{hash}/status",
            get(api::instance::status),
        )
        // Instance CRUD (owner auth)
        .route(
            "/api/v1/instances",
            get(api::instance::list).post(api::instance::create),
        )
        .route(
            "/api/v1/instances/{hash}",
            get(api::instance::get)
                .put(api::instance::update)
                .delete(api::instance::delete),
        )
        // Respondent listing/export/import/CRUD (owner auth)
        .route(
            "/api/v1/instances/{hash}/respondents",
            get(api::respondent::list),
        )
        .route(
            "/api/v1/instances/{hash}/respondents/download",
            get(api::respondent::download),
        )
        .route(
            "/api/v1/instances/{hash}/respondents/import",
            post(api::respondent::import),
        )
        .route(
            "/api/v1/instances/{hash}/respondents/{username}",
            get(api::respondent::get)
                .patch(api::respondent::update)
                .delete(api::respondent::delete),
        )
        // Respondent authentication (no owner auth)
        .route("/api/v1/instances/{hash}/login", post(api::auth::login))
        .route(
            "/api/v1/instances/{hash}/oauth/{provider}/start",
            get(api::auth::oauth_start),
        )
        .route(
            "/api/v1/oauth/{provider}/callback",
            get(api::auth::oauth_callback),
        )
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(cors)
        .with_state(state)
}
