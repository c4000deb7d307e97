//! HTTP application assembly
//!
//! Wires configuration, storage, services and routers together and serves
//! them with axum.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderValue, Method, Request, header},
    routing::get,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{Span, info_span};

use crate::core::auth::{AuthApiState, AuthService, JwtService, auth_api_router};
use crate::core::config::Config;
use crate::core::db::{
    CredentialRepository, CredentialStore, DbError, GarageRepository, GarageStore,
    InMemoryCredentialStore, InMemoryGarageStore, create_pool_with_migrations,
};
use crate::core::garage::{GarageApiState, garage_api_router};
use crate::core::mail::{LogMailer, MailError, Mailer, SmtpMailer};
use crate::core::register::{InMemoryCodeCache, RegisterService, register_api_router};

/// How often expired confirmation codes are swept
const CODE_PURGE_PERIOD: Duration = Duration::from_secs(60);

/// Startup errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Jwt(#[from] crate::core::auth::JwtError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Services shared by every router
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub register_service: RegisterService,
    pub garage_store: Arc<dyn GarageStore>,
}

impl AppState {
    /// Build services on top of the given stores
    pub fn new(
        config: &Config,
        credentials: Arc<dyn CredentialStore>,
        garage_store: Arc<dyn GarageStore>,
        mailer: Arc<dyn Mailer>,
        codes: Arc<InMemoryCodeCache>,
    ) -> Result<Self, AppError> {
        let hasher = config.password_hasher.build();
        let jwt_service = JwtService::new(config.jwt.clone())?;

        Ok(Self {
            auth_service: AuthService::new(credentials.clone(), jwt_service, hasher.clone()),
            register_service: RegisterService::new(credentials, codes, mailer, hasher),
            garage_store,
        })
    }
}

async fn ping() -> &'static str {
    "pong"
}

/// Build the complete API router
pub fn build_router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    let auth_service = state.auth_service.clone();

    Router::new()
        .route("/api/ping", get(ping))
        .merge(auth_api_router(AuthApiState {
            auth_service: auth_service.clone(),
        }))
        .merge(register_api_router(state.register_service))
        .merge(garage_api_router(
            GarageApiState {
                store: state.garage_store,
            },
            auth_service,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(make_span))
        .layer(cors_layer(cors_allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    cors.allow_origin(AllowOrigin::list(origins))
}

fn make_span(request: &Request<Body>) -> Span {
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
    )
}

/// Connect storage, build the router and serve until Ctrl+C
pub async fn run(config: Config) -> Result<(), AppError> {
    let (credentials, garage_store): (Arc<dyn CredentialStore>, Arc<dyn GarageStore>) =
        match &config.database {
            Some(db_config) => {
                let pool = create_pool_with_migrations(db_config).await?;
                tracing::info!("Connected to PostgreSQL, migrations applied");
                (
                    Arc::new(CredentialRepository::new(pool.clone())),
                    Arc::new(GarageRepository::new(pool)),
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory stores");
                (
                    Arc::new(InMemoryCredentialStore::new()),
                    Arc::new(InMemoryGarageStore::new()),
                )
            }
        };

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
        None => {
            tracing::warn!("SMTP not configured, confirmation codes will only be logged");
            Arc::new(LogMailer)
        }
    };

    let codes = Arc::new(InMemoryCodeCache::new(config.confirmation_code_ttl));
    codes.clone().spawn_purge_task(CODE_PURGE_PERIOD);

    let state = AppState::new(&config, credentials, garage_store, mailer, codes)?;
    let app = build_router(state, &config.cors_allowed_origins);

    let listener = tokio::net::TcpListener::bind(config.server_addr).await?;
    tracing::info!("listening on http://{}", config.server_addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}
