/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use kvtodo_api::{app::AppState, config::Config};
/// use kvtodo_shared::store::RedisStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let store = RedisStore::connect(config.redis.clone()).await?;
/// let state = AppState::new(Arc::new(store), &config)?;
/// let app = kvtodo_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use kvtodo_shared::{
    auth::{
        identity::IdentityService,
        jwt::{TokenError, TokenService},
        middleware::jwt_auth_middleware,
    },
    models::{task::Task, user::User},
    repository::{KvRepository, TaskRepository},
    store::KvStore,
};
use std::sync::Arc;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Everything inside is behind an `Arc` and read-only after startup.
#[derive(Clone)]
pub struct AppState {
    /// Key-value store shared by every repository
    pub store: Arc<dyn KvStore>,

    /// Task repository
    pub tasks: Arc<dyn TaskRepository>,

    /// Registration and login
    pub identity: IdentityService,

    /// Token signing and verification
    pub tokens: Arc<TokenService>,
}

impl AppState {
    /// Wires repositories and services over `store`
    ///
    /// # Errors
    ///
    /// Returns `TokenError::InvalidSecret` if the configured JWT secret or
    /// lifetime is rejected.
    pub fn new(store: Arc<dyn KvStore>, config: &Config) -> Result<Self, TokenError> {
        let tokens = Arc::new(TokenService::new(
            &config.jwt.secret,
            config.jwt.expiration_hours,
        )?);

        let users: KvRepository<User> = KvRepository::new(store.clone());
        let tasks: KvRepository<Task> = KvRepository::new(store.clone());

        let identity = IdentityService::new(Arc::new(users), tokens.clone(), config.password);

        Ok(Self {
            store,
            tasks: Arc::new(tasks),
            identity,
            tokens,
        })
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET /health                   # Store connectivity (public)
/// └── /api/
///     ├── /auth/
///     │   ├── POST /register        # public
///     │   ├── POST /login           # public
///     │   └── GET  /validate        # bearer token
///     └── /todo                     # bearer token
///         ├── POST /                # create task
///         ├── PUT  /                # update status
///         └── GET  /:user_id        # list tasks
/// ```
///
/// # Middleware Stack
///
/// 1. Logging (tower-http TraceLayer), all routes
/// 2. Bearer authentication, per route group
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let bearer_auth = middleware::from_fn_with_state(state.tokens.clone(), jwt_auth_middleware);

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Register and login are public; validate needs a token
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .merge(
            Router::new()
                .route("/validate", get(routes::auth::validate))
                .layer(bearer_auth.clone()),
        );

    let todo_routes = Router::new()
        .route(
            "/",
            post(routes::todo::create_task).put(routes::todo::update_task),
        )
        .route("/:user_id", get(routes::todo::list_tasks))
        .layer(bearer_auth);

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/todo", todo_routes);

    Router::new()
        .merge(health_routes)
        .nest("/api", api_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
