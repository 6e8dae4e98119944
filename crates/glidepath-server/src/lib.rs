//! Glidepath Web Server
//!
//! Axum-based REST API for the Glidepath account-sync service.
//!
//! Security features:
//! - Identity from a trusted upstream header (secure by default, use
//!   --no-auth for local dev)
//! - Optional API-key authentication for internal callers
//! - Restrictive CORS policy and security headers
//! - Sanitized error responses (internal errors are logged, not returned)

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use glidepath_core::aggregator::Aggregator;
use glidepath_core::db::Database;
use glidepath_core::error::Error as CoreError;

mod handlers;
mod scheduler;


pub use scheduler::{start_sync_scheduler, SyncScheduleConfig};

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Trusted header carrying the authenticated user id, injected by the
/// upstream identity gateway
const USER_ID_HEADER: &str = "x-glidepath-user";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only in production)
    pub allowed_origins: Vec<String>,
    /// API keys for internal service authentication (alternative to the
    /// identity gateway). Format: "Bearer <key>" in Authorization header;
    /// internal callers still set the user header to pick the acting user.
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// None when no aggregator backend is configured; sync triggers then
    /// fail with 503 rather than per-item errors
    pub aggregator: Option<Aggregator>,
}

/// Authentication middleware - validates the identity header or an API key
///
/// The user header is trusted the way an access-gateway header is trusted:
/// the server is expected to sit behind a proxy that strips and re-injects
/// it after authenticating the session. API keys are compared using
/// constant-time comparison to prevent timing attacks.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    let user = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty());

    if let Some(user) = user {
        info!(user = %user, path = %request.uri().path(), "Authenticated via identity header");
        return next.run(request).await;
    }

    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        info!(user = "api-key", path = %request.uri().path(), "Authenticated via API key");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time
/// comparison to prevent timing attacks.
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    for key in valid_keys {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        if provided_bytes.len() == key_bytes.len() && provided_bytes.ct_eq(key_bytes).into() {
            return true;
        }
    }
    false
}

/// Extract the acting user id from request headers
///
/// Every row in the store is scoped by user id; a request without one can't
/// be served. In --no-auth dev mode requests without the header act as a
/// fixed local user.
pub fn get_user_id(headers: &HeaderMap, config: &ServerConfig) -> Result<String, AppError> {
    if let Some(user) = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
    {
        return Ok(user.to_string());
    }

    if !config.require_auth {
        return Ok("local-dev".to_string());
    }

    Err(AppError::unauthorized(&format!(
        "{} header required",
        USER_ID_HEADER
    )))
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let aggregator = Aggregator::from_env();
    match &aggregator {
        Some(agg) => info!("Aggregator backend configured: {}", agg.host()),
        None => info!(
            "ℹ️  Aggregator backend not configured (set GLIDEPATH_PLAID_HOST, \
             GLIDEPATH_PLAID_CLIENT_ID, GLIDEPATH_PLAID_SECRET to enable sync)"
        ),
    }
    create_router_with_aggregator(db, config, aggregator)
}

/// Create the application router with an explicit aggregator (for testing)
pub fn create_router_with_aggregator(
    db: Database,
    config: ServerConfig,
    aggregator: Option<Aggregator>,
) -> Router {
    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        aggregator,
    });

    let api_routes = Router::new()
        // Linking
        .route("/plaid/link", post(handlers::link_item))
        .route("/plaid/items/:id", delete(handlers::disconnect_item))
        .route("/items", get(handlers::list_items))
        // Sync
        .route("/sync/accounts", post(handlers::sync_accounts))
        .route("/sync/transactions", post(handlers::sync_transactions))
        .route("/sync/status", get(handlers::sync_status))
        // Reads
        .route("/accounts", get(handlers::list_accounts))
        .route("/accounts/:id/history", get(handlers::account_history))
        .route("/transactions", get(handlers::list_transactions))
        .route("/reports/summary", get(handlers::spending_summary))
        // Account deletion
        .route("/user", delete(handlers::delete_user));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16) -> anyhow::Result<()> {
    serve_with_config(db, host, port, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    // Check aggregator reachability so misconfiguration shows up at startup
    // rather than on the first sync
    let aggregator = Aggregator::from_env();
    match &aggregator {
        Some(agg) => {
            if agg.health_check().await {
                info!("✅ Aggregator backend connected: {}", agg.host());
            } else {
                warn!("⚠️  Aggregator configured but not responding: {}", agg.host());
            }
        }
        None => {
            info!(
                "ℹ️  Aggregator backend not configured (set GLIDEPATH_PLAID_HOST, \
                 GLIDEPATH_PLAID_CLIENT_ID, GLIDEPATH_PLAID_SECRET to enable sync)"
            );
        }
    }

    // Start the scheduled refresh if configured
    if let Some(schedule) = SyncScheduleConfig::from_env() {
        match &aggregator {
            Some(agg) => start_sync_scheduler(db.clone(), agg.clone(), schedule),
            None => warn!("Scheduled sync configured but no aggregator backend available"),
        }
    }

    let app = create_router_with_aggregator(db, config, aggregator);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<CoreError>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unavailable(msg: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(msg) => Self::not_found(&msg),
            CoreError::DuplicateItem(id) => Self {
                status: StatusCode::CONFLICT,
                message: format!("Item already linked: {}", id),
                internal: None,
            },
            CoreError::Config(msg) => Self::unavailable(&msg),
            CoreError::InvalidData(msg) => Self::bad_request(&msg),
            err => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                // Keep full error for logging
                internal: Some(err),
            },
        }
    }
}
