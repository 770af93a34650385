//! Quire Web Server
//!
//! Axum-based REST API for the Quire magazine subscription service.
//!
//! Security features:
//! - Credentials (bearer token or session cookie) are resolved by the configured auth provider
//! - Money movement is authorized against the resolved principal only, never the request body
//! - Auth provider outages fail closed
//! - Restrictive CORS policy
//! - Audit logging for charges, cancellations and subscription reads
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    catch_panic::CatchPanicLayer, cors::CorsLayer, services::ServeDir,
    set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use quire_core::{
    AuthProvider, Billing, Database, PaymentGateway, PortOneGateway, Principal, StaticTokenAuth,
    SupabaseAuth,
};

mod handlers;

/// Default session cookie (Supabase access token)
pub const DEFAULT_SESSION_COOKIE: &str = "sb-access-token";

/// Authorization header for bearer tokens
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// Cookie carrying the session access token
    pub session_cookie: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
        }
    }
}

impl ServerConfig {
    /// Read `QUIRE_ALLOWED_ORIGINS` (comma-separated) and `QUIRE_SESSION_COOKIE`
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var("QUIRE_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let session_cookie = std::env::var("QUIRE_SESSION_COOKIE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string());

        Self {
            allowed_origins,
            session_cookie,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub auth: Arc<dyn AuthProvider>,
    pub billing: Billing,
}

/// How the caller presented a credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Bearer,
    Session,
    None,
}

/// The resolved caller, attached to every request by [`auth_middleware`]
#[derive(Debug, Clone)]
pub struct Caller {
    pub principal: Option<Principal>,
    pub method: AuthMethod,
}

impl Caller {
    /// The principal, or 401
    pub fn require(&self) -> Result<&Principal, AppError> {
        self.principal
            .as_ref()
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }

    /// The principal only when it came from a bearer token
    pub fn bearer_principal(&self) -> Option<&Principal> {
        match self.method {
            AuthMethod::Bearer => self.principal.as_ref(),
            _ => None,
        }
    }

    /// Identifier recorded in the audit log
    pub fn audit_id(&self) -> String {
        self.principal
            .as_ref()
            .map(|p| p.id.clone())
            .unwrap_or_else(|| "anonymous".to_string())
    }
}

/// Extract a bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extract the session token from the named cookie
fn session_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.trim())
        .filter(|t| !t.is_empty())
}

/// Authentication middleware - resolves the caller's credential once per request
///
/// A bearer token takes precedence over the session cookie. Requests without a
/// credential pass through with no principal; handlers decide whether that is
/// acceptable. A credential the provider rejects also yields no principal. If the
/// provider cannot be reached the request fails with 500 rather than continuing
/// unauthenticated.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let (token, method) = match bearer_token(request.headers()) {
        Some(token) => (Some(token.to_string()), AuthMethod::Bearer),
        None => match session_token(request.headers(), &state.config.session_cookie) {
            Some(token) => (Some(token.to_string()), AuthMethod::Session),
            None => (None, AuthMethod::None),
        },
    };

    let principal = match token {
        Some(token) => match state.auth.resolve_token(&token).await {
            Ok(Some(principal)) => {
                debug!(user = %principal.id, method = ?method, path = %request.uri().path(), "Authenticated");
                Some(principal)
            }
            Ok(None) => {
                warn!(method = ?method, path = %request.uri().path(), "Credential rejected by auth provider");
                None
            }
            Err(e) => {
                error!(provider = state.auth.name(), error = %e, "Auth provider unavailable");
                return AppError::internal("Authentication service unavailable").into_response();
            }
        },
        None => None,
    };

    request
        .extensions_mut()
        .insert(Caller { principal, method });
    next.run(request).await
}

/// Record an audit entry after an irreversible gateway call
///
/// The gateway outcome is already final, so a failed audit write is only logged.
pub(crate) fn audit_after_gateway(
    state: &AppState,
    user_id: &str,
    action: &str,
    entity_id: &str,
    details: &str,
) {
    if let Err(e) = state
        .db
        .log_audit(user_id, action, Some("payment"), Some(entity_id), Some(details))
    {
        warn!(error = %e, action, entity_id, "Failed to write audit entry");
    }
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Build the auth provider from the environment
///
/// Supabase when `SUPABASE_URL` and a key are set, otherwise the static token
/// table from `QUIRE_DEV_TOKENS`. Fails when neither is configured.
pub fn auth_provider_from_env() -> anyhow::Result<Arc<dyn AuthProvider>> {
    if let Some(supabase) = SupabaseAuth::from_env()? {
        info!("Auth provider: Supabase ({})", supabase.base_url());
        return Ok(Arc::new(supabase));
    }
    if let Some(tokens) = StaticTokenAuth::from_env()? {
        warn!(
            "⚠️  Auth provider: static development tokens ({} configured) - do not expose to network!",
            tokens.len()
        );
        return Ok(Arc::new(tokens));
    }
    anyhow::bail!(
        "No auth provider configured. Set SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY \
         (or SUPABASE_ANON_KEY), or QUIRE_DEV_TOKENS for local development."
    )
}

/// Build the payment gateway from the environment; `None` when not configured
pub fn gateway_from_env() -> anyhow::Result<Option<Arc<dyn PaymentGateway>>> {
    match PortOneGateway::from_env()? {
        Some(gateway) => {
            info!(
                "Payment gateway: PortOne ({}, currency {})",
                gateway.base_url(),
                gateway.currency()
            );
            Ok(Some(Arc::new(gateway)))
        }
        None => {
            warn!("⚠️  Payment gateway not configured (set PORTONE_API_SECRET); charges and cancellations will fail");
            Ok(None)
        }
    }
}

/// Create the application router
pub fn create_router(
    db: Database,
    static_dir: Option<&str>,
    config: ServerConfig,
    auth: Arc<dyn AuthProvider>,
    gateway: Option<Arc<dyn PaymentGateway>>,
) -> Router {
    let state = Arc::new(AppState {
        billing: Billing::new(db.clone(), gateway),
        db,
        config: config.clone(),
        auth,
    });

    let api_routes = Router::new()
        // Auth
        .route("/me", get(handlers::get_me))
        // Payments
        .route("/payments", post(handlers::create_payment))
        .route("/payments/cancel", post(handlers::cancel_payment))
        .route("/payments/history", get(handlers::list_payment_history))
        // Subscription status
        .route("/subscription", get(handlers::get_subscription))
        // Magazines
        .route(
            "/magazines",
            get(handlers::list_magazines).post(handlers::create_magazine),
        )
        .route("/magazines/:id", get(handlers::get_magazine));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true)
    };

    // CSP: same-origin scripts, inline styles, remote cover images
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' https: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
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
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server with configuration from the environment
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
) -> anyhow::Result<()> {
    let auth = auth_provider_from_env()?;
    let gateway = gateway_from_env()?;
    serve_with_config(db, host, port, static_dir, ServerConfig::from_env(), auth, gateway).await
}

/// Start the server with explicit configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
    auth: Arc<dyn AuthProvider>,
    gateway: Option<Arc<dyn PaymentGateway>>,
) -> anyhow::Result<()> {
    if config.allowed_origins.is_empty() {
        info!("CORS: same-origin only (set QUIRE_ALLOWED_ORIGINS to allow others)");
    }

    let app = create_router(db, static_dir, config, auth, gateway);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Turn a handler panic into the generic error body
fn handle_panic(_err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    error!("Handler panicked");
    AppError::internal("An internal error occurred").into_response()
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    details: Option<serde_json::Value>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            details: None,
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn forbidden(msg: &str) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, status = self.status.as_u16(), "Internal error");
        }

        let mut body = serde_json::json!({
            "success": false,
            "error": self.message,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }

        (self.status, Json(body)).into_response()
    }
}

impl From<quire_core::Error> for AppError {
    fn from(err: quire_core::Error) -> Self {
        use quire_core::Error;

        match err {
            Error::Validation(msg) => Self::bad_request(&msg),
            Error::Unauthenticated(msg) => Self::unauthorized(&msg),
            Error::Forbidden(msg) => Self::forbidden(&msg),
            Error::NotFound(msg) => Self::not_found(&msg),
            Error::Gateway {
                status,
                message,
                details,
            } => {
                // Pass the provider's status through; anything that is not an error status becomes 502
                let status = StatusCode::from_u16(status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                warn!(status = status.as_u16(), message = %message, "Payment gateway error");
                Self {
                    status,
                    message,
                    details: Some(details),
                    internal: None,
                }
            }
            Error::Configuration(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Server configuration error".to_string(),
                details: None,
                internal: Some(err.into()),
            },
            err if err.is_persistence() => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "A storage error occurred".to_string(),
                details: None,
                internal: Some(err.into()),
            },
            err => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                // Return generic message to client
                message: "An internal error occurred".to_string(),
                details: None,
                // Keep full error for logging
                internal: Some(err.into()),
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(&rejection.body_text())
    }
}

#[cfg(test)]
mod tests;
