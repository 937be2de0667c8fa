//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (database ping)
//!
//! # Auth (strict rate limit)
//! POST   /api/auth/register
//! POST   /api/auth/login
//! POST   /api/auth/logout
//! GET    /api/auth/profile
//! PUT    /api/auth/profile
//! PUT    /api/auth/password
//! POST   /api/auth/password-reset
//! POST   /api/auth/password-reset/confirm
//! POST   /api/auth/verify-email
//! POST   /api/auth/verify-email/confirm
//!
//! # Catalog
//! GET    /api/products                    - Filtered, paginated listing
//! GET    /api/products/{id}               - Detail with variants and similar products
//! GET    /api/categories
//! GET    /api/categories/{id}
//!
//! # Cart (customers)
//! GET    /api/cart
//! DELETE /api/cart
//! POST   /api/cart/items
//! PUT    /api/cart/items/{id}
//! DELETE /api/cart/items/{id}
//!
//! # Addresses
//! GET    /api/addresses
//! POST   /api/addresses
//! PUT    /api/addresses/{id}
//! DELETE /api/addresses/{id}
//!
//! # Orders (customers)
//! POST   /api/orders                      - Checkout
//! GET    /api/orders
//! GET    /api/orders/{id}
//!
//! # Admin
//! GET    /api/admin/dashboard
//! GET    /api/admin/users
//! PUT    /api/admin/users/{id}/role
//! PUT    /api/admin/users/{id}/status
//! GET    /api/admin/categories
//! POST   /api/admin/categories
//! GET    /api/admin/coupons
//! POST   /api/admin/coupons
//! GET    /api/admin/orders
//! GET    /api/admin/orders/{id}
//! PUT    /api/admin/orders/{id}/status
//! POST   /api/admin/products
//! PUT    /api/admin/products/{id}
//! DELETE /api/admin/products/{id}
//! ```

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod orders;
pub mod products;
pub mod response;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post, put},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{
    api_rate_limiter, auth_rate_limiter, create_cors_layer, create_session_layer,
    request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::profile).put(auth::update_profile))
        .route("/password", put(auth::change_password))
        .route("/password-reset", post(auth::request_password_reset))
        .route(
            "/password-reset/confirm",
            post(auth::confirm_password_reset),
        )
        .route("/verify-email", post(auth::request_email_verification))
        .route(
            "/verify-email/confirm",
            post(auth::confirm_email_verification),
        )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the category routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index))
        .route("/{id}", get(categories::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{id}",
            put(cart::update_item).delete(cart::remove_item),
        )
}

/// Create the address routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::index).post(addresses::create))
        .route(
            "/{id}",
            put(addresses::update).delete(addresses::remove),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::place))
        .route("/{id}", get(orders::show))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(admin::dashboard))
        .route("/users", get(admin::users))
        .route("/users/{id}/role", put(admin::set_user_role))
        .route("/users/{id}/status", put(admin::set_user_status))
        .route(
            "/categories",
            get(categories::admin_index).post(categories::create),
        )
        .route("/coupons", get(admin::coupons).post(admin::create_coupon))
        .route("/orders", get(admin::orders))
        .route("/orders/{id}", get(admin::order))
        .route("/orders/{id}/status", put(admin::set_order_status))
        .route("/products", post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::remove),
        )
}

/// Every `/api` route except auth, without rate limiting.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/categories", category_routes())
        .nest("/cart", cart_routes())
        .nest("/addresses", address_routes())
        .nest("/orders", order_routes())
        .nest("/admin", admin_routes())
}

/// Create all routes for the storefront, rate limited per group.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes().layer(auth_rate_limiter()))
        .nest("/api", api_routes().layer(api_rate_limiter()))
}

/// The full application: routes, sessions and the middleware stack.
///
/// Serve with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// rate limiter can fall back to the peer address.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());
    let cors_layer = create_cors_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .layer(session_layer)
        .layer(cors_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
