//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (pings the database)
//!
//! # Auth (JSON API)
//! POST /api/auth/request-otp   - Issue a signup code for an email
//! POST /api/auth/verify-otp    - Verify a submitted code
//! POST /api/auth/signup        - Create an account (OTP-gated), sets session cookie
//! POST /api/auth/login         - Password login, sets session cookie
//! GET  /api/auth/session       - Current identity ({user|null}, always 200)
//! POST /api/auth/logout        - Clear the session cookie
//!
//! # Contact
//! POST /api/contact            - Contact form submission
//!
//! # Catalog
//! GET  /api/products           - Product listing (new arrivals first)
//! ```

pub mod auth;
pub mod contact;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/request-otp", post(auth::request_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/session", get(auth::session))
        .route("/logout", post(auth::logout))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/api/auth", auth_routes())
        .route("/api/contact", post(contact::submit))
        .route("/api/products", get(products::index))
}
