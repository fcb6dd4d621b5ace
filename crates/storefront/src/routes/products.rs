//! Product catalog route handlers.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::Result;
use crate::models::product::Product;
use crate::state::AppState;

/// List all products, new arrivals first.
///
/// GET /api/products
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list().await?;
    Ok(Json(products))
}
