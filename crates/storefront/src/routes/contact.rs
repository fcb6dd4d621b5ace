//! Contact form route handlers.

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use solstice_core::Email;

use crate::db::ContactRepository;
use crate::error::{AppError, Result};
use crate::models::contact::ContactMessage;
use crate::state::AppState;

/// Contact form data.
#[derive(Debug, Deserialize)]
pub struct ContactBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

/// Submit the contact form.
///
/// POST /api/contact
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn submit(
    State(state): State<AppState>,
    Json(body): Json<ContactBody>,
) -> Result<impl IntoResponse> {
    if body.name.trim().is_empty() || body.email.trim().is_empty() || body.message.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "Missing required fields".to_string(),
        ));
    }

    let email = Email::parse_normalized(&body.email).map_err(|_| {
        AppError::BadRequest("Please enter a valid email address.".to_string())
    })?;

    let message = ContactMessage {
        name: body.name.trim().to_string(),
        email,
        message: body.message.trim().to_string(),
    };

    ContactRepository::new(state.pool()).insert(&message).await?;
    tracing::info!(email = %message.email, "Contact form submitted");

    Ok(Json(json!({
        "message": "Contact form submitted successfully"
    })))
}
