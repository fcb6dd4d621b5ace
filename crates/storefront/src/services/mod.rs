//! Business-logic services for the storefront.
//!
//! Services orchestrate repositories and external collaborators (SMTP) and
//! hold no connection state of their own; handlers construct them per
//! request from [`crate::state::AppState`].

pub mod auth;
pub mod email;
pub mod otp;
pub mod session;

pub use auth::{AuthError, AuthService};
pub use email::{EmailError, EmailService, Mailer};
pub use otp::{OtpError, OtpService};
pub use session::SessionTokenService;
