//! HTTP middleware and extractors for storefront.

pub mod session;

pub use session::{SessionContext, session_token_from_headers};
