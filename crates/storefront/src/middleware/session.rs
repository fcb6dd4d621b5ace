//! Session context extraction.
//!
//! Every boundary operation receives an explicit [`SessionContext`] rather
//! than reading ambient state: the extractor parses the session cookie,
//! verifies the token, and degrades to "not logged in" on any failure so
//! pages render logged-out instead of erroring.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::COOKIE, request::Parts},
};

use crate::models::session::CurrentUser;
use crate::services::session::SESSION_COOKIE_NAME;
use crate::state::AppState;

/// Identity established for the current request, if any.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// The verified user, or `None` when not logged in.
    pub user: Option<CurrentUser>,
}

impl SessionContext {
    /// Whether the request carries a valid session.
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }
}

/// Extract the raw session token value from request cookies.
#[must_use]
pub fn session_token_from_headers(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(SESSION_COOKIE_NAME)?.strip_prefix('='))
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for SessionContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = session_token_from_headers(&parts.headers)
            .and_then(|token| state.tokens().verify(token));

        Ok(Self { user })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(cookie: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(cookie).unwrap());
        headers
    }

    #[test]
    fn test_extracts_token_from_single_cookie() {
        let headers = headers("session_token=abc.def.ghi");
        assert_eq!(session_token_from_headers(&headers), Some("abc.def.ghi"));
    }

    #[test]
    fn test_extracts_token_among_other_cookies() {
        let headers = headers("theme=dark; session_token=tok123; lang=en");
        assert_eq!(session_token_from_headers(&headers), Some("tok123"));
    }

    #[test]
    fn test_missing_cookie_yields_none() {
        let headers = headers("theme=dark");
        assert_eq!(session_token_from_headers(&headers), None);
        assert_eq!(session_token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cleared_cookie_yields_none() {
        // A logged-out client may still send `session_token=`
        let headers = headers("session_token=");
        assert_eq!(session_token_from_headers(&headers), None);
    }

    #[test]
    fn test_prefix_named_cookie_not_confused() {
        let headers = headers("session_token_v2=zzz");
        assert_eq!(session_token_from_headers(&headers), None);
    }
}
