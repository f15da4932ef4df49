//! Session id transport over the `Cookie` / `Set-Cookie` headers.

use crate::errors::{SessionError, SessionResult};
use crate::session::validate_session_id;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};

#[derive(Debug, Clone)]
pub struct SessionCookie {
    name: String,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Value of the session cookie across all `Cookie` headers, if present and non-empty.
    pub fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.name && !value.is_empty())
            .map(|(_, value)| value.trim_matches('"').to_string())
    }

    /// Append a `Set-Cookie` header carrying `id`.
    pub fn set_session_id(&self, headers: &mut HeaderMap, id: &str) -> SessionResult<()> {
        validate_session_id(id)?;
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", self.name, id);
        let value =
            HeaderValue::from_str(&cookie).map_err(|_| SessionError::InvalidId(id.to_string()))?;
        headers.append(SET_COOKIE, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for c in cookies {
            headers.append(COOKIE, HeaderValue::from_str(c).unwrap());
        }
        headers
    }

    #[test]
    fn test_reads_named_cookie_among_others() {
        let cookie = SessionCookie::new("session_id");
        let h = headers(&["theme=dark; session_id=abc123; lang=en"]);
        assert_eq!(cookie.session_id(&h).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_reads_across_multiple_headers() {
        let cookie = SessionCookie::new("sid");
        let h = headers(&["a=1", "sid=\"xyz\""]);
        assert_eq!(cookie.session_id(&h).as_deref(), Some("xyz"));
    }

    #[test]
    fn test_missing_or_empty_cookie() {
        let cookie = SessionCookie::new("sid");
        assert_eq!(cookie.session_id(&HeaderMap::new()), None);
        assert_eq!(cookie.session_id(&headers(&["sid="])), None);
        assert_eq!(cookie.session_id(&headers(&["sidx=1; xsid=2"])), None);
    }

    #[test]
    fn test_set_cookie_attributes() {
        let cookie = SessionCookie::new("sid");
        let mut h = HeaderMap::new();
        cookie.set_session_id(&mut h, "abc").unwrap();
        assert_eq!(
            h.get(SET_COOKIE).unwrap(),
            "sid=abc; Path=/; HttpOnly; SameSite=Lax"
        );
    }

    #[test]
    fn test_set_cookie_rejects_unsafe_id() {
        let cookie = SessionCookie::new("sid");
        let mut h = HeaderMap::new();
        let err = cookie.set_session_id(&mut h, "a;b").unwrap_err();
        assert!(matches!(err, SessionError::InvalidId(_)));
        assert!(h.is_empty());
    }
}
