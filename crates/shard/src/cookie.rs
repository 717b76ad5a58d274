//! The `sid` session cookie.

use chrono::{DateTime, Duration, Utc};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE_NAME: &str = "sid";

/// How long a browser keeps the session cookie.
pub const SESSION_COOKIE_LIFETIME_DAYS: i64 = 356;

/// A cookie to be set on the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    /// `None` for local and development hosts.
    pub domain: Option<String>,
    pub expires: DateTime<Utc>,
    pub http_only: bool,
}

impl SessionCookie {
    /// Builds the `sid` cookie for a freshly issued token.
    pub fn session(token: impl Into<String>, service_domain: &str, now: DateTime<Utc>) -> Self {
        Self {
            name: SESSION_COOKIE_NAME.to_string(),
            value: token.into(),
            path: "/".to_string(),
            domain: (!is_local_host(service_domain)).then(|| service_domain.to_string()),
            expires: now + Duration::days(SESSION_COOKIE_LIFETIME_DAYS),
            http_only: true,
        }
    }

    /// Renders the cookie as a `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        let mut value = format!("{}={}; Path={}", self.name, self.value, self.path);
        if let Some(domain) = &self.domain {
            value.push_str("; Domain=");
            value.push_str(domain);
        }
        value.push_str("; Expires=");
        value.push_str(&self.expires.format("%a, %d %b %Y %H:%M:%S GMT").to_string());
        if self.http_only {
            value.push_str("; HttpOnly");
        }
        value
    }
}

/// Returns the value of cookie `name` from a `Cookie` request header.
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim())
    })
}

fn is_local_host(domain: &str) -> bool {
    let host = domain.split(':').next().unwrap_or_default();
    host.is_empty() || host == "localhost" || host.starts_with("127.")
}
