//! Credential extraction from request headers

use crate::config::CookieConfig;
use crate::cookie::read_cookie;
use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderName, Uri};

/// Header a client sets when retrying a refresh after a 401
pub const RETRY_HEADER: HeaderName = HeaderName::from_static("x-refresh-retry");

/// Bearer token, falling back to the access cookie when one is configured
pub fn access_token(headers: &HeaderMap, cookies: &CookieConfig) -> Option<String> {
    bearer_token(headers).or_else(|| {
        cookies
            .access_cookie_name
            .as_deref()
            .and_then(|name| read_cookie(headers, name))
    })
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_string())
}

pub fn refresh_credential(headers: &HeaderMap, cookies: &CookieConfig) -> Option<String> {
    read_cookie(headers, &cookies.refresh_cookie_name)
}

/// `?retry=true` (or `1`, or a bare `retry`) or the retry header
pub fn retry_requested(headers: &HeaderMap, uri: &Uri) -> bool {
    let from_query = uri.query().is_some_and(|query| {
        query
            .split('&')
            .map(|pair| pair.split_once('=').unwrap_or((pair, "true")))
            .any(|(key, value)| key == "retry" && is_truthy(value))
    });

    let from_header = headers
        .get(&RETRY_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(is_truthy);

    from_query || from_header
}

fn is_truthy(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue};

    fn headers(pairs: &[(&str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_static(value),
            );
        }
        map
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(
            bearer_token(&headers(&[("authorization", "Bearer abc.def")])).as_deref(),
            Some("abc.def")
        );
        assert_eq!(
            bearer_token(&headers(&[("authorization", "bearer abc")])).as_deref(),
            Some("abc")
        );
        assert_eq!(bearer_token(&headers(&[("authorization", "Basic abc")])), None);
        assert_eq!(bearer_token(&headers(&[("authorization", "Bearer ")])), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_access_cookie_fallback_only_when_configured() {
        let map = headers(&[("cookie", "access_token=from-cookie")]);

        assert_eq!(access_token(&map, &CookieConfig::default()), None);

        let cookies = CookieConfig {
            access_cookie_name: Some("access_token".to_string()),
            ..CookieConfig::default()
        };
        assert_eq!(access_token(&map, &cookies).as_deref(), Some("from-cookie"));

        let mut both = map.clone();
        both.insert("authorization", HeaderValue::from_static("Bearer from-header"));
        assert_eq!(access_token(&both, &cookies).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_refresh_credential_uses_configured_name() {
        let map = headers(&[(COOKIE.as_str(), "refreshToken=r1; other=x")]);
        assert_eq!(refresh_credential(&map, &CookieConfig::default()).as_deref(), Some("r1"));
    }

    #[test]
    fn test_retry_flag() {
        let none = HeaderMap::new();
        assert!(retry_requested(&none, &"/api/auth/refresh?retry=true".parse().unwrap()));
        assert!(retry_requested(&none, &"/api/auth/refresh?a=b&retry=1".parse().unwrap()));
        assert!(retry_requested(&none, &"/api/auth/refresh?retry".parse().unwrap()));
        assert!(!retry_requested(&none, &"/api/auth/refresh?retry=false".parse().unwrap()));
        assert!(!retry_requested(&none, &"/api/auth/refresh".parse().unwrap()));

        let header = headers(&[("x-refresh-retry", "true")]);
        assert!(retry_requested(&header, &"/api/auth/refresh".parse().unwrap()));
    }
}
