use crate::config::GateConfig;
use auth_session::RefreshCredential;
use axum::http::{
    header::{InvalidHeaderValue, COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use chrono::{DateTime, Utc};

const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// `Set-Cookie` value carrying a refresh credential until its session expires
///
/// # Errors
///
/// Only if the credential contains bytes not allowed in a header.
pub fn refresh_cookie(
    config: &GateConfig,
    credential: &RefreshCredential,
) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&build(
        config,
        &credential.value,
        &http_date(credential.expires_at),
        None,
    ))
}

/// `Set-Cookie` value that removes the refresh cookie from the client
///
/// # Errors
///
/// Only if the configured cookie name is not header-safe.
pub fn clear_refresh_cookie(config: &GateConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    HeaderValue::from_str(&build(config, "", EXPIRED, Some(0)))
}

fn build(config: &GateConfig, value: &str, expires: &str, max_age: Option<i64>) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Expires={}",
        config.cookies.refresh_cookie_name, value, expires
    );
    if let Some(max_age) = max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if config.secure_cookies() {
        cookie.push_str("; Secure");
    }
    cookie
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Whether a response already sets (or clears) the named cookie
pub fn sets_cookie(headers: &HeaderMap, name: &str) -> bool {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split_once('='))
        .any(|(key, _)| key.trim() == name)
}

/// Value of the named cookie across all `Cookie` headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use chrono::TimeZone;

    fn credential() -> RefreshCredential {
        RefreshCredential {
            value: "abc.def.ghi".to_string(),
            expires_at: Utc.with_ymd_and_hms(2030, 3, 4, 5, 6, 7).unwrap(),
        }
    }

    #[test]
    fn test_refresh_cookie_attributes() {
        let cookie = refresh_cookie(&GateConfig::default(), &credential()).unwrap();
        assert_eq!(
            cookie.to_str().unwrap(),
            "refreshToken=abc.def.ghi; HttpOnly; SameSite=Strict; Path=/; Expires=Mon, 04 Mar 2030 05:06:07 GMT; Secure"
        );
    }

    #[test]
    fn test_no_secure_flag_in_development() {
        let config = GateConfig {
            environment: Environment::Development,
            ..GateConfig::default()
        };
        let cookie = refresh_cookie(&config, &credential()).unwrap();
        assert!(!cookie.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_refresh_cookie(&GateConfig::default()).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("refreshToken=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains(EXPIRED));
    }

    #[test]
    fn test_sets_cookie_matches_name_only() {
        let mut headers = HeaderMap::new();
        assert!(!sets_cookie(&headers, "refreshToken"));

        headers.append(SET_COOKIE, HeaderValue::from_static("theme=dark; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("refreshTokenOld=x; Path=/"));
        assert!(!sets_cookie(&headers, "refreshToken"));

        headers.append(SET_COOKIE, clear_refresh_cookie(&GateConfig::default()).unwrap());
        assert!(sets_cookie(&headers, "refreshToken"));
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; refreshToken=xyz"));
        headers.append(COOKIE, HeaderValue::from_static("access=tok"));

        assert_eq!(read_cookie(&headers, "refreshToken").as_deref(), Some("xyz"));
        assert_eq!(read_cookie(&headers, "access").as_deref(), Some("tok"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_empty_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("refreshToken="));
        assert_eq!(read_cookie(&headers, "refreshToken"), None);
    }
}
