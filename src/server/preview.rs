//! Preview session cookie
//!
//! The cookie holds the preview ref, percent-encoded. Its presence switches
//! every page render to that ref.

use axum::http::HeaderMap;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

use crate::client::ContentRef;

pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get("cookie")?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| {
            let (key, value) = cookie.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}

/// Content reference selected by the request's preview cookie
pub fn content_ref(headers: &HeaderMap, cookie_name: &str) -> ContentRef {
    let token = get_cookie_value(headers, cookie_name).and_then(|raw| {
        percent_decode_str(&raw)
            .decode_utf8()
            .ok()
            .map(|token| token.into_owned())
    });
    ContentRef::from_preview(token)
}

/// `Set-Cookie` value starting a preview session
pub fn start_cookie(name: &str, token: &str, path: &str) -> String {
    format!(
        "{}={}; Path={}; HttpOnly; SameSite=Lax",
        name,
        utf8_percent_encode(token, NON_ALPHANUMERIC),
        path
    )
}

/// `Set-Cookie` value ending a preview session
pub fn clear_cookie(name: &str, path: &str) -> String {
    format!("{name}=; Path={path}; Max-Age=0; HttpOnly; SameSite=Lax")
}
