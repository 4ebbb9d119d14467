use std::collections::HashMap;

use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderValue};

use crate::foundation::error::{OutfitError, OutfitResult};

/// Complete images never change for a given URL.
pub const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";
/// Partial images are kept briefly by the requesting client only.
pub const CACHE_PARTIAL: &str = "private, max-age=604800";
/// Redirects and stale-`updatedAt` renders.
pub const CACHE_SHORT: &str = "public, max-age=600";
/// Errors.
pub const CACHE_NO_STORE: &str = "no-store";
/// Seconds a client should wait after a 503.
pub const RETRY_AFTER_SECS: u32 = 5;

/// A framework-agnostic response: status, headers and body bytes.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body bytes.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A PNG body with the given status and cache policy.
    pub fn png(status: StatusCode, body: Vec<u8>, cache_control: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png"));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
        Self {
            status,
            headers,
            body,
        }
    }

    /// A 302 to `location`.
    pub fn redirect(location: &str) -> OutfitResult<Self> {
        let location = HeaderValue::from_str(location).map_err(|e| {
            OutfitError::render(format!("redirect location is not a valid header: {e}"))
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, location);
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_SHORT));
        Ok(Self {
            status: StatusCode::FOUND,
            headers,
            body: Vec::new(),
        })
    }

    /// Plain-text error response with the status mapped from `err`.
    pub fn error(err: &OutfitError) -> Self {
        let status = err.status();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_NO_STORE));
        if err.is_retryable() {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        Self {
            status,
            headers,
            body: err.to_string().into_bytes(),
        }
    }

    /// Header value as a string, if present and valid ASCII.
    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Set or replace a header.
    pub fn set_header(&mut self, name: header::HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }
}

/// Decoded query string parameters. The first occurrence of a key wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    params: HashMap<String, String>,
}

impl Query {
    /// Parse a raw query string, with or without the leading `?`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let mut params = HashMap::new();
        for (k, v) in url::form_urlencoded::parse(raw.as_bytes()) {
            params.entry(k.into_owned()).or_insert_with(|| v.into_owned());
        }
        Self { params }
    }

    /// Build from key/value pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut params = HashMap::new();
        for (k, v) in pairs {
            params
                .entry(k.to_string())
                .or_insert_with(|| v.to_string());
        }
        Self { params }
    }

    /// Value of `key`, if present and non-blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Value of `key`, or a validation error naming the missing parameter.
    pub fn require(&self, key: &str) -> OutfitResult<&str> {
        self.get(key)
            .ok_or_else(|| OutfitError::validation(format!("missing required parameter '{key}'")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/service/http.rs"]
mod tests;
