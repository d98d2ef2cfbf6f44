//! Request and response model shared by the store and the fetcher.
//!
//! A [`Response`] owns a body that is read exactly once. It does not
//! implement `Clone`; code that needs to both return a response and persist
//! it must call [`Response::duplicate`] at the branch point.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::cache::hash::compute_cache_key;

/// Body served when neither the store nor the network can answer.
pub const OFFLINE_BODY: &str = "Offline - Resource not available";

/// A request as seen by the worker: method plus absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Request {
    pub method: String,
    pub url: String,
}

impl Request {
    pub fn new(method: &str, url: impl Into<String>) -> Self {
        Self { method: method.to_ascii_uppercase(), url: url.into() }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Identity under which stores key this request. The fragment is not part of it.
    pub fn key(&self) -> String {
        compute_cache_key(&self.method, &identity_url(&self.url))
    }
}

fn identity_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.into()
        }
        Err(_) => raw.split('#').next().unwrap_or(raw).to_string(),
    }
}

/// Origin classification of a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response.
    Basic,
    Cors,
    Opaque,
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Error => "error",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "basic" => Some(ResponseType::Basic),
            "cors" => Some(ResponseType::Cors),
            "opaque" => Some(ResponseType::Opaque),
            "error" => Some(ResponseType::Error),
            _ => None,
        }
    }
}

/// A response with a single-use body.
#[derive(Debug)]
pub struct Response {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    pub headers: BTreeMap<String, String>,
    body: Bytes,
}

impl Response {
    pub fn new(url: impl Into<String>, status: u16, response_type: ResponseType, body: impl Into<Bytes>) -> Self {
        Self {
            url: url.into(),
            status,
            status_text: status_text(status).to_string(),
            response_type,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Synthesized 503 returned when a cache-first lookup and the network both fail.
    pub fn offline() -> Self {
        let mut response = Self::new("", 503, ResponseType::Basic, OFFLINE_BODY);
        response.headers.insert("content-type".to_string(), "text/plain".to_string());
        response
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Status in the 2xx range.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Only complete same-origin responses are written back at fetch time.
    pub fn is_cacheable(&self) -> bool {
        self.status == 200 && self.response_type == ResponseType::Basic
    }

    /// Produce an independent copy that can be consumed separately.
    pub fn duplicate(&self) -> Self {
        Self {
            url: self.url.clone(),
            status: self.status,
            status_text: self.status_text.clone(),
            response_type: self.response_type,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    /// Consume the response and take its body.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Consume the response and decode its body as UTF-8, lossily.
    pub fn text(self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}
