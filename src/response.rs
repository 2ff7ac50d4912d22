use http::HeaderMap;

/// The draft/final response threaded through the middleware chain. A
/// "draft" `Response` is seeded by `MiddlewareChain::run` before any
/// middleware executes (`Response::ok()`); middlewares and the terminal
/// handler may ignore it entirely and return their own.
#[derive(Debug, Clone)]
pub struct Response {
    pub status_code: u16,
    pub headers: HeaderMap,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl Response {
    /// `200, text/plain, body="[]"` — the chain's seed value and the usual
    /// "accepted, nothing to say" reply (e.g. the SSL check short-circuit).
    pub fn ok() -> Self {
        Response {
            status_code: 200,
            headers: HeaderMap::new(),
            content_type: "text/plain".to_string(),
            body: b"[]".to_vec(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Response {
            status_code: status,
            headers: HeaderMap::new(),
            content_type: "text/plain".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Response {
            status_code: status,
            headers: HeaderMap::new(),
            content_type: "text/plain".to_string(),
            body: body.into().into_bytes(),
        }
    }

    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Response {
            status_code: status,
            headers: HeaderMap::new(),
            content_type: "application/json".to_string(),
            body: serde_json::to_vec(&body).unwrap_or_else(|_| b"{}".to_vec()),
        }
    }

    /// `302` redirect to `location` via a `Location` header.
    pub fn redirect(location: &str) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = http::HeaderValue::from_str(location) {
            headers.insert(http::header::LOCATION, value);
        }
        Response {
            status_code: 302,
            headers,
            content_type: "text/plain".to_string(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl AsRef<str>) -> Self {
        if let Ok(v) = http::HeaderValue::from_str(value.as_ref()) {
            self.headers
                .insert(http::HeaderName::from_static(name), v);
        }
        self
    }
}
