//! HTTP response type.

use std::collections::HashMap;
use std::sync::Arc;

/// Status codes treated as redirects by default.
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// A normalized handler result, handed to a [`ResponseFactory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Plain text.
    Text(String),
    /// Encoded JSON.
    Json(Vec<u8>),
    /// No content, e.g. the end of the middleware pipeline.
    Empty,
}

/// Builds the response for a route from a normalized body.
pub type ResponseFactory = Arc<dyn Fn(Body) -> Response + Send + Sync>;

/// The factory used unless a route sets its own.
pub fn default_response_factory() -> ResponseFactory {
    Arc::new(Response::from_body)
}

/// An HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a new response with the given status.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Creates an empty 200 OK response.
    pub fn ok() -> Self {
        Self::new(200)
    }

    /// Creates a response with plain text content.
    pub fn text(body: impl Into<String>) -> Self {
        Self::ok()
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body.into())
    }

    /// Creates a response from an already encoded JSON body.
    pub fn json_bytes(body: Vec<u8>) -> Self {
        Self::ok()
            .header("Content-Type", "application/json")
            .body(body)
    }

    /// Creates a 200 response for a normalized body.
    pub fn from_body(body: Body) -> Self {
        match body {
            Body::Text(text) => Self::text(text),
            Body::Json(bytes) => Self::json_bytes(bytes),
            Body::Empty => Self::ok(),
        }
    }

    /// Creates a redirect response.
    pub fn redirect(url: impl Into<String>) -> Self {
        Self::new(302).header("Location", url)
    }

    /// Creates a permanent redirect response.
    pub fn redirect_permanent(url: impl Into<String>) -> Self {
        Self::new(301).header("Location", url)
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the status code.
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the body as a string.
    pub fn body_string(&self) -> Option<String> {
        String::from_utf8(self.body.clone()).ok()
    }

    /// Whether the status is one of [`REDIRECT_STATUSES`].
    pub fn is_redirect(&self) -> bool {
        REDIRECT_STATUSES.contains(&self.status)
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}
