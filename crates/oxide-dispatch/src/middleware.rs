//! Middleware support for request processing.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::trace;

use crate::container::Environment;
use crate::error::Result;
use crate::request::Request;
use crate::response::{Body, Response};
use crate::route::Route;

/// Trait for middleware wrapping a route's target.
///
/// Middleware can:
/// - Inspect or modify the request before passing it on
/// - Short-circuit with its own response, e.g. a redirect
/// - Inspect the response returned by the rest of the pipeline
///
/// # Example
///
/// ```
/// use futures::future::BoxFuture;
/// use oxide_dispatch::{Middleware, Next, Request, Response, Result};
///
/// struct RequireLogin;
///
/// impl Middleware for RequireLogin {
///     fn process<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a, Result<Response>> {
///         Box::pin(async move {
///             if req.get_header("Authorization").is_none() {
///                 return Ok(Response::redirect("/login"));
///             }
///             next.run(req).await
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// Processes the request. Call `next.run(request)` to continue.
    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Result<Response>>;
}

/// Middleware backed by a closure.
pub struct FnMiddleware<F>(F);

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response>> + Send + 'static,
{
    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Result<Response>> {
        Box::pin((self.0)(request, next))
    }
}

/// A middleware as attached to a route or scope.
#[derive(Clone)]
pub enum MiddlewareEntry {
    /// A middleware class registered by name.
    Named(String),
    /// A middleware instance.
    Inline(Arc<dyn Middleware>),
}

impl MiddlewareEntry {
    /// Wraps a middleware instance.
    pub fn inline(middleware: impl Middleware + 'static) -> Self {
        Self::Inline(Arc::new(middleware))
    }

    /// Wraps a closure.
    ///
    /// ```
    /// use oxide_dispatch::MiddlewareEntry;
    ///
    /// let passthrough = MiddlewareEntry::from_fn(|req, next| next.run(req));
    /// ```
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response>> + Send + 'static,
    {
        Self::inline(FnMiddleware(f))
    }
}

impl PartialEq for MiddlewareEntry {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Named(a), Self::Named(b)) => a == b,
            (Self::Inline(a), Self::Inline(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Debug for MiddlewareEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Inline(_) => f.write_str("Inline(..)"),
        }
    }
}

impl From<&str> for MiddlewareEntry {
    fn from(value: &str) -> Self {
        Self::Named(value.to_string())
    }
}

impl From<String> for MiddlewareEntry {
    fn from(value: String) -> Self {
        Self::Named(value)
    }
}

/// The rest of the pipeline, handed to each middleware.
pub struct Next {
    route: Arc<Route>,
    env: Environment,
    cursor: usize,
}

impl Next {
    pub(crate) const fn new(route: Arc<Route>, env: Environment) -> Self {
        Self {
            route,
            env,
            cursor: 0,
        }
    }

    /// The route being dispatched.
    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Runs the next middleware. Past the last one, returns an empty
    /// response built by the route's response factory.
    pub fn run(self, request: Request) -> BoxFuture<'static, Result<Response>> {
        Box::pin(async move {
            let Some(entry) = self.route.middlewares().get(self.cursor).cloned() else {
                trace!(route = self.route.name(), "middleware pipeline passed through");
                return Ok(self.route.respond(Body::Empty));
            };
            trace!(route = self.route.name(), cursor = self.cursor, ?entry, "middleware");
            let middleware = self.env.middleware(&entry)?;
            let next = Self {
                route: Arc::clone(&self.route),
                env: self.env.clone(),
                cursor: self.cursor + 1,
            };
            middleware.process(request, next).await
        })
    }
}
