//! Route definitions and matched routes.

use std::fmt;
use std::sync::Arc;

use crate::container::Environment;
use crate::dispatch::RouteContext;
use crate::error::{Result, RouterError};
use crate::handler::{Handler, HandlerSpec};
use crate::middleware::MiddlewareEntry;
use crate::path::PathTemplate;
use crate::policy::RoutePolicy;
use crate::request::{Attributes, Request};
use crate::resolver::Bindings;
use crate::response::{default_response_factory, Body, Response, ResponseFactory};

/// A single route definition.
///
/// A route is immutable once registered. Matching returns a [`RouteMatch`]
/// that carries the per-dispatch state, so one route can serve concurrent
/// requests.
#[derive(Clone)]
pub struct Route {
    name: String,
    template: PathTemplate,
    handler: Handler,
    middlewares: Vec<MiddlewareEntry>,
    policy: RoutePolicy,
    controller_namespace: Option<String>,
    response_factory: ResponseFactory,
}

impl Route {
    /// Creates a new route.
    ///
    /// Without an explicit name the route is named after a string handler,
    /// or after its path.
    pub fn new(path: &str, handler: impl Into<HandlerSpec>, name: Option<&str>) -> Result<Self> {
        let spec = handler.into();
        let name = name
            .or_else(|| spec.name_hint())
            .unwrap_or(path)
            .to_string();
        Ok(Self {
            name,
            template: PathTemplate::new(path)?,
            handler: Handler::from_spec(spec)?,
            middlewares: Vec::new(),
            policy: RoutePolicy::default(),
            controller_namespace: None,
            response_factory: default_response_factory(),
        })
    }

    /// Binds the parameter `name` to `regex`.
    pub fn with(mut self, name: &str, regex: &str) -> Result<Self> {
        self.template = self.template.with(name, regex)?;
        Ok(self)
    }

    /// Sets the policy.
    #[must_use]
    pub fn guarded_by(mut self, policy: impl Into<RoutePolicy>) -> Self {
        self.policy = policy.into();
        self
    }

    /// Appends middleware, skipping entries already attached.
    #[must_use]
    pub fn through<I, M>(mut self, middlewares: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareEntry>,
    {
        for entry in middlewares {
            let entry = entry.into();
            if !self.middlewares.contains(&entry) {
                self.middlewares.push(entry);
            }
        }
        self
    }

    /// Sets the namespace class handlers are qualified with.
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.controller_namespace = Some(namespace.into());
        self
    }

    /// Sets the response factory.
    #[must_use]
    pub fn respond_with(mut self, factory: ResponseFactory) -> Self {
        self.response_factory = factory;
        self
    }

    /// The explicit or default route name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The path template with surrounding slashes trimmed.
    pub fn path(&self) -> &str {
        self.template.template()
    }

    /// The compiled path template.
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    /// The normalized handler.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// The policy checked before dispatch.
    pub fn policy(&self) -> &RoutePolicy {
        &self.policy
    }

    /// Attached middleware, in execution order.
    pub fn middlewares(&self) -> &[MiddlewareEntry] {
        &self.middlewares
    }

    /// The namespace class handlers are qualified with.
    pub fn controller_namespace(&self) -> Option<&str> {
        self.controller_namespace.as_deref()
    }

    pub(crate) fn respond(&self, body: Body) -> Response {
        (self.response_factory)(body)
    }

    /// Matches `url` against the template.
    pub fn resolve(&self, url: &str) -> Option<Attributes> {
        self.template.match_path(url)
    }

    /// Generates the path of this route.
    pub fn generate_uri<I, K, V>(&self, params: I, fragment: Option<&str>) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.template.generate(params, fragment)
    }

    /// Matches the request path and dispatches the request.
    pub async fn run(self: Arc<Self>, request: Request, env: &Environment) -> Result<Response> {
        let attributes = self.resolve(&request.path).ok_or_else(|| RouterError::NoMatch {
            method: request.method.to_string(),
            path: request.path.clone(),
        })?;
        RouteMatch::new(self, attributes, env.clone()).run(request).await
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("path", &self.template.template())
            .field("handler", &self.handler)
            .field("middlewares", &self.middlewares)
            .field("policy", &self.policy)
            .field("controller_namespace", &self.controller_namespace)
            .finish_non_exhaustive()
    }
}

/// A route that matched a path, with the extracted attributes.
#[derive(Clone)]
pub struct RouteMatch {
    route: Arc<Route>,
    attributes: Attributes,
    env: Environment,
}

impl RouteMatch {
    pub(crate) const fn new(route: Arc<Route>, attributes: Attributes, env: Environment) -> Self {
        Self {
            route,
            attributes,
            env,
        }
    }

    /// The matched route.
    pub fn route(&self) -> &Arc<Route> {
        &self.route
    }

    /// Attributes extracted from the path, in template order.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// A single path attribute by name.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)
    }

    /// Evaluates the route policy against `request`.
    pub fn authorize(&self, request: &Request) -> Result<bool> {
        let mut request = request.clone();
        request.bind_route(Arc::clone(&self.route), &self.attributes);
        self.route.policy().evaluate(
            self.route.name(),
            &Bindings::new(&request, &self.attributes, &self.env),
        )
    }

    /// Dispatches `request` to the route.
    pub async fn run(self, request: Request) -> Result<Response> {
        RouteContext::bind(self.route, self.attributes, self.env, request)
            .dispatch()
            .await
    }
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("route", &self.route.name())
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}
