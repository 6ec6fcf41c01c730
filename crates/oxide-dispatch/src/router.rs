//! Main router implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::debug;

use crate::classes::ClassRegistry;
use crate::config::RouterConfig;
use crate::container::{Container, Environment};
use crate::error::{Result, RouterError};
use crate::handler::HandlerSpec;
use crate::middleware::MiddlewareEntry;
use crate::policy::RoutePolicy;
use crate::request::{Method, Request};
use crate::response::{Response, ResponseFactory};
use crate::route::{Route, RouteMatch};

/// `App::Http::Controllers`
static NAMESPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(::[A-Za-z_][A-Za-z0-9_]*)*$").expect("namespace regex")
});

/// Builds the routes registered on a [`Router`].
pub trait RouteFactory: Send + Sync {
    /// Creates the route for `path`, already prefixed by the enclosing groups.
    fn create(&self, path: &str, handler: HandlerSpec, name: &str) -> Result<Route>;
}

/// Creates plain [`Route`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRouteFactory;

impl RouteFactory for DefaultRouteFactory {
    fn create(&self, path: &str, handler: HandlerSpec, name: &str) -> Result<Route> {
        Route::new(path, handler, Some(name))
    }
}

/// The prefix and middleware applied to routes registered in a group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    prefix: String,
    middlewares: Vec<MiddlewareEntry>,
}

impl Scope {
    /// The scope of routes registered inside a group with `prefix`.
    #[must_use]
    pub fn nest(&self, prefix: &str) -> Self {
        Self {
            prefix: format!("{}{prefix}", self.prefix),
            middlewares: self.middlewares.clone(),
        }
    }

    /// The scope with `entries` appended, skipping those already present.
    #[must_use]
    pub fn with_middlewares(&self, entries: impl IntoIterator<Item = MiddlewareEntry>) -> Self {
        let mut middlewares = self.middlewares.clone();
        for entry in entries {
            if !middlewares.contains(&entry) {
                middlewares.push(entry);
            }
        }
        Self {
            prefix: self.prefix.clone(),
            middlewares,
        }
    }

    /// The accumulated group prefix, without surrounding slashes.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Middleware attached to every route registered in this scope.
    pub fn middlewares(&self) -> &[MiddlewareEntry] {
        &self.middlewares
    }
}

/// Route registration, shared by the [`Router`] and its [`Group`]s.
///
/// # Example
///
/// ```
/// use oxide_dispatch::{Register, Router};
///
/// let mut router = Router::new();
/// router
///     .group("/admin", |admin| {
///         admin.get("/posts", "Admin::Posts@index", Some("admin.posts"))?;
///         Ok(())
///     })
///     .unwrap();
/// assert_eq!(router.route("admin.posts").unwrap().path(), "admin/posts");
/// ```
pub trait Register {
    /// The router to register into and the scope to register with.
    fn parts(&mut self) -> (&mut Router, Scope);

    /// Adds a route for `method`.
    fn add(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Into<HandlerSpec>,
        name: Option<&str>,
    ) -> Result<RouteHandle<'_>> {
        let (router, scope) = self.parts();
        router.add_scoped(&scope, method, path, handler.into(), name)
    }

    /// Adds a GET route.
    fn get(
        &mut self,
        path: &str,
        handler: impl Into<HandlerSpec>,
        name: Option<&str>,
    ) -> Result<RouteHandle<'_>> {
        self.add(Method::Get, path, handler, name)
    }

    /// Adds a POST route.
    fn post(
        &mut self,
        path: &str,
        handler: impl Into<HandlerSpec>,
        name: Option<&str>,
    ) -> Result<RouteHandle<'_>> {
        self.add(Method::Post, path, handler, name)
    }

    /// Adds a PUT route.
    fn put(
        &mut self,
        path: &str,
        handler: impl Into<HandlerSpec>,
        name: Option<&str>,
    ) -> Result<RouteHandle<'_>> {
        self.add(Method::Put, path, handler, name)
    }

    /// Adds a PATCH route.
    fn patch(
        &mut self,
        path: &str,
        handler: impl Into<HandlerSpec>,
        name: Option<&str>,
    ) -> Result<RouteHandle<'_>> {
        self.add(Method::Patch, path, handler, name)
    }

    /// Adds a DELETE route.
    fn delete(
        &mut self,
        path: &str,
        handler: impl Into<HandlerSpec>,
        name: Option<&str>,
    ) -> Result<RouteHandle<'_>> {
        self.add(Method::Delete, path, handler, name)
    }

    /// Adds a route for a method chosen at runtime.
    fn any(
        &mut self,
        method: Method,
        path: &str,
        handler: impl Into<HandlerSpec>,
        name: Option<&str>,
    ) -> Result<RouteHandle<'_>> {
        self.add(method, path, handler, name)
    }

    /// Registers the routes added by `f` under `prefix`.
    fn group<F>(&mut self, prefix: &str, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Group<'_>) -> Result<()>,
    {
        {
            let (router, scope) = self.parts();
            f(&mut Group {
                router,
                scope: scope.nest(prefix),
            })?;
        }
        Ok(self)
    }

    /// Registers the routes added by `f` behind `middleware`.
    fn middleware<F>(&mut self, middleware: impl Into<MiddlewareEntry>, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Group<'_>) -> Result<()>,
    {
        self.middlewares([middleware.into()], f)
    }

    /// Registers the routes added by `f` behind `middlewares`.
    fn middlewares<I, F>(&mut self, middlewares: I, f: F) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<MiddlewareEntry>,
        F: FnOnce(&mut Group<'_>) -> Result<()>,
    {
        {
            let (router, scope) = self.parts();
            let entries = middlewares
                .into_iter()
                .map(Into::into)
                .collect::<Vec<MiddlewareEntry>>();
            router.check_middlewares(&entries)?;
            f(&mut Group {
                router,
                scope: scope.with_middlewares(entries),
            })?;
        }
        Ok(self)
    }
}

/// Registers routes inside a group scope.
pub struct Group<'a> {
    router: &'a mut Router,
    scope: Scope,
}

impl Group<'_> {
    /// The scope routes registered through this group inherit.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl Register for Group<'_> {
    fn parts(&mut self) -> (&mut Router, Scope) {
        (&mut *self.router, self.scope.clone())
    }
}

/// A registered route, open for configuration.
pub struct RouteHandle<'a> {
    router: &'a mut Router,
    index: usize,
}

impl RouteHandle<'_> {
    fn update(&mut self, f: impl FnOnce(Route) -> Result<Route>) -> Result<()> {
        let slot = &mut self.router.routes[self.index];
        *slot = Arc::new(f((**slot).clone())?);
        Ok(())
    }

    /// Binds the parameter `name` to `regex`.
    pub fn with(mut self, name: &str, regex: &str) -> Result<Self> {
        self.update(|route| route.with(name, regex))?;
        Ok(self)
    }

    /// Sets the route policy.
    pub fn policy(mut self, policy: impl Into<RoutePolicy>) -> Result<Self> {
        let policy = policy.into();
        policy.validate(self.router.env.classes())?;
        self.update(|route| Ok(route.guarded_by(policy)))?;
        Ok(self)
    }

    /// Appends route-level middleware.
    pub fn middlewares<I>(mut self, middlewares: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<MiddlewareEntry>,
    {
        let entries: Vec<MiddlewareEntry> = middlewares.into_iter().map(Into::into).collect();
        self.router.check_middlewares(&entries)?;
        self.update(|route| Ok(route.through(entries)))?;
        Ok(self)
    }

    /// Sets the response factory.
    pub fn respond_with(mut self, factory: ResponseFactory) -> Result<Self> {
        self.update(|route| Ok(route.respond_with(factory)))?;
        Ok(self)
    }

    /// The route as currently configured.
    pub fn route(&self) -> &Arc<Route> {
        &self.router.routes[self.index]
    }
}

/// The main router: registers routes and dispatches requests.
pub struct Router {
    routes: Vec<Arc<Route>>,
    /// Route indexes per method, in registration order.
    by_method: BTreeMap<Method, Vec<usize>>,
    /// Route indexes per name. The last registration wins.
    by_name: HashMap<String, usize>,
    controller_namespace: Option<String>,
    factory: Arc<dyn RouteFactory>,
    env: Environment,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Register for Router {
    fn parts(&mut self) -> (&mut Router, Scope) {
        (self, Scope::default())
    }
}

impl Router {
    /// Creates a new empty router.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            by_method: BTreeMap::new(),
            by_name: HashMap::new(),
            controller_namespace: None,
            factory: Arc::new(DefaultRouteFactory),
            env: Environment::new(),
        }
    }

    /// Creates a router from configuration.
    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        let mut router = Self::new();
        if let Some(namespace) = &config.controller_namespace {
            router.set_controller_namespace(namespace)?;
        }
        router.env.set_redirect_statuses(&config.redirect_statuses);
        Ok(router)
    }

    /// Sets the container used to inject dependencies.
    pub fn set_container(&mut self, container: Arc<dyn Container>) -> &mut Self {
        self.env.set_container(container);
        self
    }

    /// Controller, policy and middleware classes known to the router.
    pub fn classes_mut(&mut self) -> &mut ClassRegistry {
        self.env.classes_mut()
    }

    /// The environment shared by every dispatch.
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// Sets the namespace that class handlers of routes registered from
    /// now on are qualified with.
    pub fn set_controller_namespace(&mut self, namespace: &str) -> Result<&mut Self> {
        if !NAMESPACE.is_match(namespace) {
            return Err(RouterError::config(format!(
                "invalid controller namespace \"{namespace}\""
            )));
        }
        self.controller_namespace = Some(namespace.to_string());
        Ok(self)
    }

    /// The current controller namespace, if any.
    pub fn controller_namespace(&self) -> Option<&str> {
        self.controller_namespace.as_deref()
    }

    /// Replaces the factory used to build routes.
    pub fn set_route_factory(&mut self, factory: Arc<dyn RouteFactory>) -> &mut Self {
        self.factory = factory;
        self
    }

    fn add_scoped(
        &mut self,
        scope: &Scope,
        method: Method,
        path: &str,
        handler: HandlerSpec,
        name: Option<&str>,
    ) -> Result<RouteHandle<'_>> {
        let name = name
            .or_else(|| handler.name_hint())
            .unwrap_or(path)
            .to_string();
        let full_path = format!("{}{path}", scope.prefix());
        let mut route = self
            .factory
            .create(&full_path, handler, &name)?
            .through(scope.middlewares().iter().cloned());
        if let Some(namespace) = &self.controller_namespace {
            route = route.in_namespace(namespace.clone());
        }

        let index = self.routes.len();
        self.routes.push(Arc::new(route));
        self.by_method.entry(method).or_default().push(index);
        if let Some(previous) = self.by_name.insert(name.clone(), index) {
            debug!(name = %name, previous, index, "route name overwritten");
        }
        debug!(%method, path = %full_path, name = %name, "route registered");
        Ok(RouteHandle {
            router: self,
            index,
        })
    }

    fn check_middlewares(&self, entries: &[MiddlewareEntry]) -> Result<()> {
        for entry in entries {
            if let MiddlewareEntry::Named(name) = entry {
                if !self.env.classes().has_middleware(name) {
                    return Err(RouterError::config(format!(
                        "middleware \"{name}\" is not registered"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Gets a route by name.
    pub fn route(&self, name: &str) -> Option<&Arc<Route>> {
        self.by_name.get(name).map(|&index| &self.routes[index])
    }

    /// All routes grouped by method, in registration order.
    pub fn routes(&self) -> BTreeMap<Method, Vec<&Arc<Route>>> {
        self.by_method
            .iter()
            .map(|(method, indexes)| (*method, indexes.iter().map(|&i| &self.routes[i]).collect()))
            .collect()
    }

    /// Routes registered for `method`, in registration order.
    pub fn routes_for(&self, method: Method) -> impl Iterator<Item = &Arc<Route>> {
        self.by_method
            .get(&method)
            .into_iter()
            .flatten()
            .map(|&index| &self.routes[index])
    }

    /// Generates the path of the route called `name`.
    pub fn generate_uri<I, K, V>(
        &self,
        name: &str,
        params: I,
        fragment: Option<&str>,
    ) -> Result<String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.route(name)
            .ok_or_else(|| RouterError::MissingRoute(name.to_string()))?
            .generate_uri(params, fragment)
    }

    /// Finds the route for `request` and checks its policy.
    ///
    /// With `throw_on_failure` unset, no match and a denied policy yield
    /// `Ok(None)`. Other errors are always returned.
    pub fn resolve(&self, request: &Request, throw_on_failure: bool) -> Result<Option<RouteMatch>> {
        let found = self.find(request).and_then(|matched| {
            if matched.authorize(request)? {
                Ok(matched)
            } else {
                Err(RouterError::Unauthorized {
                    route: matched.route().name().to_string(),
                })
            }
        });
        match found {
            Ok(matched) => Ok(Some(matched)),
            Err(err) if !throw_on_failure && err.is_soft() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Dispatches `request` to the first matching route.
    pub async fn run(&self, request: Request) -> Result<Response> {
        self.find(&request)?.run(request).await
    }

    fn find(&self, request: &Request) -> Result<RouteMatch> {
        for route in self.routes_for(request.method) {
            if let Some(attributes) = route.resolve(&request.path) {
                debug!(
                    method = %request.method,
                    path = %request.path,
                    route = route.name(),
                    "route matched"
                );
                return Ok(RouteMatch::new(Arc::clone(route), attributes, self.env.clone()));
            }
        }
        debug!(method = %request.method, path = %request.path, "no route matched");
        Err(RouterError::NoMatch {
            method: request.method.to_string(),
            path: request.path.clone(),
        })
    }
}
