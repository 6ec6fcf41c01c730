#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use oxide_dispatch::{
    object, type_key, Action, BoxError, Container, Controller, Middleware, Next, Param, Policy,
    Predicate, Request, Response, Result, Router, Service,
};
use serde_json::json;

/// Container backed by a map.
#[derive(Default)]
pub struct MapContainer {
    services: HashMap<String, Service>,
}

impl MapContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`.
    pub fn set<T: Send + Sync + 'static>(mut self, key: &str, value: T) -> Self {
        self.services.insert(key.to_string(), Arc::new(value));
        self
    }

    /// Stores `value` under its type key.
    pub fn provide<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.set(type_key::<T>(), value)
    }

    /// Stores a controller instance under its class name.
    pub fn controller(mut self, class: &str, controller: Arc<dyn Controller>) -> Self {
        self.services.insert(class.to_string(), object(controller));
        self
    }

    /// Stores a policy instance under its class name.
    pub fn policy(mut self, class: &str, policy: Arc<dyn Policy>) -> Self {
        self.services.insert(class.to_string(), object(policy));
        self
    }

    /// Stores a middleware instance under its class name.
    pub fn middleware(mut self, class: &str, middleware: Arc<dyn Middleware>) -> Self {
        self.services.insert(class.to_string(), object(middleware));
        self
    }
}

impl Container for MapContainer {
    fn has(&self, key: &str) -> bool {
        self.services.contains_key(key)
    }

    fn get(&self, key: &str) -> std::result::Result<Service, BoxError> {
        self.services
            .get(key)
            .cloned()
            .ok_or_else(|| format!("no entry for {key}").into())
    }
}

/// Service resolved by type in controller actions.
pub struct SimpleInvoke;

impl SimpleInvoke {
    pub const NAME: &'static str = "SimpleInvoke";
}

/// `action` echoes the `slug` attribute, `call` needs a container service.
pub struct ActionSeparator;

impl Controller for ActionSeparator {
    fn action(self: Arc<Self>, name: &str) -> Option<Action> {
        match name {
            "action" => Some(Action::sync(vec![Param::string("slug")], |args| {
                args.text("slug").unwrap_or_default()
            })),
            "call" => Some(Action::sync(
                vec![Param::request("request"), Param::service::<SimpleInvoke>("simple_invoke")],
                |args| {
                    args.service::<SimpleInvoke>("simple_invoke")
                        .map(|_| SimpleInvoke::NAME)
                        .ok_or("service missing")
                },
            )),
            _ => None,
        }
    }
}

/// Answers with `[id, slug, route name]`.
pub struct ParamsInvoke;

impl Controller for ParamsInvoke {
    fn action(self: Arc<Self>, name: &str) -> Option<Action> {
        (name == "invoke").then(|| {
            Action::sync(
                vec![Param::request("request"), Param::int("id"), Param::string("slug")],
                |args| {
                    let route = args
                        .request()
                        .and_then(Request::route)
                        .map(|r| r.name().to_string());
                    json!([args.parse::<i64>("id"), args.text("slug"), route])
                },
            )
        })
    }
}

/// Answers with the name of the dispatching route.
pub struct RequestInvoke;

impl Controller for RequestInvoke {
    fn action(self: Arc<Self>, name: &str) -> Option<Action> {
        (name == "invoke").then(|| {
            Action::new(vec![Param::request("req")], |args| async move {
                args.request()
                    .and_then(Request::route)
                    .map(|r| r.name().to_string())
                    .unwrap_or_default()
            })
        })
    }
}

/// Built by the container only.
pub struct ResolvableController {
    pub message: String,
}

impl Controller for ResolvableController {
    fn action(self: Arc<Self>, name: &str) -> Option<Action> {
        match name {
            "invoke" => {
                let message = self.message.clone();
                Some(Action::sync(vec![], move |_| message.clone()))
            }
            "call" => Some(Action::sync(vec![Param::string("class_name")], |args| {
                args.service::<String>("class_name")
                    .map(|s| s.as_str().to_string())
                    .unwrap_or_default()
            })),
            _ => None,
        }
    }
}

/// Allows requests carrying a query string. `check` always allows.
pub struct InvokePolicy;

impl Policy for InvokePolicy {
    fn check(self: Arc<Self>, method: &str) -> Option<Predicate> {
        match method {
            "invoke" => Some(Predicate::new(vec![Param::request("request")], |args| {
                args.request().map(|r| r.query_string.clone())
            })),
            "check" => Some(Predicate::new(vec![], |_| true)),
            _ => None,
        }
    }
}

/// Ends every dispatch with a permanent redirect.
pub struct RedirectResponseMiddleware;

impl Middleware for RedirectResponseMiddleware {
    fn process<'a>(&'a self, _request: Request, _next: Next) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async { Ok(Response::redirect_permanent("/moved")) })
    }
}

/// Passes every request on.
pub struct InvokeRouteMiddleware;

impl Middleware for InvokeRouteMiddleware {
    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Result<Response>> {
        next.run(request)
    }
}

/// Passes every request on, like [`InvokeRouteMiddleware`].
pub struct InvokeRouteMiddleware2;

impl Middleware for InvokeRouteMiddleware2 {
    fn process<'a>(&'a self, request: Request, next: Next) -> BoxFuture<'a, Result<Response>> {
        next.run(request)
    }
}

pub const ACTION_SEPARATOR: &str = "Tests::ActionSeparator";
pub const PARAMS_INVOKE: &str = "Tests::ParamsInvoke";
pub const REQUEST_INVOKE: &str = "Tests::RequestInvoke";
pub const RESOLVABLE: &str = "Tests::ResolvableController";
pub const INVOKE_POLICY: &str = "Tests::InvokePolicy";
pub const REDIRECT: &str = "Tests::RedirectResponseMiddleware";
pub const PASS: &str = "Tests::InvokeRouteMiddleware";
pub const PASS2: &str = "Tests::InvokeRouteMiddleware2";

/// A router knowing every fixture class.
pub fn router() -> Router {
    let mut router = Router::new();
    router
        .classes_mut()
        .controller(ACTION_SEPARATOR, || ActionSeparator)
        .controller(PARAMS_INVOKE, || ParamsInvoke)
        .controller(REQUEST_INVOKE, || RequestInvoke)
        .injected_controller(RESOLVABLE)
        .policy(INVOKE_POLICY, || InvokePolicy)
        .middleware(REDIRECT, || RedirectResponseMiddleware)
        .middleware(PASS, || InvokeRouteMiddleware)
        .middleware(PASS2, || InvokeRouteMiddleware2);
    router
}

/// Returns the request path.
pub fn echo_path() -> Action {
    Action::sync(vec![Param::request("request")], |args| {
        args.request().map(|r| r.path.clone()).unwrap_or_default()
    })
}

pub fn text(res: &Response) -> String {
    res.body_string().unwrap_or_default()
}
