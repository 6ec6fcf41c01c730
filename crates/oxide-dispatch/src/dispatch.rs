//! Per-request dispatch of a matched route.
//!
//! Dispatch runs strictly in order, stopping at the first failure:
//!
//! 1. bind the matched attributes and the route onto the request
//! 2. evaluate the route policy
//! 3. run the middleware pipeline; a redirect response ends the dispatch
//! 4. resolve the target, instantiating controller classes
//! 5. bind the target's parameters
//! 6. invoke the target and normalize its output into a response

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, trace};

use crate::container::Environment;
use crate::error::{Result, RouterError};
use crate::handler::{Action, Handler, Output};
use crate::middleware::Next;
use crate::request::{Attributes, Request};
use crate::resolver::{resolve_arguments, Bindings};
use crate::response::{Body, Response};
use crate::route::Route;

/// State of one dispatch.
pub(crate) struct RouteContext {
    route: Arc<Route>,
    attributes: Attributes,
    env: Environment,
    request: Request,
}

impl RouteContext {
    /// Binds `request` to the matched route.
    pub(crate) fn bind(
        route: Arc<Route>,
        attributes: Attributes,
        env: Environment,
        mut request: Request,
    ) -> Self {
        request.bind_route(Arc::clone(&route), &attributes);
        Self {
            route,
            attributes,
            env,
            request,
        }
    }

    fn bindings(&self) -> Bindings<'_> {
        Bindings::new(&self.request, &self.attributes, &self.env)
    }

    pub(crate) async fn dispatch(self) -> Result<Response> {
        let name = self.route.name();
        if !self.route.policy().evaluate(name, &self.bindings())? {
            return Err(RouterError::Unauthorized {
                route: name.to_string(),
            });
        }

        if !self.route.middlewares().is_empty() {
            let response = Next::new(Arc::clone(&self.route), self.env.clone())
                .run(self.request.clone())
                .await?;
            if self.env.is_redirect(response.status) {
                debug!(route = name, status = response.status, "middleware redirected");
                return Ok(response);
            }
        }

        let (action, target) = self.target()?;
        let args = resolve_arguments(action.params(), &target, &self.bindings())?;
        trace!(route = name, target = %target, "invoking");
        let output = action.call(args).await.map_err(RouterError::Handler)?;
        self.normalize(output)
    }

    /// The action to invoke, with its label for error messages.
    fn target(&self) -> Result<(Action, String)> {
        match self.route.handler() {
            Handler::Inline(action) => {
                let label = action.name().map_or_else(
                    || format!("handler of route {}", self.route.name()),
                    str::to_string,
                );
                Ok((action.clone(), label))
            }
            Handler::ClassAction { class, method } => {
                let class = match self.route.controller_namespace() {
                    Some(namespace) => format!("{namespace}::{class}"),
                    None => class.clone(),
                };
                let controller = self.env.controller(&class)?;
                trace!(class = %class, method = %method, "controller resolved");
                let action = controller.action(method).ok_or_else(|| {
                    RouterError::TargetNotFound(format!(
                        "the method \"{method}\" does not exist in class \"{class}\""
                    ))
                })?;
                Ok((action, format!("{class}::{method}")))
            }
        }
    }

    fn normalize(&self, output: Output) -> Result<Response> {
        let body = match output {
            Output::Response(response) => return Ok(response),
            Output::Json(value @ (Value::Object(_) | Value::Array(_))) => {
                let bytes = serde_json::to_vec(&value)
                    .map_err(|e| RouterError::Handler(Box::new(e)))?;
                Body::Json(bytes)
            }
            Output::Json(Value::String(text)) | Output::Text(text) => Body::Text(text),
            Output::Json(value) => Body::Text(value.to_string()),
            Output::Deferred(render) => Body::Text(render()),
        };
        Ok(self.route.respond(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::Param;

    async fn dispatch(action: Action, path: &str, url: &str) -> Result<Response> {
        let route = Arc::new(Route::new(path, action, None)?);
        let attributes = route.resolve(url).unwrap_or_default();
        RouteContext::bind(route, attributes, Environment::new(), Request::get(url))
            .dispatch()
            .await
    }

    #[tokio::test]
    async fn test_normalize_outputs() {
        let res = dispatch(Action::sync(vec![], |_| serde_json::json!({"a": 1})), "/", "/")
            .await
            .unwrap();
        assert_eq!(res.headers.get("Content-Type").map(String::as_str), Some("application/json"));
        assert_eq!(res.body_string().as_deref(), Some(r#"{"a":1}"#));

        let res = dispatch(Action::sync(vec![], |_| Value::from(42)), "/", "/").await.unwrap();
        assert_eq!(res.body_string().as_deref(), Some("42"));

        let res = dispatch(Action::sync(vec![], |_| Value::from("plain")), "/", "/").await.unwrap();
        assert_eq!(res.body_string().as_deref(), Some("plain"));

        let res = dispatch(
            Action::sync(vec![], |_| Output::Deferred(Box::new(|| "later".to_string()))),
            "/",
            "/",
        )
        .await
        .unwrap();
        assert_eq!(res.body_string().as_deref(), Some("later"));

        let res = dispatch(Action::sync(vec![], |_| Response::new(204)), "/", "/").await.unwrap();
        assert_eq!(res.status, 204);
    }

    #[tokio::test]
    async fn test_route_is_bound_on_request() {
        let action = Action::sync(vec![Param::request("req")], |args| {
            let req = args.request().unwrap();
            format!(
                "{}:{}",
                req.route().map_or("", |r| r.name()),
                req.attribute("id").unwrap_or_default()
            )
        });
        let res = dispatch(action, "/posts/:id", "/posts/9").await.unwrap();
        assert_eq!(res.body_string().as_deref(), Some("/posts/:id:9"));
    }

    #[tokio::test]
    async fn test_handler_error() {
        let action = Action::sync(vec![], |_| Err::<String, _>("boom")).named("explode");
        let err = dispatch(action, "/", "/").await.unwrap_err();
        assert_eq!(err.to_string(), "handler failed: boom");
    }

    #[tokio::test]
    async fn test_unknown_controller() {
        let err = dispatch_class("Missing@show").await.unwrap_err();
        assert!(matches!(err, RouterError::TargetNotFound(_)));
    }

    async fn dispatch_class(handler: &str) -> Result<Response> {
        let route = Arc::new(Route::new("/", handler, None)?.in_namespace("App"));
        RouteContext::bind(route, Attributes::new(), Environment::new(), Request::get("/"))
            .dispatch()
            .await
    }
}
