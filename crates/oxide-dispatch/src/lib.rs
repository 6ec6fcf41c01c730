//! # oxide-dispatch
//!
//! Route matching and dispatch with policies, middleware and parameter
//! binding.
//!
//! This crate provides:
//! - Path templates with `:name` and `{name:regex}` parameters
//! - HTTP method-based routing, first registered route wins
//! - Route policies evaluated before dispatch
//! - Middleware pipelines scoped by groups
//! - Handler parameters bound from the request, the path, defaults and a
//!   dependency container
//! - Named routes for reverse URL generation
//!
//! ## Quick Start
//!
//! ```ignore
//! use oxide_dispatch::{Action, Param, Register, Request, Router};
//!
//! let mut router = Router::new();
//! router.get("/", Action::sync(vec![], |_| "Hello, World!"), Some("home"))?;
//! router.get(
//!     "/users/:id",
//!     Action::new(vec![Param::int("id")], |args| async move {
//!         format!("User: {}", args.text("id").unwrap_or_default())
//!     }),
//!     Some("user.show"),
//! )?;
//!
//! let response = router.run(Request::get("/users/123")).await?;
//! assert_eq!(response.body_string().as_deref(), Some("User: 123"));
//! ```
//!
//! ## Path Parameters
//!
//! `:name` matches one or more non-slash characters. `{name:regex}` binds
//! an inline regex, and `with` rebinds a parameter after registration:
//!
//! ```ignore
//! router.get(r"/post/{id:\d+}-{slug:[a-z]+}", "Posts@show", Some("post.show"))?;
//! router.get("/users/:id", "Users@show", None)?.with("id", r"\d+")?;
//! ```
//!
//! ## Controllers
//!
//! String handlers name a controller class and a method: `Posts@show`,
//! `Posts#show`, `("Posts", "show")`, or `Posts` alone for the
//! [`DEFAULT_ACTION`]. Classes are registered by name:
//!
//! ```ignore
//! router.classes_mut().controller("App::Posts", || Posts);
//! router.set_controller_namespace("App")?;
//! ```
//!
//! ## Policies
//!
//! ```ignore
//! router
//!     .get("/admin", "Admin@index", None)?
//!     .policy(Predicate::new(vec![Param::request("req")], |args| {
//!         args.request().and_then(|r| r.get_header("Authorization")).is_some()
//!     }))?;
//! ```
//!
//! ## Groups and Middleware
//!
//! ```ignore
//! router.group("/admin", |admin| {
//!     admin.middleware("auth", |secured| {
//!         secured.get("/posts", "Admin::Posts@index", Some("admin.posts"))?;
//!         Ok(())
//!     })?;
//!     Ok(())
//! })?;
//! ```
//!
//! ## Named Routes
//!
//! ```ignore
//! let url = router.generate_uri("post.show", [("id", "1"), ("slug", "hello")], None)?;
//! assert_eq!(url, "/post/1-hello");
//! ```

mod classes;
mod config;
mod container;
mod dispatch;
mod error;
mod handler;
mod middleware;
mod path;
mod policy;
mod request;
mod resolver;
mod response;
mod route;
mod router;
mod signature;

pub use classes::{Class, ClassRegistry};
pub use config::RouterConfig;
pub use container::{object, type_key, Container, Environment, Service};
pub use error::{BoxError, Result, RouterError, UriError};
pub use handler::{Action, Controller, Handler, HandlerSpec, IntoOutput, Output, DEFAULT_ACTION};
pub use middleware::{FnMiddleware, Middleware, MiddlewareEntry, Next};
pub use path::{Binding, PathTemplate, DEFAULT_PARAM_REGEX};
pub use policy::{Policy, Predicate, RoutePolicy, Verdict};
pub use request::{Attribute, Attributes, Method, Request, ROUTE_ATTRIBUTE};
pub use resolver::{resolve_arguments, Bindings};
pub use response::{default_response_factory, Body, Response, ResponseFactory, REDIRECT_STATUSES};
pub use route::{Route, RouteMatch};
pub use router::{DefaultRouteFactory, Group, Register, RouteFactory, RouteHandle, Router, Scope};
pub use signature::{Argument, Arguments, Param, ParamType};
