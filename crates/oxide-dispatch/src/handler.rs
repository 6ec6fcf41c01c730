//! Route handlers: inline actions and controller class actions.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::{BoxError, Result, RouterError};
use crate::response::Response;
use crate::signature::{Arguments, Param};

/// Method invoked when a handler names only a class.
pub const DEFAULT_ACTION: &str = "invoke";

/// What a handler produced, before it is turned into a [`Response`].
pub enum Output {
    /// A finished response, returned as is.
    Response(Response),
    /// Structured data. Objects and arrays become a JSON body.
    Json(Value),
    /// A callable invoked at normalization time; its string is the body.
    Deferred(Box<dyn FnOnce() -> String + Send>),
    /// A plain text body.
    Text(String),
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Response(res) => f.debug_tuple("Response").field(&res.status).finish(),
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
        }
    }
}

/// Conversion of handler return values into an [`Output`].
pub trait IntoOutput {
    /// Converts the value. Errors surface as handler failures.
    fn into_output(self) -> std::result::Result<Output, BoxError>;
}

impl IntoOutput for Output {
    fn into_output(self) -> std::result::Result<Output, BoxError> {
        Ok(self)
    }
}

impl IntoOutput for Response {
    fn into_output(self) -> std::result::Result<Output, BoxError> {
        Ok(Output::Response(self))
    }
}

impl IntoOutput for String {
    fn into_output(self) -> std::result::Result<Output, BoxError> {
        Ok(Output::Text(self))
    }
}

impl IntoOutput for &'static str {
    fn into_output(self) -> std::result::Result<Output, BoxError> {
        Ok(Output::Text(self.to_string()))
    }
}

impl IntoOutput for Value {
    fn into_output(self) -> std::result::Result<Output, BoxError> {
        Ok(Output::Json(self))
    }
}

impl<T, E> IntoOutput for std::result::Result<T, E>
where
    T: IntoOutput,
    E: Into<BoxError>,
{
    fn into_output(self) -> std::result::Result<Output, BoxError> {
        self.map_err(Into::into).and_then(IntoOutput::into_output)
    }
}

type ActionFn = dyn Fn(Arguments) -> BoxFuture<'static, std::result::Result<Output, BoxError>>
    + Send
    + Sync;

/// A callable handler with its declared parameters.
#[derive(Clone)]
pub struct Action {
    name: Option<String>,
    params: Vec<Param>,
    func: Arc<ActionFn>,
}

impl Action {
    /// Creates an action from an async function.
    ///
    /// ```
    /// use oxide_dispatch::{Action, Param};
    ///
    /// let show = Action::new(vec![Param::int("id")], |args| async move {
    ///     format!("post {}", args.text("id").unwrap_or_default())
    /// });
    /// assert_eq!(show.params().len(), 1);
    /// ```
    pub fn new<F, Fut, R>(params: Vec<Param>, f: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoOutput,
    {
        Self {
            name: None,
            params,
            func: Arc::new(move |args| {
                let fut = f(args);
                Box::pin(async move { fut.await.into_output() })
            }),
        }
    }

    /// Creates an action from a synchronous function.
    pub fn sync<F, R>(params: Vec<Param>, f: F) -> Self
    where
        F: Fn(Arguments) -> R + Send + Sync + 'static,
        R: IntoOutput,
    {
        Self {
            name: None,
            params,
            func: Arc::new(move |args| {
                let output = f(args).into_output();
                Box::pin(futures::future::ready(output))
            }),
        }
    }

    /// Names the action. Used in error messages.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The action name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared parameters.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub(crate) fn call(
        &self,
        args: Arguments,
    ) -> BoxFuture<'static, std::result::Result<Output, BoxError>> {
        (self.func)(args)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A controller class. Dispatch asks the instance for the action to run.
///
/// ```
/// use std::sync::Arc;
/// use oxide_dispatch::{Action, Controller, Param};
///
/// struct Posts;
///
/// impl Controller for Posts {
///     fn action(self: Arc<Self>, name: &str) -> Option<Action> {
///         match name {
///             "index" => Some(Action::sync(vec![], |_| "all posts")),
///             "show" => Some(Action::sync(vec![Param::int("id")], |args| {
///                 format!("post {}", args.text("id").unwrap_or_default())
///             })),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Controller: Send + Sync {
    /// Returns the action called `name`, or `None` if there is no such method.
    fn action(self: Arc<Self>, name: &str) -> Option<Action>;
}

/// A handler as given at registration.
#[derive(Debug, Clone)]
pub enum HandlerSpec {
    /// `"Class@method"`, `"Class#method"` or `"Class"`.
    Text(String),
    /// A `(class, method)` pair.
    Pair(String, String),
    /// An inline action.
    Action(Action),
}

impl HandlerSpec {
    /// The string form of the handler, used as the default route name.
    pub fn name_hint(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Pair(..) | Self::Action(_) => None,
        }
    }
}

impl From<&str> for HandlerSpec {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for HandlerSpec {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<(&str, &str)> for HandlerSpec {
    fn from((class, method): (&str, &str)) -> Self {
        Self::Pair(class.to_string(), method.to_string())
    }
}

impl From<Action> for HandlerSpec {
    fn from(value: Action) -> Self {
        Self::Action(value)
    }
}

/// A normalized handler.
#[derive(Debug, Clone)]
pub enum Handler {
    /// Called directly.
    Inline(Action),
    /// Resolved to a controller instance at dispatch.
    ClassAction { class: String, method: String },
}

impl Handler {
    /// Normalizes a handler spec.
    pub fn from_spec(spec: HandlerSpec) -> Result<Self> {
        match spec {
            HandlerSpec::Action(action) => Ok(Self::Inline(action)),
            HandlerSpec::Pair(class, method) => Self::class_action(&class, &method),
            HandlerSpec::Text(text) => {
                let text = text.trim();
                match text.split_once('@').or_else(|| text.split_once('#')) {
                    Some((class, method)) => Self::class_action(class, method),
                    None => Self::class_action(text, DEFAULT_ACTION),
                }
            }
        }
    }

    fn class_action(class: &str, method: &str) -> Result<Self> {
        let class = class.trim();
        let method = method.trim();
        if class.is_empty() || method.is_empty() {
            return Err(RouterError::config("callback argument must not be empty"));
        }
        Ok(Self::ClassAction {
            class: class.to_string(),
            method: method.to_string(),
        })
    }
}
