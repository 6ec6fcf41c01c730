//! Route policies: boolean gates evaluated before dispatch.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::classes::ClassRegistry;
use crate::error::{BoxError, Result, RouterError};
use crate::handler::DEFAULT_ACTION;
use crate::resolver::{resolve_arguments, Bindings};
use crate::signature::{Arguments, Param};

/// Coercion of a policy result to allow or deny.
pub trait Verdict {
    /// Converts the result. Errors fail the policy evaluation.
    fn into_verdict(self) -> std::result::Result<bool, BoxError>;
}

impl Verdict for bool {
    fn into_verdict(self) -> std::result::Result<bool, BoxError> {
        Ok(self)
    }
}

impl<T: Verdict> Verdict for Option<T> {
    fn into_verdict(self) -> std::result::Result<bool, BoxError> {
        self.map_or(Ok(false), Verdict::into_verdict)
    }
}

impl Verdict for &str {
    fn into_verdict(self) -> std::result::Result<bool, BoxError> {
        Ok(!self.is_empty() && self != "0")
    }
}

impl Verdict for String {
    fn into_verdict(self) -> std::result::Result<bool, BoxError> {
        self.as_str().into_verdict()
    }
}

impl Verdict for Value {
    fn into_verdict(self) -> std::result::Result<bool, BoxError> {
        Ok(match self {
            Self::Null => false,
            Self::Bool(b) => b,
            Self::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Self::String(s) => return s.into_verdict(),
            Self::Array(items) => !items.is_empty(),
            Self::Object(_) => true,
        })
    }
}

impl<T, E> Verdict for std::result::Result<T, E>
where
    T: Verdict,
    E: Into<BoxError>,
{
    fn into_verdict(self) -> std::result::Result<bool, BoxError> {
        self.map_err(Into::into).and_then(Verdict::into_verdict)
    }
}

type PredicateFn = dyn Fn(&Arguments) -> std::result::Result<bool, BoxError> + Send + Sync;

/// A policy callable with its declared parameters.
#[derive(Clone)]
pub struct Predicate {
    params: Vec<Param>,
    func: Arc<PredicateFn>,
}

impl Predicate {
    /// Creates a predicate.
    ///
    /// ```
    /// use oxide_dispatch::{Param, Predicate};
    ///
    /// let owner = Predicate::new(vec![Param::int("user")], |args| {
    ///     args.parse::<u32>("user") == Some(1)
    /// });
    /// assert_eq!(owner.params().len(), 1);
    /// ```
    pub fn new<F, V>(params: Vec<Param>, f: F) -> Self
    where
        F: Fn(&Arguments) -> V + Send + Sync + 'static,
        V: Verdict,
    {
        Self {
            params,
            func: Arc::new(move |args| f(args).into_verdict()),
        }
    }

    /// Declared parameters.
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    fn call(&self, args: &Arguments) -> std::result::Result<bool, BoxError> {
        (self.func)(args)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// A policy class. `check` returns the predicate implementing `method`.
pub trait Policy: Send + Sync {
    /// The predicate called `method`, or `None` if there is no such method.
    fn check(self: Arc<Self>, method: &str) -> Option<Predicate>;
}

/// The policy attached to a route.
#[derive(Debug, Clone)]
pub enum RoutePolicy {
    /// A fixed answer.
    Literal(bool),
    /// An inline predicate.
    Predicate(Predicate),
    /// A method of a registered policy class.
    BoundMethod { class: String, method: String },
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::Literal(true)
    }
}

impl From<bool> for RoutePolicy {
    fn from(value: bool) -> Self {
        Self::Literal(value)
    }
}

impl From<Predicate> for RoutePolicy {
    fn from(value: Predicate) -> Self {
        Self::Predicate(value)
    }
}

impl From<&str> for RoutePolicy {
    fn from(class: &str) -> Self {
        Self::BoundMethod {
            class: class.to_string(),
            method: DEFAULT_ACTION.to_string(),
        }
    }
}

impl From<(&str, &str)> for RoutePolicy {
    fn from((class, method): (&str, &str)) -> Self {
        Self::BoundMethod {
            class: class.to_string(),
            method: method.to_string(),
        }
    }
}

impl RoutePolicy {
    /// Rejects class policies whose class is not registered.
    pub fn validate(&self, classes: &ClassRegistry) -> Result<()> {
        match self {
            Self::BoundMethod { class, .. } if !classes.has_policy(class) => Err(
                RouterError::config(format!("policy class \"{class}\" is not registered")),
            ),
            _ => Ok(()),
        }
    }

    /// Evaluates the policy for `route`. Failures are wrapped in
    /// [`RouterError::Policy`].
    pub fn evaluate(&self, route: &str, bindings: &Bindings<'_>) -> Result<bool> {
        let allowed = self.evaluate_inner(route, bindings).map_err(|source| {
            debug!(route, error = %source, "policy evaluation failed");
            RouterError::Policy {
                route: route.to_string(),
                source: Box::new(source),
            }
        })?;
        if !allowed {
            debug!(route, "policy denied");
        }
        Ok(allowed)
    }

    fn evaluate_inner(&self, route: &str, bindings: &Bindings<'_>) -> Result<bool> {
        let (predicate, target) = match self {
            Self::Literal(allowed) => return Ok(*allowed),
            Self::Predicate(predicate) => (predicate.clone(), format!("policy of route {route}")),
            Self::BoundMethod { class, method } => {
                let instance = bindings.env.policy(class)?;
                let predicate = instance.check(method).ok_or_else(|| {
                    RouterError::TargetNotFound(format!(
                        "the method \"{method}\" does not exist on policy \"{class}\""
                    ))
                })?;
                (predicate, format!("{class}::{method}"))
            }
        };
        let args = resolve_arguments(predicate.params(), &target, bindings)?;
        predicate.call(&args).map_err(RouterError::Handler)
    }
}
