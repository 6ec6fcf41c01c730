//! Handler signatures and bound arguments.
//!
//! Handlers declare their parameters up front. At dispatch each declared
//! [`Param`] is bound to an [`Argument`] by the parameter resolver, and
//! the handler receives them as [`Arguments`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::container::{type_key, Service};
use crate::request::Request;

/// Declared type of a handler parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// The live request.
    Request,
    /// A scalar such as `string` or `int`. Resolved by parameter name.
    Scalar(String),
    /// A service type. Resolved by its type key.
    Service(String),
}

/// A declared handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    name: String,
    ty: Option<ParamType>,
    default: Option<Value>,
}

impl Param {
    /// A parameter of any declared type.
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
            default: None,
        }
    }

    /// A parameter receiving the live request.
    pub fn request(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Request)
    }

    /// A `string` scalar parameter.
    pub fn string(name: impl Into<String>) -> Self {
        Self::scalar(name, "string")
    }

    /// An `int` scalar parameter.
    pub fn int(name: impl Into<String>) -> Self {
        Self::scalar(name, "int")
    }

    /// A scalar parameter of the named type.
    pub fn scalar(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self::new(name, ParamType::Scalar(ty.into()))
    }

    /// A parameter resolved from the container by the type key of `T`.
    pub fn service<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Service(type_key::<T>().to_string()))
    }

    /// A parameter declared without a type. Resolving it is an error.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            default: None,
        }
    }

    /// Declares a default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type, if any.
    pub fn ty(&self) -> Option<&ParamType> {
        self.ty.as_ref()
    }

    /// Declared default value, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// A value bound to a parameter.
#[derive(Clone)]
pub enum Argument {
    /// The live request.
    Request(Box<Request>),
    /// A matched path attribute.
    Text(String),
    /// A declared default.
    Value(Value),
    /// A container-provided service.
    Service(Service),
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(req) => f
                .debug_tuple("Request")
                .field(&format_args!("{} {}", req.method, req.path))
                .finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Service(_) => f.write_str("Service(..)"),
        }
    }
}

/// Arguments bound to a handler's declared parameters, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<(String, Argument)>,
}

impl Arguments {
    /// Creates an empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an argument.
    pub fn push(&mut self, name: impl Into<String>, argument: Argument) {
        self.values.push((name.into(), argument));
    }

    /// Gets an argument by parameter name.
    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    /// The first request argument.
    pub fn request(&self) -> Option<&Request> {
        self.values.iter().find_map(|(_, a)| match a {
            Argument::Request(req) => Some(req.as_ref()),
            _ => None,
        })
    }

    /// An argument rendered as a string. Strings in JSON defaults are
    /// returned without quotes.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.get(name)? {
            Argument::Text(text) | Argument::Value(Value::String(text)) => Some(text.clone()),
            Argument::Value(value) => Some(value.to_string()),
            Argument::Request(_) | Argument::Service(_) => None,
        }
    }

    /// Parses an argument as a specific type.
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<T> {
        self.text(name).and_then(|v| v.parse().ok())
    }

    /// An argument as a JSON value.
    pub fn value(&self, name: &str) -> Option<Value> {
        match self.get(name)? {
            Argument::Text(text) => Some(Value::String(text.clone())),
            Argument::Value(value) => Some(value.clone()),
            Argument::Request(_) | Argument::Service(_) => None,
        }
    }

    /// A service argument downcast to `T`.
    pub fn service<T: Send + Sync + 'static>(&self, name: &str) -> Option<Arc<T>> {
        match self.get(name)? {
            Argument::Service(service) => Arc::clone(service).downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
