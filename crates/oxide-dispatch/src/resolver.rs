//! Binds declared handler parameters to values.

use tracing::trace;

use crate::container::Environment;
use crate::error::{Result, RouterError};
use crate::request::{Attributes, Request};
use crate::signature::{Argument, Arguments, Param, ParamType};

/// The sources parameters are bound from.
#[derive(Clone, Copy)]
pub struct Bindings<'a> {
    /// The live request.
    pub request: &'a Request,
    /// Attributes matched from the path.
    pub attributes: &'a Attributes,
    /// Container and classes.
    pub env: &'a Environment,
}

impl<'a> Bindings<'a> {
    /// Creates bindings for one dispatch.
    pub const fn new(
        request: &'a Request,
        attributes: &'a Attributes,
        env: &'a Environment,
    ) -> Self {
        Self {
            request,
            attributes,
            env,
        }
    }
}

/// Resolves every parameter of `target`, in declaration order.
///
/// Precedence, first match wins: the request for `Request` parameters, a
/// matched attribute of the same name, the declared default, the container
/// by type key for service parameters, the container by parameter name.
pub fn resolve_arguments(
    params: &[Param],
    target: &str,
    bindings: &Bindings<'_>,
) -> Result<Arguments> {
    let mut arguments = Arguments::new();
    for param in params {
        let argument = resolve_one(param, target, bindings)?;
        arguments.push(param.name(), argument);
    }
    Ok(arguments)
}

fn resolve_one(param: &Param, target: &str, bindings: &Bindings<'_>) -> Result<Argument> {
    let name = param.name();
    let Some(ty) = param.ty() else {
        return Err(RouterError::config(format!(
            "parameter \"{name}\" of {target} has no declared type"
        )));
    };
    if *ty == ParamType::Request {
        return Ok(Argument::Request(Box::new(bindings.request.clone())));
    }
    if let Some(value) = bindings.attributes.get(name) {
        trace!(parameter = name, target, "bound from path");
        return Ok(Argument::Text(value.to_string()));
    }
    if let Some(default) = param.default_value() {
        return Ok(Argument::Value(default.clone()));
    }
    let key = match ty {
        ParamType::Service(key) => key.as_str(),
        ParamType::Scalar(_) | ParamType::Request => name,
    };
    let container = bindings.env.require_container(key)?;
    if !container.has(key) {
        return Err(RouterError::UnresolvableParameter {
            parameter: name.to_string(),
            target: target.to_string(),
            source: None,
        });
    }
    trace!(parameter = name, key, target, "bound from container");
    container
        .get(key)
        .map(Argument::Service)
        .map_err(|source| RouterError::UnresolvableParameter {
            parameter: name.to_string(),
            target: target.to_string(),
            source: Some(source),
        })
}
