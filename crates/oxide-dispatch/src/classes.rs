//! Named classes: controllers, policies and middleware referenced by name.
//!
//! A class is either constructible with no arguments, or injected, in which
//! case dispatch fetches the instance from the container under the class
//! name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::handler::Controller;
use crate::middleware::Middleware;
use crate::policy::Policy;

type Constructor<T> = Arc<dyn Fn() -> Arc<T> + Send + Sync>;

/// A registered class.
pub struct Class<T: ?Sized> {
    constructor: Option<Constructor<T>>,
}

impl<T: ?Sized> Clone for Class<T> {
    fn clone(&self) -> Self {
        Self {
            constructor: self.constructor.clone(),
        }
    }
}

impl<T: ?Sized> Class<T> {
    fn constructible(constructor: Constructor<T>) -> Self {
        Self {
            constructor: Some(constructor),
        }
    }

    fn injected() -> Self {
        Self { constructor: None }
    }

    /// Whether instances come from the container.
    pub fn is_injected(&self) -> bool {
        self.constructor.is_none()
    }

    /// Builds an instance with the zero-argument constructor.
    pub fn construct(&self) -> Option<Arc<T>> {
        self.constructor.as_ref().map(|ctor| ctor())
    }
}

/// Registry of named classes.
#[derive(Clone, Default)]
pub struct ClassRegistry {
    controllers: HashMap<String, Class<dyn Controller>>,
    policies: HashMap<String, Class<dyn Policy>>,
    middlewares: HashMap<String, Class<dyn Middleware>>,
}

impl ClassRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller class with a zero-argument constructor.
    pub fn controller<C, F>(&mut self, name: impl Into<String>, ctor: F) -> &mut Self
    where
        C: Controller + 'static,
        F: Fn() -> C + Send + Sync + 'static,
    {
        let ctor: Constructor<dyn Controller> =
            Arc::new(move || -> Arc<dyn Controller> { Arc::new(ctor()) });
        self.controllers.insert(name.into(), Class::constructible(ctor));
        self
    }

    /// Registers a controller class provided by the container.
    pub fn injected_controller(&mut self, name: impl Into<String>) -> &mut Self {
        self.controllers.insert(name.into(), Class::injected());
        self
    }

    /// Registers a policy class with a zero-argument constructor.
    pub fn policy<P, F>(&mut self, name: impl Into<String>, ctor: F) -> &mut Self
    where
        P: Policy + 'static,
        F: Fn() -> P + Send + Sync + 'static,
    {
        let ctor: Constructor<dyn Policy> =
            Arc::new(move || -> Arc<dyn Policy> { Arc::new(ctor()) });
        self.policies.insert(name.into(), Class::constructible(ctor));
        self
    }

    /// Registers a policy class provided by the container.
    pub fn injected_policy(&mut self, name: impl Into<String>) -> &mut Self {
        self.policies.insert(name.into(), Class::injected());
        self
    }

    /// Registers a middleware class with a zero-argument constructor.
    pub fn middleware<M, F>(&mut self, name: impl Into<String>, ctor: F) -> &mut Self
    where
        M: Middleware + 'static,
        F: Fn() -> M + Send + Sync + 'static,
    {
        let ctor: Constructor<dyn Middleware> =
            Arc::new(move || -> Arc<dyn Middleware> { Arc::new(ctor()) });
        self.middlewares.insert(name.into(), Class::constructible(ctor));
        self
    }

    /// Registers a middleware class provided by the container.
    pub fn injected_middleware(&mut self, name: impl Into<String>) -> &mut Self {
        self.middlewares.insert(name.into(), Class::injected());
        self
    }

    pub fn has_controller(&self, name: &str) -> bool {
        self.controllers.contains_key(name)
    }

    pub fn has_policy(&self, name: &str) -> bool {
        self.policies.contains_key(name)
    }

    pub fn has_middleware(&self, name: &str) -> bool {
        self.middlewares.contains_key(name)
    }

    pub(crate) fn controller_class(&self, name: &str) -> Option<&Class<dyn Controller>> {
        self.controllers.get(name)
    }

    pub(crate) fn policy_class(&self, name: &str) -> Option<&Class<dyn Policy>> {
        self.policies.get(name)
    }

    pub(crate) fn middleware_class(&self, name: &str) -> Option<&Class<dyn Middleware>> {
        self.middlewares.get(name)
    }
}
