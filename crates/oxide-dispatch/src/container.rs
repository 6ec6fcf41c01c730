//! Dependency container contract and the dispatch environment.

use std::any::Any;
use std::sync::Arc;

use tracing::trace;

use crate::classes::ClassRegistry;
use crate::error::{BoxError, Result, RouterError};
use crate::handler::Controller;
use crate::middleware::{Middleware, MiddlewareEntry};
use crate::policy::Policy;
use crate::response::REDIRECT_STATUSES;

/// A shared instance provided by a [`Container`].
///
/// Plain services are stored as `Arc<T>` and read back with
/// [`Arguments::service`](crate::Arguments::service). Controllers,
/// policies and middleware are stored as `Arc<Arc<dyn Trait>>`, see
/// [`object`].
pub type Service = Arc<dyn Any + Send + Sync>;

/// Resolves dependencies by name or by type key.
pub trait Container: Send + Sync {
    /// Whether `key` can be resolved.
    fn has(&self, key: &str) -> bool;

    /// Resolves `key`.
    fn get(&self, key: &str) -> std::result::Result<Service, BoxError>;
}

/// The key under which services of type `T` are looked up.
pub fn type_key<T: ?Sized + 'static>() -> &'static str {
    std::any::type_name::<T>()
}

/// Wraps a trait object so a container can hand it out as a [`Service`].
///
/// ```
/// use std::sync::Arc;
/// use oxide_dispatch::{object, Controller, Service};
///
/// fn provide(controller: Arc<dyn Controller>) -> Service {
///     object(controller)
/// }
/// ```
pub fn object<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Service {
    Arc::new(value)
}

fn downcast_object<T: ?Sized + Send + Sync + 'static>(
    container: &dyn Container,
    key: &str,
) -> Result<Arc<T>> {
    let service = container.get(key).map_err(|source| RouterError::Container {
        key: key.to_string(),
        source,
    })?;
    service
        .downcast::<Arc<T>>()
        .map(|object| Arc::clone(&*object))
        .map_err(|_| RouterError::Container {
            key: key.to_string(),
            source: format!("service \"{key}\" has an unexpected type").into(),
        })
}

/// Everything a dispatch needs besides the route and the request.
#[derive(Clone)]
pub struct Environment {
    container: Option<Arc<dyn Container>>,
    classes: Arc<ClassRegistry>,
    redirect_statuses: Arc<[u16]>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            container: None,
            classes: Arc::new(ClassRegistry::new()),
            redirect_statuses: Arc::from(REDIRECT_STATUSES.as_slice()),
        }
    }
}

impl Environment {
    /// Creates an environment with no container and no classes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the container.
    #[must_use]
    pub fn with_container(mut self, container: Arc<dyn Container>) -> Self {
        self.container = Some(container);
        self
    }

    /// Sets the class registry.
    #[must_use]
    pub fn with_classes(mut self, classes: ClassRegistry) -> Self {
        self.classes = Arc::new(classes);
        self
    }

    /// Sets the statuses that stop the middleware pipeline.
    #[must_use]
    pub fn with_redirect_statuses(mut self, statuses: &[u16]) -> Self {
        self.redirect_statuses = Arc::from(statuses);
        self
    }

    /// The configured container.
    pub fn container(&self) -> Option<&Arc<dyn Container>> {
        self.container.as_ref()
    }

    /// The class registry.
    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub(crate) fn classes_mut(&mut self) -> &mut ClassRegistry {
        Arc::make_mut(&mut self.classes)
    }

    pub(crate) fn set_container(&mut self, container: Arc<dyn Container>) {
        self.container = Some(container);
    }

    pub(crate) fn set_redirect_statuses(&mut self, statuses: &[u16]) {
        self.redirect_statuses = Arc::from(statuses);
    }

    /// Whether a middleware response with `status` ends the dispatch.
    pub fn is_redirect(&self, status: u16) -> bool {
        self.redirect_statuses.contains(&status)
    }

    /// The container, or `MissingContainer` naming `dependency`.
    pub fn require_container(&self, dependency: &str) -> Result<&dyn Container> {
        self.container
            .as_deref()
            .ok_or_else(|| RouterError::MissingContainer {
                dependency: dependency.to_string(),
            })
    }

    /// Instantiates a controller class: zero-argument constructor first,
    /// the container for classes registered as injected.
    pub(crate) fn controller(&self, class: &str) -> Result<Arc<dyn Controller>> {
        let entry = self.classes.controller_class(class).ok_or_else(|| {
            RouterError::TargetNotFound(format!("the class \"{class}\" does not exist"))
        })?;
        if let Some(instance) = entry.construct() {
            trace!(class, "controller constructed");
            return Ok(instance);
        }
        let container = self.require_container(class)?;
        trace!(class, "controller fetched from container");
        downcast_object::<dyn Controller>(container, class)
    }

    /// Instantiates a policy class: the container when it provides the
    /// class, the zero-argument constructor otherwise.
    pub(crate) fn policy(&self, class: &str) -> Result<Arc<dyn Policy>> {
        let entry = self.classes.policy_class(class).ok_or_else(|| {
            RouterError::TargetNotFound(format!("the policy class \"{class}\" does not exist"))
        })?;
        if let Some(container) = self.container.as_deref().filter(|c| c.has(class)) {
            return downcast_object::<dyn Policy>(container, class);
        }
        match entry.construct() {
            Some(instance) => Ok(instance),
            None => downcast_object::<dyn Policy>(self.require_container(class)?, class),
        }
    }

    /// Resolves a middleware entry to an instance.
    pub(crate) fn middleware(&self, entry: &MiddlewareEntry) -> Result<Arc<dyn Middleware>> {
        let name = match entry {
            MiddlewareEntry::Inline(middleware) => return Ok(Arc::clone(middleware)),
            MiddlewareEntry::Named(name) => name.as_str(),
        };
        let class = self.classes.middleware_class(name).ok_or_else(|| {
            RouterError::TargetNotFound(format!("the middleware class \"{name}\" does not exist"))
        })?;
        match class.construct() {
            Some(instance) => Ok(instance),
            None => downcast_object::<dyn Middleware>(self.require_container(name)?, name),
        }
    }
}
