use std::{
    any::{Any, TypeId},
    collections::HashMap,
    error::Error as StdError,
    fmt,
    sync::Arc,
};

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, warn};

use crate::request::Request;

/// Executes the use case behind a request type.
#[async_trait]
pub trait Handler<R: Request>: Send + Sync + 'static {
    async fn handle(&self, request: R) -> Result<R::Output, R::Error>;
}

/// Startup wiring failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("a handler is already registered for request `{request}`")]
    DuplicateHandlerRegistration { request: &'static str },
}

/// Failures surfaced by [`Dispatcher::dispatch`].
#[derive(Debug, Error)]
pub enum DispatchError<E>
where
    E: StdError + 'static,
{
    /// No handler was registered for the request type. This is a wiring
    /// defect, not a user error.
    #[error("no handler registered for request `{request}`")]
    HandlerNotFound { request: &'static str },
    /// The handler itself failed; the error is passed through untouched.
    #[error(transparent)]
    Handler(E),
}

struct Registration {
    request: &'static str,
    // Always an `Arc<dyn Handler<R>>` for the `R` whose `TypeId` keys this entry.
    handler: Box<dyn Any + Send + Sync>,
}

/// Collects handler registrations before the dispatcher is frozen.
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: HashMap<TypeId, Registration>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for requests of type `R`.
    ///
    /// Fails when `R` already has a handler; the existing registration is
    /// left in place.
    pub fn register<R, H>(mut self, handler: H) -> Result<Self, RegistrationError>
    where
        R: Request,
        H: Handler<R>,
    {
        let key = TypeId::of::<R>();
        if self.handlers.contains_key(&key) {
            return Err(RegistrationError::DuplicateHandlerRegistration { request: R::NAME });
        }

        let handler: Arc<dyn Handler<R>> = Arc::new(handler);
        self.handlers.insert(
            key,
            Registration {
                request: R::NAME,
                handler: Box::new(handler),
            },
        );
        debug!(stage = "dispatch", request = R::NAME, kind = R::KIND.as_str(), "handler registered");
        Ok(self)
    }

    /// Freezes the registry.
    pub fn build(self) -> Dispatcher {
        Dispatcher {
            handlers: Arc::new(self.handlers),
        }
    }
}

/// Immutable request router shared across tasks.
///
/// Built by [`DispatcherBuilder::build`]. The registry is never mutated
/// afterwards, so dispatch takes no locks. Every dispatch is counted in
/// `dispatch_total`, labelled by request name and result.
#[derive(Clone)]
pub struct Dispatcher {
    handlers: Arc<HashMap<TypeId, Registration>>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Routes `request` to its handler and returns the handler's result
    /// unchanged.
    pub async fn dispatch<R: Request>(&self, request: R) -> Result<R::Output, DispatchError<R::Error>> {
        let Some(handler) = self.handler_for::<R>() else {
            counter!("dispatch_total", "request" => R::NAME, "result" => "handler_not_found")
                .increment(1);
            warn!(stage = "dispatch", request = R::NAME, "no handler registered");
            return Err(DispatchError::HandlerNotFound { request: R::NAME });
        };

        debug!(stage = "dispatch", request = R::NAME, kind = R::KIND.as_str(), "dispatching");
        let result = handler.handle(request).await;
        let outcome = if result.is_ok() { "ok" } else { "handler_error" };
        counter!("dispatch_total", "request" => R::NAME, "result" => outcome).increment(1);
        result.map_err(DispatchError::Handler)
    }

    /// Names of all registered request types, sorted.
    pub fn registered_requests(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.handlers.values().map(|entry| entry.request).collect();
        names.sort_unstable();
        names
    }

    fn handler_for<R: Request>(&self) -> Option<Arc<dyn Handler<R>>> {
        self.handlers
            .get(&TypeId::of::<R>())
            .and_then(|entry| entry.handler.downcast_ref::<Arc<dyn Handler<R>>>())
            .cloned()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("requests", &self.registered_requests())
            .finish()
    }
}
