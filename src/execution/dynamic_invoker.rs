//! # Dynamic Invoker
//!
//! Heterogeneous fan-out. Every task is a [`Promise`]: a different callable with its own
//! arguments, all sharing one [`TaskContext`]. Results come back in promise order as a
//! common type `R`, usually an enum with one variant per kind of answer.
//!
//! A promise is either bound at compile time with [`promisify`] / [`Promise::new`], or
//! names a handler that is looked up in a [`HandlerRegistry`] when its worker starts.
//! A name the registry does not know fails the call with an invalid-argument message.
//!
//! Callables report their answer as a [`Resolved`] value. Pointer-shaped answers
//! (`Arc`, `Box`) are unwrapped so the published result is always the value itself.
//!
//! ```rust
//! use fanout_core::{invoke_concurrent, promisify, Promise, Resolved, TaskContext, TaskError};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! enum Answer {
//!     Count(u32),
//!     Name(String),
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let context = TaskContext::new(10u32);
//! let promises = vec![
//!     Promise::new(|ctx: &TaskContext<u32>| {
//!         Ok::<_, TaskError>(Resolved::Value(Answer::Count(*ctx.values())))
//!     }),
//!     promisify(
//!         |_: &TaskContext<u32>, name: String| {
//!             Ok::<_, TaskError>(Resolved::Shared(Arc::new(Answer::Name(name))))
//!         },
//!         "ada".to_string(),
//!     ),
//! ];
//!
//! let answers = invoke_concurrent(context, promises).await.unwrap();
//! assert_eq!(answers, vec![Answer::Count(10), Answer::Name("ada".to_string())]);
//! # }
//! ```

use crate::config::FanOutConfig;
use crate::error::{Result, TaskError};
use crate::execution::context::TaskContext;
use crate::execution::fan_out::FanOut;
use crate::validation::validate_handler_args;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Shape of a callable's answer before it is published
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<R> {
    Value(R),
    /// Shared pointer; the pointee is copied out if other owners remain
    Shared(Arc<R>),
    Boxed(Box<R>),
}

impl<R: Clone> Resolved<R> {
    pub fn into_value(self) -> R {
        match self {
            Resolved::Value(value) => value,
            Resolved::Shared(shared) => Arc::unwrap_or_clone(shared),
            Resolved::Boxed(boxed) => *boxed,
        }
    }
}

impl<R> From<Arc<R>> for Resolved<R> {
    fn from(shared: Arc<R>) -> Self {
        Resolved::Shared(shared)
    }
}

impl<R> From<Box<R>> for Resolved<R> {
    fn from(boxed: Box<R>) -> Self {
        Resolved::Boxed(boxed)
    }
}

type BoundCall<C, R> =
    Box<dyn FnOnce(&TaskContext<C>) -> std::result::Result<Resolved<R>, TaskError> + Send>;

/// Handler registered under a name; receives its arguments as JSON
pub type Handler<C, R> = Arc<
    dyn Fn(&TaskContext<C>, Value) -> std::result::Result<Resolved<R>, TaskError> + Send + Sync,
>;

enum Target<C, R> {
    Bound(BoundCall<C, R>),
    Named { name: String, args: Value },
}

/// One task of a dynamic invocation
pub struct Promise<C, R> {
    target: Target<C, R>,
}

impl<C, R> fmt::Debug for Promise<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Bound(_) => f.debug_struct("Promise").field("target", &"bound").finish(),
            Target::Named { name, args } => f
                .debug_struct("Promise")
                .field("handler", name)
                .field("args", args)
                .finish(),
        }
    }
}

impl<C, R> Promise<C, R> {
    /// A promise calling `call` with the shared context only
    pub fn new<F>(call: F) -> Self
    where
        F: FnOnce(&TaskContext<C>) -> std::result::Result<Resolved<R>, TaskError> + Send + 'static,
    {
        Self {
            target: Target::Bound(Box::new(call)),
        }
    }

    /// A promise resolved against the invoker's registry when its worker starts
    pub fn named(name: impl Into<String>, args: Value) -> Self {
        Self {
            target: Target::Named {
                name: name.into(),
                args,
            },
        }
    }

    fn call(
        self,
        context: &TaskContext<C>,
        registry: &HandlerRegistry<C, R>,
    ) -> std::result::Result<Resolved<R>, TaskError> {
        match self.target {
            Target::Bound(call) => call(context),
            Target::Named { name, args } => {
                let handler = registry.get(&name).ok_or_else(|| {
                    TaskError::InvalidArgument(format!("{name} is not a registered function"))
                })?;
                validate_handler_args(&args)?;
                handler(context, args)
            }
        }
    }
}

/// Bind `args` to `call`, producing a promise that receives the context first
pub fn promisify<C, R, A, F>(call: F, args: A) -> Promise<C, R>
where
    A: Send + 'static,
    F: FnOnce(&TaskContext<C>, A) -> std::result::Result<Resolved<R>, TaskError> + Send + 'static,
{
    Promise::new(move |context: &TaskContext<C>| call(context, args))
}

/// Name-to-handler table consulted by named promises
pub struct HandlerRegistry<C, R> {
    handlers: HashMap<String, Handler<C, R>>,
}

impl<C, R> Default for HandlerRegistry<C, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, R> fmt::Debug for HandlerRegistry<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

impl<C, R> HandlerRegistry<C, R> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register `handler` under `name`, replacing any previous handler of that name
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&TaskContext<C>, Value) -> std::result::Result<Resolved<R>, TaskError>
            + Send
            + Sync
            + 'static,
    {
        let name = name.into();
        debug!(handler = %name, "Registering handler");
        self.handlers.insert(name, Arc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<Handler<C, R>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// Runs heterogeneous promises concurrently against one shared context
pub struct DynamicInvoker<C, R> {
    config: FanOutConfig,
    registry: Arc<HandlerRegistry<C, R>>,
}

impl<C, R> fmt::Debug for DynamicInvoker<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicInvoker")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

impl<C, R> Default for DynamicInvoker<C, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, R> DynamicInvoker<C, R> {
    pub fn new() -> Self {
        Self {
            config: FanOutConfig::default(),
            registry: Arc::new(HandlerRegistry::new()),
        }
    }

    pub fn with_config(mut self, config: FanOutConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: HandlerRegistry<C, R>) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn registry(&self) -> &HandlerRegistry<C, R> {
        &self.registry
    }
}

impl<C, R> DynamicInvoker<C, R>
where
    C: Send + Sync + 'static,
    R: Clone + Send + 'static,
{
    /// Run every promise on its own worker and return their answers in promise order
    pub async fn invoke(
        &self,
        context: TaskContext<C>,
        promises: Vec<Promise<C, R>>,
    ) -> Result<Vec<R>> {
        let fan_out = FanOut::new("invoke_concurrent", promises.len(), &self.config);
        let context = Arc::new(context.bind(fan_out.cancellation()));

        for (index, promise) in promises.into_iter().enumerate() {
            let slot = fan_out.slot(index);
            let context = Arc::clone(&context);
            let registry = Arc::clone(&self.registry);

            fan_out.spawn_thread(index, move || {
                debug!(index = index, promise = ?promise, "Worker started");
                slot.run_blocking(move || {
                    promise
                        .call(&context, &registry)
                        .map(Resolved::into_value)
                });
            });
        }

        fan_out.join().await
    }
}

/// Run `promises` concurrently against `context` with default settings and no registry
pub async fn invoke_concurrent<C, R>(
    context: TaskContext<C>,
    promises: Vec<Promise<C, R>>,
) -> Result<Vec<R>>
where
    C: Send + Sync + 'static,
    R: Clone + Send + 'static,
{
    DynamicInvoker::new().invoke(context, promises).await
}
