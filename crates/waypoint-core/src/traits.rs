use futures::future::BoxFuture;

use crate::context::ExecutionContext;
use crate::error::Result;

/// Caller-supplied domain logic bound to a step.
pub trait Action: Send + Sync + 'static {
    /// Run the action against the shared context. Mutations are visible to
    /// every later step of the same run.
    fn invoke<'a>(&'a self, ctx: &'a mut ExecutionContext) -> BoxFuture<'a, Result<()>>;
}

/// Three-method message sink used by the engine.
pub trait Logger: Send + Sync + 'static {
    fn log(&self, message: &str);

    fn warn(&self, message: &str);

    fn error(&self, message: &str);
}

impl<A: Action + ?Sized> Action for std::sync::Arc<A> {
    fn invoke<'a>(&'a self, ctx: &'a mut ExecutionContext) -> BoxFuture<'a, Result<()>> {
        (**self).invoke(ctx)
    }
}
