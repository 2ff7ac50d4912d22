use crate::middleware::BoxFuture;
use crate::request::Request;
use crate::response::Response;

/// A registered handler. Handlers read `Request`/`Context` but do not
/// extend it — mutation is a middleware-only privilege.
#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, req: &Request) -> Result<Response, anyhow::Error>;
}

/// Adapts a boxed async closure into a `Handler`, the common case for
/// application code registering `|req| async move { ... }` directly instead
/// of defining a named type.
pub struct HandlerFn<F>(pub F)
where
    F: for<'r> Fn(&'r Request) -> BoxFuture<'r, Result<Response, anyhow::Error>> + Send + Sync;

#[async_trait::async_trait]
impl<F> Handler for HandlerFn<F>
where
    F: for<'r> Fn(&'r Request) -> BoxFuture<'r, Result<Response, anyhow::Error>> + Send + Sync,
{
    async fn call(&self, req: &Request) -> Result<Response, anyhow::Error> {
        (self.0)(req).await
    }
}
