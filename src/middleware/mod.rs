mod auth;
mod ignore_self;
mod ssl_check;
mod verify_signature;

pub use auth::{MultiTeamsAuthorization, SingleTeamAuthorization};
pub use ignore_self::IgnoringSelfEvents;
pub use ssl_check::SslCheck;
pub use verify_signature::VerifySignature;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A single stage in the pipeline. `apply` receives the request, the draft
/// response built so far, and a `next` continuation; it may short-circuit,
/// delegate, or post-process.
#[async_trait::async_trait]
pub trait Middleware: Send + Sync {
    async fn apply(
        &self,
        req: &mut Request,
        draft: Response,
        next: Next<'_>,
    ) -> Result<Response, anyhow::Error>;
}

/// The terminal step a `MiddlewareChain` invokes once every middleware has
/// called `next`. The Dispatcher implements this to perform registry
/// lookup + handler invocation; tests can implement it with a bare closure
/// wrapper (`FnTerminal`) for isolation.
#[async_trait::async_trait]
pub trait Terminal: Send + Sync {
    async fn call(&self, req: &mut Request) -> Result<Response, anyhow::Error>;
}

/// Adapts a boxed async closure into a `Terminal`, for tests that don't want
/// to stand up a full Dispatcher.
pub struct FnTerminal<F>(pub F)
where
    F: for<'r> Fn(&'r mut Request) -> BoxFuture<'r, Result<Response, anyhow::Error>> + Send + Sync;

#[async_trait::async_trait]
impl<F> Terminal for FnTerminal<F>
where
    F: for<'r> Fn(&'r mut Request) -> BoxFuture<'r, Result<Response, anyhow::Error>> + Send + Sync,
{
    async fn call(&self, req: &mut Request) -> Result<Response, anyhow::Error> {
        (self.0)(req).await
    }
}

/// The continuation handed to a middleware. Calling it runs every remaining
/// stage (and finally the terminal) and returns its `Response`.
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    pub fn run(
        self,
        req: &'a mut Request,
        draft: Response,
    ) -> BoxFuture<'a, Result<Response, anyhow::Error>> {
        Box::pin(async move {
            match self.middlewares.split_first() {
                Some((stage, rest)) => {
                    let next = Next {
                        middlewares: rest,
                        terminal: self.terminal,
                    };
                    stage.apply(req, draft, next).await
                }
                None => self.terminal.call(req).await,
            }
        })
    }
}

/// Runs `middlewares` in registration order, finally invoking `terminal`.
/// Implemented iteratively (an index into the slice plus an explicit `next`
/// value) rather than recursively building closures — this keeps stack
/// depth flat regardless of chain length.
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self { middlewares }
    }

    pub async fn run<'a>(
        &'a self,
        req: &'a mut Request,
        terminal: &'a dyn Terminal,
    ) -> Result<Response, anyhow::Error> {
        let next = Next {
            middlewares: &self.middlewares,
            terminal,
        };
        next.run(req, Response::ok()).await
    }
}
