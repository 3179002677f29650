//! Middleware chains attached to route groups
//!
//! A group's middleware wraps every route declared inside it. Each layer
//! receives the request, the response handle, and `next`, the rest of the
//! chain. Not calling `next` short-circuits the chain.

use crate::error::Result;
use crate::handler::Callback;
use crate::request::Request;
use crate::response::Response;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// The remainder of a middleware chain, ending in the route callback
pub type Next = Callback;

/// Trait for middleware that can be attached to a [`RoutesGroup`](crate::RoutesGroup)
pub trait Middleware: Send + Sync + 'static {
    /// Apply this middleware, calling `next` to continue the chain
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture<'static, Result<()>>;
}

/// Middleware built from an async closure, see [`from_fn`]
pub struct FnMiddleware<F> {
    f: F,
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self, req: Request, res: Response, next: Next) -> BoxFuture<'static, Result<()>> {
        Box::pin((self.f)(req, res, next))
    }
}

/// Build a middleware from an async closure
///
/// # Example
///
/// ```rust,ignore
/// let auth = from_fn(|req: Request, res: Response, next: Next| async move {
///     if req.headers().contains_key("authorization") {
///         next(req, res).await
///     } else {
///         Err(ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", "Missing token").into())
///     }
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnMiddleware<F>
where
    F: Fn(Request, Response, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    FnMiddleware { f }
}

/// An ordered stack of middleware
#[derive(Clone, Default)]
pub struct LayerStack {
    layers: Vec<Arc<dyn Middleware>>,
}

impl LayerStack {
    /// Create a new empty layer stack
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Add a middleware layer to the stack
    ///
    /// Layers are executed in the order they are added (outermost first).
    pub fn push(&mut self, layer: Arc<dyn Middleware>) {
        self.layers.push(layer);
    }

    /// Append every layer of another stack, keeping its order
    pub fn extend(&mut self, other: &LayerStack) {
        self.layers.extend(other.layers.iter().cloned());
    }

    /// Check if the stack is empty
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Get the number of layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Execute the middleware stack with a final callback
    pub fn execute(&self, req: Request, res: Response, callback: Callback) -> BoxFuture<'static, Result<()>> {
        if self.layers.is_empty() {
            return callback(req, res);
        }

        // Build the chain from inside out so the first layer runs first
        let mut next = callback;

        for layer in self.layers.iter().rev() {
            let layer = Arc::clone(layer);
            let current_next = next;
            next = Arc::new(move |req: Request, res: Response| {
                layer.call(req, res, Arc::clone(&current_next))
            });
        }

        next(req, res)
    }
}

impl std::fmt::Debug for LayerStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerStack").field("len", &self.layers.len()).finish()
    }
}
