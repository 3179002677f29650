//! Route callbacks and their type-erased form

use crate::error::Result;
use crate::request::Request;
use crate::response::Response;
use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Type-erased callback stored in routes and middleware chains
pub type Callback = Arc<dyn Fn(Request, Response) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Trait representing an async route callback
///
/// Implemented for every `Fn(Request, Response) -> impl Future<Output = Result<()>>`.
/// The callback writes to the [`Response`] handle; its return value only
/// reports success or failure.
pub trait Handler: Send + Sync + 'static {
    /// Call the handler
    fn call(&self, req: Request, res: Response) -> BoxFuture<'static, Result<()>>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self, req: Request, res: Response) -> BoxFuture<'static, Result<()>> {
        Box::pin(self(req, res))
    }
}

/// Create a boxed callback from any Handler
pub(crate) fn into_callback<H: Handler>(handler: H) -> Callback {
    let handler = Arc::new(handler);
    Arc::new(move |req: Request, res: Response| handler.call(req, res))
}
