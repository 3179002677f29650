//! # Tjall Router Core
//!
//! Core library providing the router, route groups, error routes and the REST
//! resource adapter of Tjall Router.
//!
//! This crate is not meant to be used directly. Use `tjall-router` instead.

mod api_handler;
mod config;
mod error;
mod handler;
pub mod middleware;
mod path;
mod request;
mod response;
mod route;
mod route_file;
mod router;
mod server;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

// Public API
pub use api_handler::{ApiHandler, ApiHandlerOptions, HandlerCall, Operation, OperationToggles, Resource};
pub use config::{init_tracing, ConfigError, Mode, RouterConfig};
pub use error::{ApiError, BoxError, Result, RouterError};
pub use handler::{Callback, Handler};
pub use middleware::{from_fn, Middleware, Next};
pub use path::UrlPathTemplate;
pub use request::Request;
pub use response::{HttpResponse, Response};
pub use route::{InvalidMethodFilter, MethodFilter, Route, RoutesGroup};
pub use route_file::{RouteFile, ROUTE_FILES};
pub use router::{GroupRoutes, RouteConflictError, RouteRegistrar, Router};
pub use server::{serve, serve_listener};
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestRequest, TestResponse};

// Used by `route_file!`
#[doc(hidden)]
pub mod __private {
    pub use linkme;
}
