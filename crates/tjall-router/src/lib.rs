//! # Tjall Router
//!
//! A small HTTP router: route groups with shared base paths and middleware,
//! chained error routes per status code, and a REST resource adapter that
//! turns a [`Resource`] into five CRUD routes.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tjall_router::prelude::*;
//!
//! async fn list_users(_req: Request, res: Response) -> Result<()> {
//!     res.send_json(&serde_json::json!([{ "id": 1 }]))
//! }
//!
//! async fn not_found(_req: Request, res: Response) -> Result<()> {
//!     res.send_text("Not found")
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), BoxError> {
//!     let config = RouterConfig::from_env()?;
//!     init_tracing(&config);
//!
//!     let mut router = Router::configure(&config);
//!     router.get("/users", list_users);
//!     router.error(StatusCode::NOT_FOUND, not_found);
//!
//!     serve(router, &config.addr).await
//! }
//! ```
//!
//! ## Route files
//!
//! Route declarations can live in their own files under the routes directory
//! (`TJALL_ROUTES_DIR`, default `src/routes`) and register themselves with
//! [`route_file!`]. [`Router::configure`] loads them in path order.
//!
//! ```rust,ignore
//! // src/routes/users.rs
//! use tjall_router::prelude::*;
//!
//! fn routes(router: &mut Router) {
//!     ApiHandler::create(Users::default(), ApiHandlerOptions::default())
//!         .set_base_path_template(router, "/users");
//! }
//!
//! tjall_router::route_file!(routes);
//! ```
//!
//! ## Modes
//!
//! `TJALL_MODE=production` (the default) installs the error boundary:
//! unexpected failures are logged and answered with a masked 500.
//! `TJALL_MODE=dev` leaves them unhandled so they surface from
//! [`Router::run`].

// Re-export core functionality
pub use tjall_router_core::*;

// Re-exports for user convenience
pub use async_trait::async_trait;
pub use http::{Method, StatusCode};

/// Prelude module - import everything you need with `use tjall_router::prelude::*`
pub mod prelude {
    pub use tjall_router_core::{
        from_fn,
        init_tracing,
        serve,
        ApiError,
        // Resource adapter
        ApiHandler,
        ApiHandlerOptions,
        BoxError,
        HandlerCall,
        MethodFilter,
        Middleware,
        Mode,
        Next,
        Operation,
        Request,
        Resource,
        Response,
        Result,
        // Routing
        RouteRegistrar,
        Router,
        RouterConfig,
        RouterError,
        RoutesGroup,
    };

    pub use async_trait::async_trait;
    pub use http::{Method, StatusCode};
    pub use serde::{Deserialize, Serialize};
}
