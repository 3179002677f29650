//! Middleware infrastructure for Tjall Router
//!
//! Middleware is attached to route groups and wraps every route declared in
//! the group, outer groups first.
//!
//! # Example
//!
//! ```rust,ignore
//! use tjall_router::prelude::*;
//!
//! router.group_with(
//!     RoutesGroup::new().prefix("/admin").layer(from_fn(require_token)),
//!     |admin| {
//!         admin.get("/stats", stats);
//!     },
//! );
//! ```

mod layer;

pub use layer::{from_fn, FnMiddleware, LayerStack, Middleware, Next};
