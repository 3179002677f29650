//! Routes and route groups
//!
//! A [`Route`] binds a method filter and a URL template to a callback. Routes
//! declared inside a [`RoutesGroup`] remember the group, and when called run
//! the middleware of the whole group chain (outermost group first) before the
//! callback.

use crate::error::Result;
use crate::handler::Callback;
use crate::middleware::{LayerStack, Middleware};
use crate::path::UrlPathTemplate;
use crate::request::Request;
use crate::response::Response;
use http::Method;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A set of HTTP methods a route answers to
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodFilter(u8);

impl MethodFilter {
    pub const GET: Self = Self(1 << 0);
    pub const POST: Self = Self(1 << 1);
    pub const PUT: Self = Self(1 << 2);
    pub const PATCH: Self = Self(1 << 3);
    pub const OPTIONS: Self = Self(1 << 4);
    pub const DELETE: Self = Self(1 << 5);
    pub const HEAD: Self = Self(1 << 6);

    /// GET|POST|PUT|PATCH|OPTIONS|DELETE
    pub const ALL: Self = Self(0b0011_1111);

    const NAMED: [(Self, Method); 7] = [
        (Self::GET, Method::GET),
        (Self::POST, Method::POST),
        (Self::PUT, Method::PUT),
        (Self::PATCH, Method::PATCH),
        (Self::OPTIONS, Method::OPTIONS),
        (Self::DELETE, Method::DELETE),
        (Self::HEAD, Method::HEAD),
    ];

    /// Union of two filters
    pub const fn or(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Whether every method of `other` is in this filter
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// Whether the filter accepts the given method
    pub fn matches(self, method: &Method) -> bool {
        Self::try_from(method).is_ok_and(|filter| self.contains(filter))
    }

    /// The methods in this filter
    pub fn methods(self) -> Vec<Method> {
        Self::NAMED
            .iter()
            .filter(|(filter, _)| self.contains(*filter))
            .map(|(_, method)| method.clone())
            .collect()
    }
}

impl TryFrom<&Method> for MethodFilter {
    type Error = InvalidMethodFilter;

    fn try_from(method: &Method) -> Result<Self, Self::Error> {
        Self::NAMED
            .iter()
            .find(|(_, named)| named == method)
            .map(|(filter, _)| *filter)
            .ok_or_else(|| InvalidMethodFilter(method.to_string()))
    }
}

impl FromStr for MethodFilter {
    type Err = InvalidMethodFilter;

    /// Parse `"GET"` or a union such as `"GET|POST|PUT"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split('|').try_fold(Self(0), |acc, name| {
            let method = Method::from_bytes(name.trim().to_ascii_uppercase().as_bytes())
                .map_err(|_| InvalidMethodFilter(name.to_string()))?;
            Ok(acc.or(Self::try_from(&method)?))
        })
    }
}

impl fmt::Debug for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(filter, _)| self.contains(*filter))
            .map(|(_, method)| method.as_str())
            .collect();
        f.write_str(&names.join("|"))
    }
}

/// Error returned when a method name is not part of the supported verb set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method: {0}")]
pub struct InvalidMethodFilter(pub String);

/// A registration-time scope sharing a base path and middleware
///
/// # Example
///
/// ```rust,ignore
/// router.group_with(RoutesGroup::new().prefix("/api").layer(from_fn(auth)), |api| {
///     api.get("/users", list_users);
///     api.group_with(RoutesGroup::new().prefix("/admin"), |admin| {
///         // GET /api/admin/stats, runs `auth` first
///         admin.get("/stats", stats);
///     });
/// });
/// ```
#[derive(Debug, Default)]
pub struct RoutesGroup {
    prefix: String,
    middleware: LayerStack,
    parent: Option<Arc<RoutesGroup>>,
}

impl RoutesGroup {
    /// Create a group with no prefix and no middleware
    pub fn new() -> Self {
        Self::default()
    }

    /// Base path prepended to every route declared in the group
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Add middleware run before every route of the group
    pub fn layer<M: Middleware>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Chain this group under `parent`, resolving the effective base path
    pub(crate) fn attach(mut self, parent: Option<Arc<RoutesGroup>>) -> Self {
        let parent_prefix = parent.as_ref().map(|p| p.base_path()).unwrap_or("/");
        self.prefix = UrlPathTemplate::join(parent_prefix, &self.prefix).to_string();
        self.parent = parent;
        self
    }

    /// Effective base path, including every enclosing group
    pub fn base_path(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }

    /// The enclosing group, if any
    pub fn parent(&self) -> Option<&Arc<RoutesGroup>> {
        self.parent.as_ref()
    }

    /// Middleware of the whole chain, outermost group first
    fn chain(&self) -> LayerStack {
        let mut stack = match &self.parent {
            Some(parent) => parent.chain(),
            None => LayerStack::new(),
        };
        stack.extend(&self.middleware);
        stack
    }
}

/// One registered (methods, template, callback) binding
pub struct Route {
    methods: Option<MethodFilter>,
    template: Option<UrlPathTemplate>,
    callback: Callback,
    group: Option<Arc<RoutesGroup>>,
    middleware: LayerStack,
}

impl Route {
    pub(crate) fn new(
        methods: Option<MethodFilter>,
        template: Option<UrlPathTemplate>,
        callback: Callback,
        group: Option<Arc<RoutesGroup>>,
    ) -> Self {
        let middleware = group.as_ref().map(|g| g.chain()).unwrap_or_default();
        Self {
            methods,
            template,
            callback,
            group,
            middleware,
        }
    }

    /// Error routes carry only a callback
    pub(crate) fn error_route(callback: Callback) -> Self {
        Self::new(None, None, callback, None)
    }

    /// Methods the route answers to; `None` for error routes
    pub fn methods(&self) -> Option<MethodFilter> {
        self.methods
    }

    /// Full URL template, group prefix included; `None` for error routes
    pub fn template(&self) -> Option<&UrlPathTemplate> {
        self.template.as_ref()
    }

    /// The group the route was declared in
    pub fn group(&self) -> Option<&Arc<RoutesGroup>> {
        self.group.as_ref()
    }

    /// Run the group middleware chain, then the callback
    pub async fn call(&self, req: Request, res: Response) -> Result<()> {
        self.middleware
            .execute(req, res, Arc::clone(&self.callback))
            .await
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("methods", &self.methods)
            .field("template", &self.template)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}
