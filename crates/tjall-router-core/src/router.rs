//! Router implementation using radix tree (matchit)
//!
//! The [`Router`] owns the route table and the error-route table and drives a
//! request through one dispatch:
//!
//! ```text
//! Idle ─configure─▶ Configured ─run─▶ Running ─┬─▶ Dispatched ─┐
//!                                               ├─▶ NotFound ───┼─▶ Completed
//!                                               └─▶ Errored ────┘
//! ```
//!
//! Routes are declared through the [`RouteRegistrar`] trait, implemented by the
//! router itself and by the group-scoped [`GroupRoutes`] handed to
//! [`RouteRegistrar::group`] closures.
//!
//! # Example
//!
//! ```rust,ignore
//! use tjall_router::prelude::*;
//!
//! let mut router = Router::new();
//! router.get("/users", list_users);
//! router.group_with(RoutesGroup::new().prefix("/admin").layer(from_fn(auth)), |admin| {
//!     admin.delete("/users/{id}", delete_user);
//! });
//! router.error(StatusCode::NOT_FOUND, not_found);
//! ```
//!
//! # Route Conflict Detection
//!
//! Templates the matching engine cannot tell apart, such as `/users/{id}` and
//! `/users/{user_id}`, are rejected at registration time with a
//! [`RouteConflictError`] panic.

use crate::config::{Mode, RouterConfig};
use crate::error::{ApiError, ErrorResponse, Result, RouterError};
use crate::handler::{into_callback, Callback};
use crate::path::{trim_request_path, UrlPathTemplate};
use crate::request::Request;
use crate::response::{HttpResponse, Response};
use crate::route::{MethodFilter, Route, RoutesGroup};
use crate::route_file::ROUTE_FILES;
use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::Full;
use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Error raised when a template conflicts with an already registered one
#[derive(Debug, Clone)]
pub struct RouteConflictError {
    /// The template that was being registered
    pub new_path: String,
    /// The existing template that conflicts
    pub existing_path: String,
    /// Detailed error message from the matching engine
    pub details: String,
}

impl std::fmt::Display for RouteConflictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "route conflict detected")?;
        writeln!(f, "  existing: {}", self.existing_path)?;
        writeln!(f, "  new:      {}", self.new_path)?;
        writeln!(f, "  details:  {}", self.details)?;
        write!(
            f,
            "  hint: parameters at the same position must share a name, e.g. use /users/{{id}} everywhere"
        )
    }
}

impl std::error::Error for RouteConflictError {}

/// The route-declaration API shared by [`Router`] and [`GroupRoutes`]
///
/// Routes declared through a registrar are bound to its current group, if any.
pub trait RouteRegistrar {
    /// The router being populated
    fn router(&mut self) -> &mut Router;

    /// The group routes declared through this registrar are bound to
    fn current_group(&self) -> Option<Arc<RoutesGroup>>;

    /// Register a callback for a set of methods on a URL template
    fn match_route<F, Fut>(&mut self, methods: impl Into<MethodFilter>, url: &str, callback: F) -> Arc<Route>
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let group = self.current_group();
        self.router()
            .register(methods.into(), url, group, into_callback(callback))
    }

    /// Register the same callback for GET|POST|PUT|PATCH|OPTIONS|DELETE
    fn all<F, Fut>(&mut self, url: &str, callback: F) -> Arc<Route>
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.match_route(MethodFilter::ALL, url, callback)
    }

    /// Register a GET route
    fn get<F, Fut>(&mut self, url: &str, callback: F) -> Arc<Route>
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.match_route(MethodFilter::GET, url, callback)
    }

    /// Register a POST route
    fn post<F, Fut>(&mut self, url: &str, callback: F) -> Arc<Route>
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.match_route(MethodFilter::POST, url, callback)
    }

    /// Register a PUT route
    fn put<F, Fut>(&mut self, url: &str, callback: F) -> Arc<Route>
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.match_route(MethodFilter::PUT, url, callback)
    }

    /// Register a PATCH route
    fn patch<F, Fut>(&mut self, url: &str, callback: F) -> Arc<Route>
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.match_route(MethodFilter::PATCH, url, callback)
    }

    /// Register an OPTIONS route
    fn options<F, Fut>(&mut self, url: &str, callback: F) -> Arc<Route>
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.match_route(MethodFilter::OPTIONS, url, callback)
    }

    /// Register a DELETE route
    fn delete<F, Fut>(&mut self, url: &str, callback: F) -> Arc<Route>
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.match_route(MethodFilter::DELETE, url, callback)
    }

    /// Append a handler to the error-route chain of `status`
    ///
    /// Existing handlers for the status are kept; all of them run, in
    /// registration order, whenever that status is dispatched. The first body
    /// sent wins; later handlers sending again are not an error.
    fn error<F, Fut>(&mut self, status: StatusCode, callback: F)
    where
        F: Fn(Request, Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.router().add_error_route(status, into_callback(callback));
    }

    /// Declare routes inside an anonymous group
    fn group<F>(&mut self, add_routes: F) -> Arc<RoutesGroup>
    where
        F: FnOnce(&mut GroupRoutes<'_>),
    {
        self.group_with(RoutesGroup::new(), add_routes)
    }

    /// Declare routes inside `group`, chained under the current group
    ///
    /// Only declarations made through the registrar handed to `add_routes`
    /// are bound to the new group.
    fn group_with<F>(&mut self, group: RoutesGroup, add_routes: F) -> Arc<RoutesGroup>
    where
        F: FnOnce(&mut GroupRoutes<'_>),
    {
        let group = Arc::new(group.attach(self.current_group()));
        let mut scoped = GroupRoutes {
            router: self.router(),
            group: Arc::clone(&group),
        };
        add_routes(&mut scoped);
        group
    }
}

/// Registrar scoped to one [`RoutesGroup`]
pub struct GroupRoutes<'r> {
    router: &'r mut Router,
    group: Arc<RoutesGroup>,
}

impl GroupRoutes<'_> {
    /// The group this registrar binds routes to
    pub fn routes_group(&self) -> &Arc<RoutesGroup> {
        &self.group
    }
}

impl RouteRegistrar for GroupRoutes<'_> {
    fn router(&mut self) -> &mut Router {
        &mut *self.router
    }

    fn current_group(&self) -> Option<Arc<RoutesGroup>> {
        Some(Arc::clone(&self.group))
    }
}

/// Main router
pub struct Router {
    inner: MatchitRouter<usize>,
    /// Routes sharing a matchit path, in registration order
    slots: Vec<Vec<Arc<Route>>>,
    /// matchit path -> slot index
    slot_index: HashMap<String, usize>,
    routes: Vec<Arc<Route>>,
    error_routes: HashMap<StatusCode, Vec<Arc<Route>>>,
    config: RouterConfig,
}

impl Router {
    /// Create a new router in production mode
    pub fn new() -> Self {
        Self {
            inner: MatchitRouter::new(),
            slots: Vec::new(),
            slot_index: HashMap::new(),
            routes: Vec::new(),
            error_routes: HashMap::new(),
            config: RouterConfig::default(),
        }
    }

    /// Create a router from configuration and load its route files
    ///
    /// Route files are the [`route_file!`](crate::route_file) declarations
    /// whose source lies under [`RouterConfig::route_files_dir`].
    pub fn configure(config: &RouterConfig) -> Self {
        let mut router = Self::new();
        router.config = config.clone();
        let routes_dir = config.route_files_dir();
        let loaded = router.load_route_files(&routes_dir);
        if loaded == 0 {
            warn!(routes_dir = %routes_dir.display(), "No route files found");
        }
        info!(
            mode = %config.mode,
            routes_dir = %routes_dir.display(),
            route_files = loaded,
            "Router configured"
        );
        router
    }

    /// Set the mode; [`Mode::Dev`] disables the error boundary
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Current mode
    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// The configuration the router was built from
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Run every registered route file located under `dir`, in path order
    ///
    /// Returns the number of files loaded.
    pub fn load_route_files(&mut self, dir: &Path) -> usize {
        let mut files: Vec<_> = ROUTE_FILES
            .iter()
            .filter(|file| file.is_under(dir))
            .collect();
        files.sort_by_key(|file| file.file);

        for file in &files {
            debug!(file = file.file, "Loading route file");
            (file.register)(self);
        }
        files.len()
    }

    /// All routes in registration order
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    /// Handlers registered for `status`, in registration order
    pub fn error_routes(&self, status: StatusCode) -> &[Arc<Route>] {
        self.error_routes
            .get(&status)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn register(
        &mut self,
        methods: MethodFilter,
        url: &str,
        group: Option<Arc<RoutesGroup>>,
        callback: Callback,
    ) -> Arc<Route> {
        let base = group.as_ref().map(|g| g.base_path()).unwrap_or("/");
        let template = UrlPathTemplate::join(base, url);
        let matchit_path = template.to_matcher_path();

        let slot = match self.slot_index.get(&matchit_path) {
            Some(&slot) => slot,
            None => {
                let slot = self.slots.len();
                if let Err(e) = self.inner.insert(matchit_path.clone(), slot) {
                    let existing_path = self
                        .find_conflicting_route(&matchit_path)
                        .unwrap_or_else(|| "<unknown>".to_string());

                    let conflict_error = RouteConflictError {
                        new_path: template.to_string(),
                        existing_path,
                        details: e.to_string(),
                    };

                    panic!("{}", conflict_error);
                }
                self.slot_index.insert(matchit_path, slot);
                self.slots.push(Vec::new());
                slot
            }
        };

        debug!(methods = %methods, template = %template, "Route registered");

        let route = Arc::new(Route::new(Some(methods), Some(template), callback, group));
        self.slots[slot].push(Arc::clone(&route));
        self.routes.push(Arc::clone(&route));
        route
    }

    pub(crate) fn add_error_route(&mut self, status: StatusCode, callback: Callback) {
        self.error_routes
            .entry(status)
            .or_default()
            .push(Arc::new(Route::error_route(callback)));
    }

    /// Find the template of a registered route that conflicts with `matchit_path`
    fn find_conflicting_route(&self, matchit_path: &str) -> Option<String> {
        let normalized_new = normalize_path_for_comparison(matchit_path);

        self.slot_index
            .iter()
            .find(|(registered, _)| normalize_path_for_comparison(registered) == normalized_new)
            .and_then(|(_, &slot)| self.slots[slot].first())
            .and_then(|route| route.template().map(ToString::to_string))
    }

    /// Match a method and path against the route table
    ///
    /// The first registered route accepting the method wins. HEAD falls back
    /// to GET routes when no route accepts HEAD itself.
    pub(crate) fn find_route(&self, method: &Method, path: &str) -> Option<(Arc<Route>, Vec<(String, String)>)> {
        let matched = self.inner.at(path).ok()?;
        let routes = &self.slots[*matched.value];

        let accepts = |method: &Method| {
            routes
                .iter()
                .find(|route| route.methods().is_some_and(|m| m.matches(method)))
        };
        let route = accepts(method).or_else(|| {
            if method == Method::HEAD {
                accepts(&Method::GET)
            } else {
                None
            }
        })?;

        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Some((Arc::clone(route), params))
    }

    /// Dispatch one request and finalize its response
    ///
    /// Failures raised by callbacks are handed to the error boundary. The
    /// returned error is fatal: a missing error route, or an unexpected
    /// failure while running in [`Mode::Dev`].
    pub async fn run(&self, request: Request) -> Result<HttpResponse> {
        let method = request.method().clone();
        let path = trim_request_path(request.path()).to_string();
        let span = info_span!("dispatch", method = %method, path = %path);

        self.dispatch(request, method, path).instrument(span).await
    }

    async fn dispatch(&self, request: Request, method: Method, path: String) -> Result<HttpResponse> {
        let response = Response::new();

        let outcome = match self.find_route(&method, &path) {
            Some((route, params)) => {
                let request = request.with_params(params);
                debug!(template = ?route.template().map(ToString::to_string), "Route matched");

                match route.call(request.clone(), response.clone()).await {
                    Ok(()) => Ok(()),
                    Err(err) => self.handle_error(err, &request, &response).await,
                }
            }
            None => {
                debug!("No route matched");
                self.call_error_routes(StatusCode::NOT_FOUND, &request, &response)
                    .await
            }
        };

        if let Err(err) = outcome {
            self.render_chain_failure(err, &response)?;
        }

        let mut finished = response.end()?;
        if method == Method::HEAD {
            *finished.body_mut() = Full::new(Bytes::new());
        }
        Ok(finished)
    }

    /// The error boundary: render what can be rendered, surface the rest
    async fn handle_error(&self, err: RouterError, request: &Request, response: &Response) -> Result<()> {
        let api_error = match err {
            RouterError::Response(api_error) => {
                debug!(status = %api_error.status, error = %api_error, "Callback responded with an error");
                api_error
            }
            RouterError::Configuration { .. } => return Err(err),
            err if self.mode().is_dev() => {
                error!(error = %err, "Unhandled dispatch error");
                return Err(err);
            }
            err => {
                error!(error = %err, "Dispatch failed");
                ApiError::internal("Internal server error").with_internal(err.to_string())
            }
        };

        response.reset();
        let status = api_error.status;
        if self.error_routes.contains_key(&status) {
            self.call_error_routes(status, request, response).await
        } else {
            response.status(status);
            response.send_json(&ErrorResponse::from(api_error))
        }
    }

    /// Run every handler registered for `status`, in order
    async fn call_error_routes(&self, status: StatusCode, request: &Request, response: &Response) -> Result<()> {
        let routes = self
            .error_routes
            .get(&status)
            .ok_or(RouterError::Configuration { status })?;

        response.status(status);
        for route in routes {
            // every handler runs; only the first body sent is kept
            match route.call(request.clone(), response.clone()).await {
                Err(RouterError::AlreadySent) => {
                    debug!(status = %status, "Error route answered after the body was sent");
                }
                outcome => outcome?,
            }
        }
        Ok(())
    }

    /// Render a failure raised while error routes or the boundary were running
    ///
    /// Error routes are not re-entered. Outside [`Mode::Dev`] unexpected
    /// failures become a masked 500; configuration errors stay fatal.
    fn render_chain_failure(&self, err: RouterError, response: &Response) -> Result<()> {
        let api_error = match err {
            RouterError::Configuration { .. } => return Err(err),
            RouterError::Response(api_error) => api_error,
            err if self.mode().is_dev() => return Err(err),
            err => {
                error!(error = %err, "Error handling failed");
                ApiError::internal("Internal server error").with_internal(err.to_string())
            }
        };

        response.reset();
        response.status(api_error.status);
        response.send_json(&ErrorResponse::from(api_error))
    }
}

impl RouteRegistrar for Router {
    fn router(&mut self) -> &mut Router {
        self
    }

    fn current_group(&self) -> Option<Arc<RoutesGroup>> {
        None
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("error_routes", &self.error_routes.keys().collect::<Vec<_>>())
            .field("mode", &self.config.mode)
            .finish()
    }
}

/// Normalize a path for conflict comparison by replacing parameter names with a placeholder
fn normalize_path_for_comparison(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut in_param = false;

    for ch in path.chars() {
        match ch {
            ':' => {
                in_param = true;
                result.push_str(":_");
            }
            '/' => {
                in_param = false;
                result.push('/');
            }
            _ if in_param => {}
            _ => result.push(ch),
        }
    }

    result
}
