//! REST resource adapter
//!
//! [`ApiHandler`] turns a [`Resource`] into up to five routes under a base
//! path:
//!
//! | Operation | Method | Template |
//! |-----------|--------|----------|
//! | index  | GET   | `{base}` |
//! | find   | GET   | `{base}/{id_param}` |
//! | create | POST  | `{base}/{id_param}` |
//! | update | PUT   | `{base}/{id_param}` |
//! | edit   | PATCH | `{base}/{id_param}` |
//!
//! Mutating operations answer with the current state of the item, read back
//! through `find` after the mutation.
//!
//! # Example
//!
//! ```rust,ignore
//! struct Users(Mutex<HashMap<String, User>>);
//!
//! #[async_trait]
//! impl Resource for Users {
//!     type Model = User;
//!     type Input = User;
//!
//!     async fn index(&self) -> Result<Vec<User>> { ... }
//!     async fn find(&self, id: &str) -> Result<Option<User>> { ... }
//! }
//!
//! ApiHandler::create(Users::default(), ApiHandlerOptions::default())
//!     .set_base_path_template(&mut router, "/users");
//! ```

use crate::error::{ApiError, Result, RouterError};
use crate::path::UrlPathTemplate;
use crate::request::Request;
use crate::response::Response;
use crate::route::{MethodFilter, Route};
use crate::router::RouteRegistrar;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The operations a REST resource can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Index,
    Find,
    Create,
    Update,
    Edit,
}

impl Operation {
    /// Every operation, in registration order
    pub const ALL: [Operation; 5] = [
        Operation::Index,
        Operation::Find,
        Operation::Create,
        Operation::Update,
        Operation::Edit,
    ];

    /// HTTP method the operation is routed on
    pub fn method(self) -> MethodFilter {
        match self {
            Operation::Index | Operation::Find => MethodFilter::GET,
            Operation::Create => MethodFilter::POST,
            Operation::Update => MethodFilter::PUT,
            Operation::Edit => MethodFilter::PATCH,
        }
    }

    /// Whether the operation addresses a single item
    pub fn is_item(self) -> bool {
        !matches!(self, Operation::Index)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Index => "index",
            Operation::Find => "find",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Edit => "edit",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain object served by an [`ApiHandler`]
///
/// Every operation has a default implementation failing with an
/// unsupported-operation error; implement the ones the resource supports.
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Value sent back to clients
    type Model: Serialize + Send;
    /// Request body accepted by create, update and edit
    type Input: DeserializeOwned + Send;

    /// List every item
    async fn index(&self) -> Result<Vec<Self::Model>> {
        Err(unsupported(Operation::Index))
    }

    /// Look up one item; `None` (or a model serializing to `null`) answers 404
    async fn find(&self, _id: &str) -> Result<Option<Self::Model>> {
        Err(unsupported(Operation::Find))
    }

    /// Store a new item built from the request body
    async fn create(&self, _input: Self::Input) -> Result<()> {
        Err(unsupported(Operation::Create))
    }

    /// Replace an item
    async fn update(&self, _id: &str, _input: Self::Input) -> Result<()> {
        Err(unsupported(Operation::Update))
    }

    /// Partially modify an item
    async fn edit(&self, _id: &str, _input: Self::Input) -> Result<()> {
        Err(unsupported(Operation::Edit))
    }
}

fn unsupported(operation: Operation) -> RouterError {
    RouterError::dispatch(format!("resource does not implement `{}`", operation))
}

/// Which operations get a route
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OperationToggles {
    pub index: bool,
    pub find: bool,
    pub create: bool,
    pub update: bool,
    pub edit: bool,
}

impl Default for OperationToggles {
    fn default() -> Self {
        Self {
            index: true,
            find: true,
            create: true,
            update: true,
            edit: true,
        }
    }
}

impl OperationToggles {
    pub fn is_enabled(&self, operation: Operation) -> bool {
        match operation {
            Operation::Index => self.index,
            Operation::Find => self.find,
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Edit => self.edit,
        }
    }

    pub fn set(&mut self, operation: Operation, enabled: bool) {
        let toggle = match operation {
            Operation::Index => &mut self.index,
            Operation::Find => &mut self.find,
            Operation::Create => &mut self.create,
            Operation::Update => &mut self.update,
            Operation::Edit => &mut self.edit,
        };
        *toggle = enabled;
    }
}

/// Options of an [`ApiHandler`]
///
/// Deserializable, with every field optional:
///
/// ```json
/// { "methods": { "edit": false }, "id_param": "user_id" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiHandlerOptions {
    /// Enabled operations
    pub methods: OperationToggles,
    /// Name of the item path parameter
    pub id_param: String,
}

impl Default for ApiHandlerOptions {
    fn default() -> Self {
        Self {
            methods: OperationToggles::default(),
            id_param: "model_id".to_string(),
        }
    }
}

impl ApiHandlerOptions {
    /// Do not route the given operation
    pub fn disable(mut self, operation: Operation) -> Self {
        self.methods.set(operation, false);
        self
    }

    /// Name the item path parameter
    pub fn id_param(mut self, name: impl Into<String>) -> Self {
        self.id_param = name.into();
        self
    }
}

/// One typed call into a [`Resource`], see [`ApiHandler::call_handler`]
#[derive(Debug, Clone)]
pub enum HandlerCall<I> {
    Index,
    Find { id: String },
    Create { input: I },
    Update { id: String, input: I },
    Edit { id: String, input: I },
}

impl<I> HandlerCall<I> {
    pub fn operation(&self) -> Operation {
        match self {
            HandlerCall::Index => Operation::Index,
            HandlerCall::Find { .. } => Operation::Find,
            HandlerCall::Create { .. } => Operation::Create,
            HandlerCall::Update { .. } => Operation::Update,
            HandlerCall::Edit { .. } => Operation::Edit,
        }
    }
}

/// Routes HTTP requests to a [`Resource`]
pub struct ApiHandler<R> {
    handler: Arc<R>,
    options: Arc<ApiHandlerOptions>,
}

impl<R> Clone for ApiHandler<R> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            options: Arc::clone(&self.options),
        }
    }
}

impl<R: Resource> ApiHandler<R> {
    /// Wrap a resource. No route is registered until
    /// [`set_base_path_template`](Self::set_base_path_template) is called.
    pub fn create(handler: R, options: ApiHandlerOptions) -> Self {
        Self {
            handler: Arc::new(handler),
            options: Arc::new(options),
        }
    }

    /// The wrapped resource
    pub fn handler(&self) -> &R {
        &self.handler
    }

    pub fn options(&self) -> &ApiHandlerOptions {
        &self.options
    }

    /// Register the routes of every enabled operation under `base`
    ///
    /// Routes are bound to the registrar's group, if any.
    pub fn set_base_path_template(&self, registrar: &mut impl RouteRegistrar, base: &str) -> Vec<Arc<Route>> {
        let index = UrlPathTemplate::new(base);
        let item = UrlPathTemplate::join(index.as_str(), &format!("{{{}}}", self.options.id_param));

        Operation::ALL
            .into_iter()
            .filter(|operation| self.options.methods.is_enabled(*operation))
            .map(|operation| {
                let template = if operation.is_item() { &item } else { &index };
                let api = self.clone();
                registrar.match_route(operation.method(), template.as_str(), move |req: Request, res: Response| {
                    let api = api.clone();
                    async move { api.handle(operation, &req, &res).await }
                })
            })
            .collect()
    }

    /// Dispatch one operation to the resource
    ///
    /// Returns the JSON value of `index` and `find`; mutations return `None`.
    /// Calling a disabled operation is an error.
    pub async fn call_handler(&self, call: HandlerCall<R::Input>) -> Result<Option<serde_json::Value>> {
        let operation = call.operation();
        if !self.options.methods.is_enabled(operation) {
            return Err(RouterError::dispatch(format!(
                "operation `{}` is disabled for this resource",
                operation
            )));
        }

        debug!(operation = %operation, "Calling resource");

        match call {
            HandlerCall::Index => to_json(self.handler.index().await?).map(Some),
            HandlerCall::Find { id } => {
                let found = self.handler.find(&id).await?.map(to_json).transpose()?;
                // a null model is as absent as `None`
                Ok(found.filter(|value| !value.is_null()))
            }
            HandlerCall::Create { input } => {
                self.handler.create(input).await?;
                Ok(None)
            }
            HandlerCall::Update { id, input } => {
                self.handler.update(&id, input).await?;
                Ok(None)
            }
            HandlerCall::Edit { id, input } => {
                self.handler.edit(&id, input).await?;
                Ok(None)
            }
        }
    }

    async fn handle(&self, operation: Operation, req: &Request, res: &Response) -> Result<()> {
        match operation {
            Operation::Index => self.handle_index(req, res).await,
            Operation::Find => self.handle_find(req, res).await,
            Operation::Create => self.handle_create(req, res).await,
            Operation::Update => self.handle_update(req, res).await,
            Operation::Edit => self.handle_edit(req, res).await,
        }
    }

    /// Send the resource listing
    pub async fn handle_index(&self, _req: &Request, res: &Response) -> Result<()> {
        let items = self.call_handler(HandlerCall::Index).await?;
        res.send_json(&items.unwrap_or_default())
    }

    /// Send the item addressed by the path; 404 when absent
    pub async fn handle_find(&self, req: &Request, res: &Response) -> Result<()> {
        let id = self.model_id(req)?;
        let item = self
            .call_handler(HandlerCall::Find { id: id.clone() })
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No resource with {} `{}`", self.options.id_param, id)))?;
        res.send_json(&item)
    }

    /// Create from the body, then send the item addressed by the path
    pub async fn handle_create(&self, req: &Request, res: &Response) -> Result<()> {
        let input = req.json::<R::Input>()?;
        self.call_handler(HandlerCall::Create { input }).await?;
        self.handle_find(req, res).await
    }

    /// Replace from the body, then send the item
    pub async fn handle_update(&self, req: &Request, res: &Response) -> Result<()> {
        let id = self.model_id(req)?;
        let input = req.json::<R::Input>()?;
        self.call_handler(HandlerCall::Update { id, input }).await?;
        self.handle_find(req, res).await
    }

    /// Modify from the body, then send the item
    pub async fn handle_edit(&self, req: &Request, res: &Response) -> Result<()> {
        let id = self.model_id(req)?;
        let input = req.json::<R::Input>()?;
        self.call_handler(HandlerCall::Edit { id, input }).await?;
        self.handle_find(req, res).await
    }

    fn model_id(&self, req: &Request) -> Result<String, ApiError> {
        req.param(&self.options.id_param)
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request(format!("Missing path parameter `{}`", self.options.id_param)))
    }
}

impl<R> fmt::Debug for ApiHandler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiHandler")
            .field("options", &self.options)
            .finish()
    }
}

fn to_json<T: Serialize>(value: T) -> Result<serde_json::Value> {
    serde_json::to_value(value).map_err(RouterError::dispatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Router;
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u64,
        name: String,
    }

    #[derive(Default)]
    struct Users {
        store: Mutex<BTreeMap<String, User>>,
        finds: AtomicUsize,
    }

    impl Users {
        fn with(users: &[(u64, &str)]) -> Self {
            let store = users
                .iter()
                .map(|(id, name)| (id.to_string(), User { id: *id, name: name.to_string() }))
                .collect();
            Self {
                store: Mutex::new(store),
                finds: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Resource for Users {
        type Model = User;
        type Input = User;

        async fn index(&self) -> Result<Vec<User>> {
            Ok(self.store.lock().unwrap().values().cloned().collect())
        }

        async fn find(&self, id: &str) -> Result<Option<User>> {
            self.finds.fetch_add(1, Ordering::SeqCst);
            Ok(self.store.lock().unwrap().get(id).cloned())
        }

        async fn create(&self, input: User) -> Result<()> {
            self.store.lock().unwrap().insert(input.id.to_string(), input);
            Ok(())
        }

        async fn update(&self, id: &str, input: User) -> Result<()> {
            self.store.lock().unwrap().insert(id.to_string(), input);
            Ok(())
        }

        async fn edit(&self, id: &str, input: User) -> Result<()> {
            let mut store = self.store.lock().unwrap();
            let user = store
                .get_mut(id)
                .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))?;
            user.name = input.name;
            Ok(())
        }
    }

    /// Implements nothing but `index`
    struct ReadOnly;

    #[async_trait]
    impl Resource for ReadOnly {
        type Model = String;
        type Input = String;

        async fn index(&self) -> Result<Vec<String>> {
            Ok(vec!["only".to_string()])
        }
    }

    /// Finds a `null` document for every id
    struct Docs;

    #[async_trait]
    impl Resource for Docs {
        type Model = serde_json::Value;
        type Input = serde_json::Value;

        async fn find(&self, _id: &str) -> Result<Option<serde_json::Value>> {
            Ok(Some(serde_json::Value::Null))
        }
    }

    fn request(method: Method, path: &str, body: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::from(body.to_string()))
            .unwrap()
            .into()
    }

    async fn run(router: &Router, method: Method, path: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = router.run(request(method, path, body)).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn users_router(users: Users, options: ApiHandlerOptions) -> (Router, ApiHandler<Users>) {
        let mut router = Router::new();
        let api = ApiHandler::create(users, options);
        api.set_base_path_template(&mut router, "/users");
        (router, api)
    }

    #[test]
    fn test_registers_five_routes_by_default() {
        let mut router = Router::new();
        let routes = ApiHandler::create(Users::default(), ApiHandlerOptions::default())
            .set_base_path_template(&mut router, "/users/");

        let table: Vec<_> = routes
            .iter()
            .map(|r| (r.methods().unwrap().to_string(), r.template().unwrap().to_string()))
            .collect();
        assert_eq!(
            table,
            vec![
                ("GET".to_string(), "/users".to_string()),
                ("GET".to_string(), "/users/{model_id}".to_string()),
                ("POST".to_string(), "/users/{model_id}".to_string()),
                ("PUT".to_string(), "/users/{model_id}".to_string()),
                ("PATCH".to_string(), "/users/{model_id}".to_string()),
            ]
        );
        assert_eq!(router.routes().len(), 5);
    }

    #[test]
    fn test_disabled_operation_is_not_routed() {
        let mut router = Router::new();
        let routes = ApiHandler::create(Users::default(), ApiHandlerOptions::default().disable(Operation::Edit))
            .set_base_path_template(&mut router, "/users");

        assert_eq!(routes.len(), 4);
        assert!(routes
            .iter()
            .all(|r| r.methods() != Some(MethodFilter::PATCH)));
    }

    #[test]
    fn test_custom_id_param_and_group_prefix() {
        let mut router = Router::new();
        let api = ApiHandler::create(Users::default(), ApiHandlerOptions::default().id_param("user_id"));
        router.group_with(crate::route::RoutesGroup::new().prefix("/api"), |api_routes| {
            api.set_base_path_template(api_routes, "users");
        });

        let templates: Vec<_> = router
            .routes()
            .iter()
            .map(|r| r.template().unwrap().to_string())
            .collect();
        assert_eq!(templates[0], "/api/users");
        assert_eq!(templates[1], "/api/users/{user_id}");
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: ApiHandlerOptions = serde_json::from_str(r#"{ "methods": { "edit": false } }"#).unwrap();
        assert_eq!(options.id_param, "model_id");
        assert!(options.methods.index);
        assert!(!options.methods.edit);

        let options: ApiHandlerOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ApiHandlerOptions::default());
    }

    #[tokio::test]
    async fn test_index_sends_listing() {
        let (router, _) = users_router(Users::with(&[(1, "Ada")]), ApiHandlerOptions::default());

        let (status, body) = run(&router, Method::GET, "/users", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([{ "id": 1, "name": "Ada" }]));
    }

    #[tokio::test]
    async fn test_find_absent_is_404() {
        let (router, _) = users_router(Users::default(), ApiHandlerOptions::default());

        let (status, body) = run(&router, Method::GET, "/users/7", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found");
    }

    #[tokio::test]
    async fn test_find_null_model_is_404() {
        let mut router = Router::new();
        let api = ApiHandler::create(Docs, ApiHandlerOptions::default());
        api.set_base_path_template(&mut router, "/docs");

        let (status, body) = run(&router, Method::GET, "/docs/7", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found");

        let found = api.call_handler(HandlerCall::Find { id: "7".to_string() }).await.unwrap();
        assert_eq!(found, None);
    }

    #[tokio::test]
    async fn test_create_then_find_sends_once() {
        let (router, api) = users_router(Users::default(), ApiHandlerOptions::default());

        let (status, body) = run(&router, Method::POST, "/users/9", r#"{"id":9,"name":"Grace"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "id": 9, "name": "Grace" }));
        assert_eq!(api.handler().finds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_update_and_edit_read_back() {
        let (router, _) = users_router(Users::with(&[(3, "Linus")]), ApiHandlerOptions::default());

        let (status, body) = run(&router, Method::PUT, "/users/3", r#"{"id":3,"name":"Ken"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Ken");

        let (status, body) = run(&router, Method::PATCH, "/users/3", r#"{"id":0,"name":"Dennis"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "id": 3, "name": "Dennis" }));
    }

    #[tokio::test]
    async fn test_edit_missing_item_propagates_404() {
        let (router, _) = users_router(Users::default(), ApiHandlerOptions::default());

        let (status, _) = run(&router, Method::PATCH, "/users/5", r#"{"id":5,"name":"x"}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (router, _) = users_router(Users::default(), ApiHandlerOptions::default());

        let (status, body) = run(&router, Method::POST, "/users/1", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"].as_str().unwrap().starts_with("Invalid JSON"));
    }

    #[tokio::test]
    async fn test_call_handler() {
        let api = ApiHandler::create(Users::with(&[(1, "Ada")]), ApiHandlerOptions::default().disable(Operation::Create));

        let found = api
            .call_handler(HandlerCall::Find { id: "1".to_string() })
            .await
            .unwrap();
        assert_eq!(found, Some(serde_json::json!({ "id": 1, "name": "Ada" })));

        let absent = api
            .call_handler(HandlerCall::Find { id: "2".to_string() })
            .await
            .unwrap();
        assert_eq!(absent, None);

        let err = api
            .call_handler(HandlerCall::Create {
                input: User { id: 2, name: "Bob".to_string() },
            })
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Dispatch(_)));
    }

    #[tokio::test]
    async fn test_unimplemented_operation_fails_at_call_time() {
        let mut router = Router::new();
        let routes = ApiHandler::create(ReadOnly, ApiHandlerOptions::default()).set_base_path_template(&mut router, "/ro");
        assert_eq!(routes.len(), 5);

        let (status, body) = run(&router, Method::GET, "/ro", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!(["only"]));

        let (status, body) = run(&router, Method::GET, "/ro/1", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.to_string().contains("does not implement"));
    }
}
