//! TestClient for integration testing without network binding
//!
//! Sends simulated requests through [`Router::run`], so group middleware,
//! error routes and the error boundary all take part exactly as they do
//! behind [`serve`](crate::serve).
//!
//! # Example
//!
//! ```rust,ignore
//! use tjall_router::prelude::*;
//! use tjall_router::TestClient;
//!
//! #[tokio::test]
//! async fn test_hello() {
//!     let mut router = Router::new();
//!     router.get("/", |_req: Request, res: Response| async move { res.send_text("Hello, World!") });
//!     let client = TestClient::new(router);
//!
//!     let response = client.get("/").await;
//!     response.assert_status(StatusCode::OK);
//!     assert_eq!(response.text(), "Hello, World!");
//! }
//! ```

use crate::error::Result;
use crate::request::Request;
use crate::response::HttpResponse;
use crate::router::Router;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use http_body_util::BodyExt;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// Test client for integration testing without network binding
#[derive(Debug, Clone)]
pub struct TestClient {
    router: Arc<Router>,
}

impl TestClient {
    /// Create a new test client from a configured router
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    /// Send a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(TestRequest::get(path)).await
    }

    /// Send a POST request with JSON body
    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> TestResponse {
        self.request(TestRequest::post(path).json(body)).await
    }

    /// Send a request with full control
    ///
    /// # Panics
    ///
    /// Panics if the router aborts the dispatch, see [`TestClient::try_request`].
    pub async fn request(&self, req: TestRequest) -> TestResponse {
        let description = format!("{} {}", req.method, req.path);
        match self.try_request(req).await {
            Ok(response) => response,
            Err(err) => panic!("Router aborted {}: {}", description, err),
        }
    }

    /// Send a request, returning the router's fatal errors instead of panicking
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let err = client.try_request(TestRequest::get("/missing")).await.unwrap_err();
    /// assert!(matches!(err, RouterError::Configuration { .. }));
    /// ```
    pub async fn try_request(&self, req: TestRequest) -> Result<TestResponse> {
        let mut builder = http::Request::builder().method(req.method).uri(req.path.as_str());
        for (key, value) in req.headers.iter() {
            builder = builder.header(key, value);
        }

        let http_req = builder
            .body(req.body.unwrap_or_default())
            .unwrap_or_else(|err| panic!("Invalid test request {}: {}", req.path, err));

        let response = self.router.run(Request::from(http_req)).await?;
        Ok(TestResponse::from_response(response).await)
    }
}

/// Test request builder
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl TestRequest {
    /// Create a new request with the given method and path
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Create a GET request
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a POST request
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    /// Create a PUT request
    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Create a PATCH request
    pub fn patch(path: &str) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Create a DELETE request
    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Add a header to the request; invalid names or values are ignored
    pub fn header(mut self, key: &str, value: &str) -> Self {
        if let (Ok(name), Ok(val)) = (
            key.parse::<http::header::HeaderName>(),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, val);
        }
        self
    }

    /// Set the request body as JSON
    ///
    /// This automatically sets the Content-Type header to `application/json`.
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        if let Ok(bytes) = serde_json::to_vec(body) {
            self.body = Some(Bytes::from(bytes));
            self.headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            );
        }
        self
    }

    /// Set the request body as raw bytes
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Test response with assertion helpers
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    async fn from_response(response: HttpResponse) -> Self {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map(|b| b.to_bytes())
            .unwrap_or_default();

        Self {
            status: parts.status,
            headers: parts.headers,
            body,
        }
    }

    /// Get the response status code
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get the response headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Get the response body as bytes
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Assert that the response has the expected status code
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status<S>(&self, expected: S) -> &Self
    where
        S: TryInto<StatusCode>,
        S::Error: std::fmt::Debug,
    {
        let expected = expected
            .try_into()
            .unwrap_or_else(|err| panic!("Invalid expected status: {:?}", err));
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {}. Body: {}",
            expected, self.status, self.text()
        );
        self
    }

    /// Assert that the response has the expected header value
    pub fn assert_header(&self, key: &str, expected: &str) -> &Self {
        let actual = self
            .headers
            .get(key)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        assert_eq!(
            actual, expected,
            "Expected header '{}' to be '{}', got '{}'",
            key, expected, actual
        );
        self
    }

    /// Assert that the response body matches the expected JSON value
    pub fn assert_json<T: DeserializeOwned + PartialEq + std::fmt::Debug>(&self, expected: &T) -> &Self {
        let actual: T = self
            .json()
            .unwrap_or_else(|err| panic!("Failed to parse response body as JSON: {}", err));
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }

    /// Assert that the response body contains the expected string
    pub fn assert_body_contains(&self, expected: &str) -> &Self {
        let body = self.text();
        assert!(
            body.contains(expected),
            "Expected body to contain '{}', got '{}'",
            expected,
            body
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;
    use crate::response::Response;
    use crate::router::RouteRegistrar;
    use proptest::prelude::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        message: String,
        count: i32,
    }

    async fn hello(_req: Request, res: Response) -> Result<()> {
        res.send_text("Hello, World!")
    }

    async fn echo_body(req: Request, res: Response) -> Result<()> {
        res.send_text(String::from_utf8_lossy(req.body()).to_string())
    }

    async fn echo_json(req: Request, res: Response) -> Result<()> {
        let data: TestData = req.json()?;
        res.send_json(&data)
    }

    async fn not_found(_req: Request, res: Response) -> Result<()> {
        res.send_text("not found")
    }

    fn client_with(path: &str) -> TestClient {
        let mut router = Router::new();
        router.get(path, hello);
        router.post("/echo", echo_body);
        router.post("/echo-json", echo_json);
        router.error(StatusCode::NOT_FOUND, not_found);
        TestClient::new(router)
    }

    #[tokio::test]
    async fn test_client_get_request() {
        let response = client_with("/").get("/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text(), "Hello, World!");
    }

    #[tokio::test]
    async fn test_client_not_found_uses_error_routes() {
        let response = client_with("/").get("/nonexistent").await;
        response
            .assert_status(StatusCode::NOT_FOUND)
            .assert_body_contains("not found");
    }

    #[tokio::test]
    async fn test_client_try_request_surfaces_fatal_errors() {
        let client = TestClient::new(Router::new());
        let err = client.try_request(TestRequest::get("/")).await.unwrap_err();
        assert!(matches!(err, RouterError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_client_raw_body_and_headers() {
        let response = client_with("/")
            .request(
                TestRequest::post("/echo")
                    .header("X-Custom-Header", "test-value")
                    .body("raw body content"),
            )
            .await;

        response
            .assert_status(StatusCode::OK)
            .assert_header("content-type", "text/plain; charset=utf-8");
        assert_eq!(response.text(), "raw body content");
    }

    #[test]
    fn test_request_builder_json_sets_content_type() {
        let req = TestRequest::post("/test").json(&TestData {
            message: "test".to_string(),
            count: 1,
        });

        assert!(req.body.is_some());
        assert_eq!(req.headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(TestRequest::patch("/x").method, Method::PATCH);
        assert_eq!(TestRequest::delete("/x").method, Method::DELETE);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_json_round_trips_through_router(
            message in "[a-zA-Z0-9 ]{1,50}",
            count in 0i32..1000,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let input = TestData { message: message.clone(), count };
                let response = client_with("/").post_json("/echo-json", &input).await;

                prop_assert_eq!(response.status(), StatusCode::OK);
                let output: TestData = response.json().expect("Should parse JSON");
                prop_assert_eq!(output, input);
                Ok(())
            })?;
        }

        #[test]
        fn prop_unregistered_paths_hit_404_chain(
            registered_path in "/[a-z]{1,5}",
            unregistered_path in "/[a-z]{6,10}",
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let client = client_with(&registered_path);

                prop_assert_eq!(client.get(&registered_path).await.status(), StatusCode::OK);
                prop_assert_eq!(client.get(&unregistered_path).await.status(), StatusCode::NOT_FOUND);
                Ok(())
            })?;
        }
    }
}
