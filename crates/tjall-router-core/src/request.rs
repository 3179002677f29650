//! Request types for Tjall Router

use crate::error::ApiError;
use bytes::Bytes;
use http::{request::Parts, HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// HTTP Request wrapper
///
/// Cheap to clone: the request head and matched path parameters are shared,
/// the body is reference counted.
#[derive(Clone)]
pub struct Request {
    pub(crate) parts: Arc<Parts>,
    pub(crate) body: Bytes,
    pub(crate) path_params: Arc<Vec<(String, String)>>,
}

impl Request {
    /// Create a new request from parts and a fully collected body
    pub fn new(parts: Parts, body: Bytes) -> Self {
        Self {
            parts: Arc::new(parts),
            body,
            path_params: Arc::new(Vec::new()),
        }
    }

    /// Attach the parameters extracted by the matching engine
    pub(crate) fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.path_params = Arc::new(params);
        self
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Get the URI
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Get the headers
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Get the request path
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Get the query string
    pub fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// Get a path parameter by name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Path parameters in the order they appear in the template
    pub fn params(&self) -> &[(String, String)] {
        &self.path_params
    }

    /// Get the raw request body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::new(parts, body)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("params", &self.path_params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use serde::Deserialize;

    fn request(method: Method, path: &str, body: &'static str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::from_static(body.as_bytes()))
            .unwrap()
            .into()
    }

    #[test]
    fn test_param_lookup() {
        let req = request(Method::GET, "/users/7", "").with_params(vec![
            ("org".to_string(), "acme".to_string()),
            ("model_id".to_string(), "7".to_string()),
        ]);

        assert_eq!(req.param("model_id"), Some("7"));
        assert_eq!(req.param("org"), Some("acme"));
        assert_eq!(req.param("missing"), None);
        assert_eq!(req.params()[0].0, "org");
    }

    #[test]
    fn test_json_body() {
        #[derive(Debug, Deserialize)]
        struct NewUser {
            name: String,
        }

        let req = request(Method::POST, "/users/9", r#"{"name":"Ada"}"#);
        let user: NewUser = req.json().unwrap();
        assert_eq!(user.name, "Ada");

        let bad = request(Method::POST, "/users/9", "not json");
        let err = bad.json::<NewUser>().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_clone_shares_params() {
        let req = request(Method::GET, "/a?x=1", "")
            .with_params(vec![("id".to_string(), "1".to_string())]);
        let copy = req.clone();
        assert!(Arc::ptr_eq(&req.path_params, &copy.path_params));
        assert_eq!(copy.query_string(), Some("x=1"));
        assert_eq!(copy.path(), "/a");
    }
}
