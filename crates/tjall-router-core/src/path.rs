//! URL path templates
//!
//! Templates use `{param}` placeholders:
//!
//! - `/users` - Static path
//! - `/users/{model_id}` - Single parameter
//! - `/orgs/{org}/users/{model_id}` - Multiple parameters
//!
//! A [`UrlPathTemplate`] is always normalized: exactly one leading slash, no
//! empty segments, no trailing slash (except the root `/`).

use std::fmt;

/// A normalized route path template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlPathTemplate(String);

impl UrlPathTemplate {
    /// Normalize a raw template
    pub fn new(template: &str) -> Self {
        Self(normalize_path(template))
    }

    /// Append a segment to a base template
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let item = UrlPathTemplate::join("/users/", "{model_id}");
    /// assert_eq!(item.as_str(), "/users/{model_id}");
    /// ```
    pub fn join(base: &str, append: &str) -> Self {
        Self::new(&format!("{}/{}", base, append))
    }

    /// The normalized template
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parameter names in the order they appear
    pub fn param_names(&self) -> Vec<&str> {
        self.0
            .split('/')
            .filter_map(|segment| segment.strip_prefix('{')?.strip_suffix('}'))
            .collect()
    }

    /// The template in the matching engine's `:param` syntax
    pub(crate) fn to_matcher_path(&self) -> String {
        convert_path_params(&self.0)
    }
}

impl fmt::Display for UrlPathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UrlPathTemplate {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

/// Convert {param} style to :param for matchit
fn convert_path_params(path: &str) -> String {
    let mut result = String::with_capacity(path.len());

    for ch in path.chars() {
        match ch {
            '{' => result.push(':'),
            '}' => {}
            _ => result.push(ch),
        }
    }

    result
}

/// Normalize a path.
///
/// Ensures the path:
/// - Starts with exactly one leading slash
/// - Has no trailing slash (unless it's just "/")
/// - Has no double slashes
pub(crate) fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.is_empty() {
        return "/".to_string();
    }

    let mut result = String::with_capacity(path.len() + 1);
    for segment in segments {
        result.push('/');
        result.push_str(segment);
    }

    result
}

/// Trim a trailing slash from an incoming request path, so `/users/` matches `/users`
pub(crate) fn trim_request_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}
