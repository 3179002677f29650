//! Route files
//!
//! A route file is a source file that declares routes against a [`Router`].
//! It registers itself at link time with [`route_file!`](crate::route_file);
//! [`Router::load_route_files`] later runs every route file whose source path
//! lies under the configured routes directory.
//!
//! ```rust,ignore
//! // src/routes/users.rs
//! use tjall_router::prelude::*;
//!
//! fn routes(router: &mut Router) {
//!     router.get("/users", list_users);
//! }
//!
//! tjall_router::route_file!(routes);
//! ```

use crate::router::Router;
use linkme::distributed_slice;
use std::path::Path;

/// A route file registered with [`route_file!`](crate::route_file)
#[derive(Clone, Copy)]
pub struct RouteFile {
    /// Source path of the declaring file, as reported by `file!()`
    pub file: &'static str,
    /// Declares the file's routes
    pub register: fn(&mut Router),
}

impl RouteFile {
    /// Whether the file lives under `dir`
    ///
    /// `file!()` paths are relative to the directory the crate was built
    /// from, so `dir` matches any trailing run of the file's components.
    /// An empty `dir` matches every file.
    pub fn is_under(&self, dir: &Path) -> bool {
        let mut file = Path::new(self.file);
        loop {
            if file.starts_with(dir) {
                return true;
            }
            let mut components = file.components();
            if components.next().is_none() {
                return false;
            }
            file = components.as_path();
        }
    }
}

impl std::fmt::Debug for RouteFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteFile").field("file", &self.file).finish()
    }
}

/// Every route file linked into the binary
#[distributed_slice]
pub static ROUTE_FILES: [RouteFile];

/// Register a function as the route file of the current source file
///
/// The function receives the [`Router`](crate::Router) being configured.
#[macro_export]
macro_rules! route_file {
    ($register:path) => {
        const _: () = {
            #[$crate::__private::linkme::distributed_slice($crate::ROUTE_FILES)]
            #[linkme(crate = $crate::__private::linkme)]
            static ROUTE_FILE: $crate::RouteFile = $crate::RouteFile {
                file: file!(),
                register: $register,
            };
        };
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::request::Request;
    use crate::response::Response;
    use crate::router::RouteRegistrar;

    async fn ping(_req: Request, res: Response) -> Result<()> {
        res.send_text("pong")
    }

    fn ping_routes(router: &mut Router) {
        router.get("/route-file/ping", ping);
    }

    crate::route_file!(ping_routes);

    fn file(path: &'static str) -> RouteFile {
        RouteFile {
            file: path,
            register: |_| {},
        }
    }

    #[test]
    fn test_is_under_matches_trailing_components() {
        let users = file("crates/app/src/routes/users.rs");
        assert!(users.is_under(Path::new("src/routes")));
        assert!(users.is_under(Path::new("app/src/routes")));
        assert!(users.is_under(Path::new("crates/app/src/routes")));
        assert!(users.is_under(Path::new("")));
        assert!(!users.is_under(Path::new("src/handlers")));
        assert!(!users.is_under(Path::new("routes/users")));
    }

    #[test]
    fn test_declared_route_file_is_linked() {
        assert!(ROUTE_FILES
            .iter()
            .any(|f| f.file.ends_with("route_file.rs")));
    }

    #[test]
    fn test_load_route_files_filters_by_dir() {
        let mut router = Router::new();
        assert_eq!(router.load_route_files(Path::new("no/such/dir")), 0);
        assert!(router.routes().is_empty());

        let loaded = router.load_route_files(Path::new("src"));
        assert!(loaded >= 1);
        assert!(router
            .routes()
            .iter()
            .any(|r| r.template().map(|t| t.as_str()) == Some("/route-file/ping")));
    }
}
