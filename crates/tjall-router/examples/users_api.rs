//! A small users API
//!
//! ```text
//! TJALL_MODE=dev cargo run -p tjall-router --example users_api
//! curl localhost:8080/api/users
//! curl -X POST localhost:8080/api/users/2 -d '{"id":2,"name":"Grace"}'
//! ```

use std::collections::BTreeMap;
use std::sync::RwLock;
use tjall_router::prelude::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: u64,
    name: String,
}

#[derive(Default)]
struct Users(RwLock<BTreeMap<String, User>>);

#[async_trait]
impl Resource for Users {
    type Model = User;
    type Input = User;

    async fn index(&self) -> Result<Vec<User>> {
        let users = self.0.read().map_err(|_| RouterError::dispatch("users lock poisoned"))?;
        Ok(users.values().cloned().collect())
    }

    async fn find(&self, id: &str) -> Result<Option<User>> {
        let users = self.0.read().map_err(|_| RouterError::dispatch("users lock poisoned"))?;
        Ok(users.get(id).cloned())
    }

    async fn create(&self, input: User) -> Result<()> {
        let mut users = self.0.write().map_err(|_| RouterError::dispatch("users lock poisoned"))?;
        users.insert(input.id.to_string(), input);
        Ok(())
    }

    async fn update(&self, id: &str, input: User) -> Result<()> {
        let mut users = self.0.write().map_err(|_| RouterError::dispatch("users lock poisoned"))?;
        if !users.contains_key(id) {
            return Err(ApiError::not_found(format!("User {} not found", id)).into());
        }
        users.insert(id.to_string(), input);
        Ok(())
    }
}

async fn require_json(req: Request, res: Response, next: Next) -> Result<()> {
    let has_body = !req.body().is_empty();
    let is_json = req
        .headers()
        .get(http::header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));

    if has_body && !is_json {
        return Err(ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "unsupported_media_type",
            "Expected application/json",
        )
        .into());
    }
    next(req, res).await
}

async fn not_found(req: Request, res: Response) -> Result<()> {
    res.send_json(&serde_json::json!({
        "error": { "type": "not_found", "message": format!("Nothing at {}", req.path()) }
    }))
}

#[tokio::main]
async fn main() -> std::result::Result<(), BoxError> {
    let config = RouterConfig::from_env()?;
    init_tracing(&config);

    let mut router = Router::configure(&config);
    router.group_with(RoutesGroup::new().prefix("/api").layer(from_fn(require_json)), |api| {
        ApiHandler::create(Users::default(), ApiHandlerOptions::default().disable(Operation::Edit))
            .set_base_path_template(api, "/users");
    });
    router.error(StatusCode::NOT_FOUND, not_found);

    serve(router, &config.addr).await
}
