use std::collections::BTreeMap;
use std::sync::Mutex;
use tjall_router::prelude::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

pub struct Users(Mutex<BTreeMap<String, User>>);

#[async_trait]
impl Resource for Users {
    type Model = User;
    type Input = User;

    async fn index(&self) -> Result<Vec<User>> {
        Ok(self.0.lock().unwrap().values().cloned().collect())
    }

    async fn find(&self, id: &str) -> Result<Option<User>> {
        Ok(self.0.lock().unwrap().get(id).cloned())
    }
}

fn routes(router: &mut Router) {
    let users = Users(Mutex::new(BTreeMap::from([(
        "1".to_string(),
        User {
            id: 1,
            name: "Ada".to_string(),
        },
    )])));

    router.group_with(RoutesGroup::new().prefix("/api"), |api| {
        ApiHandler::create(users, ApiHandlerOptions::default().disable(Operation::Edit))
            .set_base_path_template(api, "/users");
    });
}

tjall_router::route_file!(routes);
