use tjall_router::prelude::*;

async fn health(_req: Request, res: Response) -> Result<()> {
    res.send_json(&serde_json::json!({ "status": "ok" }))
}

async fn not_found(req: Request, res: Response) -> Result<()> {
    res.send_json(&serde_json::json!({ "missing": req.path() }))
}

fn routes(router: &mut Router) {
    router.get("/health", health);
    router.error(StatusCode::NOT_FOUND, not_found);
}

tjall_router::route_file!(routes);
