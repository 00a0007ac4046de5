use crate::core::handler::Handler;
use crate::utils::error::Result;
use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::post,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;

/// 建立把 `path` 上的 POST 交給 handler 的 router
pub fn router(handler: Arc<Handler>, path: &str) -> Router {
    Router::new()
        .route(path, post(serve_rpc))
        .with_state(handler)
}

async fn serve_rpc(State(handler): State<Arc<Handler>>, body: String) -> impl IntoResponse {
    let reply = handler.handle(&body);
    ([(CONTENT_TYPE, "text/xml")], reply)
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("XML-RPC server listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}
