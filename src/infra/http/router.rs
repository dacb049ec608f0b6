use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware,
    response::Response,
};

use super::{
    dispatch::ServerContext,
    middleware::log_responses,
    servlet::{PageServlet, serve_page},
};
use crate::{
    application::{context::RenderContext, error::RenderError},
    config::ViewSettings,
};

const DIRECTORY_INDEX: &str = "index.html";

/// Shared state for the page-serving router.
#[derive(Clone)]
pub struct RenderState {
    pub server: Arc<dyn ServerContext>,
    pub settings: Arc<ViewSettings>,
}

impl RenderState {
    pub fn new(server: Arc<dyn ServerContext>, settings: ViewSettings) -> Self {
        Self {
            server,
            settings: Arc::new(settings),
        }
    }

    pub fn serve<B>(&self, servlet: &dyn PageServlet, request: Request<B>) -> Response {
        let (parts, _body) = request.into_parts();
        serve_page(servlet, self.server.as_ref(), &self.settings, &parts)
    }
}

/// Route every path through [`forward_request`].
pub fn build_router(state: RenderState) -> Router {
    Router::new()
        .fallback(forward_request)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
}

/// Forward the request to the page registered under its path.
pub async fn forward_request(State(state): State<RenderState>, request: Request<Body>) -> Response {
    state.serve(&forward_to_request_path, request)
}

fn forward_to_request_path(ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
    let path = dispatch_path(ctx.request_uri().path());
    ctx.forward(&path)
}

fn dispatch_path(path: &str) -> String {
    if path.ends_with('/') {
        format!("{path}{DIRECTORY_INDEX}")
    } else {
        path.to_string()
    }
}
