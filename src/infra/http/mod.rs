//! HTTP plumbing: request/response capabilities, the capture and overlay substitutes,
//! internal dispatch, and the axum adapter.

pub mod capture;
pub mod dispatch;
mod middleware;
pub mod overlay;
pub mod request;
pub mod response;
pub mod router;
pub mod servlet;

pub use dispatch::{DispatchHandle, Page, PageRegistry, ServerContext};
pub use request::{AttributeValue, HttpRequest, attribute_value};
pub use response::HttpResponse;
pub use router::{RenderState, build_router};
pub use servlet::{PageServlet, ServletRequest, ServletResponse, serve_page};
