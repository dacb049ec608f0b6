//! Resource lookup and internal dispatch.

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::trace;

use super::{request::HttpRequest, response::HttpResponse};
use crate::{application::error::RenderError, config::ViewSettings};

/// Something that can render into a response when dispatched to.
///
/// `settings` are the view settings of the render that dispatched here.
pub trait Page: Send + Sync {
    fn render(
        &self,
        server: &dyn ServerContext,
        settings: &ViewSettings,
        request: &mut dyn HttpRequest,
        response: &mut dyn HttpResponse,
    ) -> Result<(), RenderError>;
}

/// The host's resource namespace.
///
/// Existence and dispatchability are separate questions: a resource can exist
/// without any page able to render it.
pub trait ServerContext: Send + Sync {
    fn resource_exists(&self, path: &str) -> bool;

    fn page(&self, path: &str) -> Option<Arc<dyn Page>>;
}

/// A capability to forward or include a request into one path.
#[derive(Clone)]
pub struct DispatchHandle<'s> {
    path: String,
    page: Arc<dyn Page>,
    server: &'s dyn ServerContext,
}

impl<'s> DispatchHandle<'s> {
    /// Obtain a handle for `path`, if the server has a page for it.
    pub fn lookup(server: &'s dyn ServerContext, path: &str) -> Option<Self> {
        let page = server.page(path)?;
        Some(Self {
            path: path.to_string(),
            page,
            server,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Hand the request over to the page. Uncommitted output is discarded first.
    pub fn forward(
        &self,
        settings: &ViewSettings,
        request: &mut dyn HttpRequest,
        response: &mut dyn HttpResponse,
    ) -> Result<(), RenderError> {
        trace!(path = %self.path, "forward");
        response.reset_buffer();
        self.page.render(self.server, settings, request, response)
    }

    /// Render the page into the response after whatever is already there.
    pub fn include(
        &self,
        settings: &ViewSettings,
        request: &mut dyn HttpRequest,
        response: &mut dyn HttpResponse,
    ) -> Result<(), RenderError> {
        trace!(path = %self.path, "include");
        self.page.render(self.server, settings, request, response)
    }
}

impl fmt::Debug for DispatchHandle<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchHandle")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// In-memory [`ServerContext`] mapping absolute paths to pages.
///
/// With a resource root, files under it also count as existing resources, whether or
/// not a page is registered for them.
#[derive(Clone, Default)]
pub struct PageRegistry {
    pages: HashMap<String, Arc<dyn Page>>,
    resource_root: Option<PathBuf>,
}

impl PageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.resource_root = Some(root.into());
        self
    }

    pub fn with_page(mut self, path: impl Into<String>, page: impl Page + 'static) -> Self {
        self.register(path, page);
        self
    }

    pub fn register(&mut self, path: impl Into<String>, page: impl Page + 'static) -> &mut Self {
        self.register_shared(path, Arc::new(page))
    }

    pub fn register_shared(&mut self, path: impl Into<String>, page: Arc<dyn Page>) -> &mut Self {
        self.pages.insert(normalize_path(path.into()), page);
        self
    }

    pub fn resource_root(&self) -> Option<&Path> {
        self.resource_root.as_deref()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.pages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    fn file_exists(&self, path: &str) -> bool {
        let Some(root) = self.resource_root.as_ref() else {
            return false;
        };
        let relative = path.trim_start_matches('/');
        if relative.is_empty() || relative.contains("..") {
            return false;
        }
        root.join(relative).is_file()
    }
}

impl ServerContext for PageRegistry {
    fn resource_exists(&self, path: &str) -> bool {
        self.pages.contains_key(path) || self.file_exists(path)
    }

    fn page(&self, path: &str) -> Option<Arc<dyn Page>> {
        self.pages.get(path).cloned()
    }
}

impl fmt::Debug for PageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<_> = self.paths().collect();
        paths.sort_unstable();
        f.debug_struct("PageRegistry")
            .field("pages", &paths)
            .field("resource_root", &self.resource_root)
            .finish()
    }
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}
