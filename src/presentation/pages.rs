//! Pages the dispatcher can forward to: render functions and files on disk.

use std::{
    fmt::{self, Write as _},
    io::Write as _,
    path::Path,
};

use bytes::Bytes;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::{
    application::{context::RenderContext, error::RenderError},
    config::ViewSettings,
    infra::{
        error::InfraError,
        http::{
            dispatch::{Page, PageRegistry, ServerContext},
            request::HttpRequest,
            response::HttpResponse,
        },
    },
};

/// A page backed by a render function that receives its own [`RenderContext`].
///
/// The context inherits the settings of the render that dispatched here unless the
/// page carries its own.
pub struct ContextPage<F> {
    render: F,
    settings: Option<ViewSettings>,
}

impl<F> ContextPage<F>
where
    F: Fn(&mut RenderContext<'_>) -> Result<(), RenderError> + Send + Sync,
{
    pub fn new(render: F) -> Self {
        Self {
            render,
            settings: None,
        }
    }

    pub fn with_settings(mut self, settings: ViewSettings) -> Self {
        self.settings = Some(settings);
        self
    }
}

impl<F> Page for ContextPage<F>
where
    F: Fn(&mut RenderContext<'_>) -> Result<(), RenderError> + Send + Sync,
{
    fn render(
        &self,
        server: &dyn ServerContext,
        settings: &ViewSettings,
        request: &mut dyn HttpRequest,
        response: &mut dyn HttpResponse,
    ) -> Result<(), RenderError> {
        let settings = self.settings.as_ref().unwrap_or(settings).clone();
        let mut context = RenderContext::new(request, response, server, settings);
        (self.render)(&mut context)
    }
}

impl<F> fmt::Debug for ContextPage<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextPage")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// A file served as-is. Text is written through the character writer so it can be
/// included into other output; everything else goes to the byte stream.
#[derive(Debug, Clone)]
pub struct StaticPage {
    body: Bytes,
    content_type: String,
}

impl StaticPage {
    pub fn new(body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
        }
    }

    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let body = std::fs::read(path)?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Ok(Self::new(body, content_type))
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    fn text(&self) -> Option<&str> {
        if !self.content_type.starts_with("text/") {
            return None;
        }
        std::str::from_utf8(&self.body).ok()
    }
}

impl Page for StaticPage {
    fn render(
        &self,
        _server: &dyn ServerContext,
        _settings: &ViewSettings,
        _request: &mut dyn HttpRequest,
        response: &mut dyn HttpResponse,
    ) -> Result<(), RenderError> {
        if response.content_type().is_none() {
            response.set_content_type(&self.content_type);
        }
        match self.text() {
            Some(text) => response.writer()?.write_str(text)?,
            None => response.output_stream()?.write_all(&self.body)?,
        }
        Ok(())
    }
}

/// Register every file under `root` as a [`StaticPage`] at its root-relative path.
///
/// The registry keeps `root` as its resource root, so files count as existing
/// resources for view lookup.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn load_static_pages(root: &Path) -> Result<PageRegistry, InfraError> {
    let mut registry = PageRegistry::new().with_resource_root(root);

    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let Some(path) = resource_path(relative) else {
            debug!(file = %entry.path().display(), "skipping file with a non-UTF-8 name");
            continue;
        };

        let page = StaticPage::from_file(entry.path())?;
        debug!(path = %path, content_type = page.content_type(), "registered static page");
        registry.register(path, page);
    }

    info!(pages = registry.len(), "static pages loaded");
    Ok(registry)
}

fn resource_path(relative: &Path) -> Option<String> {
    let mut path = String::new();
    for component in relative.components() {
        path.push('/');
        path.push_str(component.as_os_str().to_str()?);
    }
    Some(path)
}
