use std::{fmt, marker::PhantomData};

use askama::Template;
use axum::response::{Html, IntoResponse, Response};

use crate::{
    application::{
        context::RenderContext,
        error::{HttpError, RenderError},
    },
    config::ViewSettings,
    domain::value::Markup,
    infra::http::{
        dispatch::{Page, ServerContext},
        request::HttpRequest,
        response::HttpResponse,
    },
};

/// A page whose markup comes from an askama template built against the render context.
///
/// The template is rendered to a string first and written as markup, so a failing
/// template leaves no partial output behind. Settings are inherited from the
/// dispatching render unless set with [`with_settings`](Self::with_settings).
pub struct TemplatePage<T, F> {
    build: F,
    settings: Option<ViewSettings>,
    _template: PhantomData<fn() -> T>,
}

impl<T, F> TemplatePage<T, F>
where
    T: Template,
    F: Fn(&mut RenderContext<'_>) -> Result<T, RenderError> + Send + Sync,
{
    pub fn new(build: F) -> Self {
        Self {
            build,
            settings: None,
            _template: PhantomData,
        }
    }

    pub fn with_settings(mut self, settings: ViewSettings) -> Self {
        self.settings = Some(settings);
        self
    }
}

impl<T, F> Page for TemplatePage<T, F>
where
    T: Template,
    F: Fn(&mut RenderContext<'_>) -> Result<T, RenderError> + Send + Sync,
{
    fn render(
        &self,
        server: &dyn ServerContext,
        settings: &ViewSettings,
        request: &mut dyn HttpRequest,
        response: &mut dyn HttpResponse,
    ) -> Result<(), RenderError> {
        if response.content_type().is_none() {
            response.set_content_type("text/html");
        }
        let settings = self.settings.as_ref().unwrap_or(settings).clone();
        let mut context = RenderContext::new(request, response, server, settings);
        let markup = render_template(&(self.build)(&mut context)?)?;
        context.write(markup)
    }
}

impl<T, F> fmt::Debug for TemplatePage<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplatePage")
            .field("template", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

pub fn render_template<T: Template>(template: &T) -> Result<Markup, RenderError> {
    Ok(Markup::new(template.render()?))
}

#[derive(Template)]
#[template(
    ext = "html",
    source = r#"<!DOCTYPE html>
<html>
<head><title>{{ status }} {{ reason }}</title></head>
<body>
<h1>{{ status }} {{ reason }}</h1>
<p>{{ message }}</p>
</body>
</html>
"#
)]
struct ErrorPageTemplate<'a> {
    status: u16,
    reason: &'a str,
    message: &'a str,
}

/// Answer a failed render with an HTML error page carrying the error report.
pub fn render_error_response(error: RenderError) -> Response {
    let error = HttpError::from(error);
    let status = error.status();
    let page = ErrorPageTemplate {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Error"),
        message: error.public_message(),
    };

    match page.render() {
        Ok(html) => {
            let mut response = (status, Html(html)).into_response();
            error.report().clone().attach(&mut response);
            response
        }
        Err(_) => error.into_response(),
    }
}
