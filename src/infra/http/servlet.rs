//! Concrete request/response pair backing a render on top of axum's `http` types.

use std::{fmt, io};

use axum::{
    body::Body,
    http::{
        HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode, Uri,
        header::{CONTENT_LANGUAGE, CONTENT_TYPE},
        request::Parts,
    },
    response::{IntoResponse, Response},
};
use encoding_rs::Encoding;
use tracing::{debug, error, warn};

use super::{
    dispatch::ServerContext,
    request::{AttributeValue, Attributes, HttpRequest},
    response::{
        HttpResponse, OutputBuffer, OutputMode, charset_of, encoding_for, resolve_encoding,
    },
};
use crate::{
    application::{context::RenderContext, error::RenderError},
    config::ViewSettings,
    domain::locale::Locale,
    presentation::views::render_error_response,
};

const DEFAULT_CONTENT_TYPE: &str = "text/html";

/// Request data copied out of an incoming HTTP request, plus its attribute store.
#[derive(Debug, Clone)]
pub struct ServletRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    attributes: Attributes,
}

impl ServletRequest {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            headers: request.headers().clone(),
            attributes: Attributes::new(),
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.insert(name, value);
        self
    }
}

impl HttpRequest for ServletRequest {
    fn method(&self) -> Method {
        self.method.clone()
    }

    fn uri(&self) -> &Uri {
        &self.uri
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.attributes.get(name)
    }

    fn set_attribute(&mut self, name: &str, value: AttributeValue) {
        self.attributes.insert(name, value);
    }

    fn remove_attribute(&mut self, name: &str) -> Option<AttributeValue> {
        self.attributes.remove(name)
    }

    fn attribute_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.attributes.names().map(str::to_string).collect();
        names.sort_unstable();
        names
    }
}

/// Buffered response that becomes an axum [`Response`] once rendering is done.
#[derive(Debug)]
pub struct ServletResponse {
    status: StatusCode,
    headers: HeaderMap,
    content_type: Option<String>,
    character_encoding: Option<String>,
    locale: Option<Locale>,
    buffer: OutputBuffer,
    default_encoding: String,
}

impl ServletResponse {
    pub fn new(default_encoding: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            content_type: None,
            character_encoding: None,
            locale: None,
            buffer: OutputBuffer::new(),
            default_encoding: default_encoding.into(),
        }
    }

    fn charset(&self) -> &str {
        self.character_encoding
            .as_deref()
            .unwrap_or(&self.default_encoding)
    }

    fn encoding(&self) -> &'static Encoding {
        resolve_encoding(self.character_encoding.as_deref(), &self.default_encoding)
    }

    /// Everything written so far, committed or not.
    pub fn buffered_text(&self) -> String {
        self.buffer.to_text(self.encoding())
    }

    fn content_type_header(&self) -> String {
        let content_type = self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);
        let wants_charset = self.buffer.mode() != Some(OutputMode::Bytes)
            && charset_of(content_type).is_none()
            && content_type.starts_with("text/");
        if wants_charset {
            format!("{content_type}; charset={}", self.charset())
        } else {
            content_type.to_string()
        }
    }
}

impl HttpResponse for ServletResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn set_content_type(&mut self, content_type: &str) {
        match charset_of(content_type) {
            Some(charset) if encoding_for(charset).is_some() => {
                self.character_encoding = Some(charset.to_string());
                self.content_type = Some(content_type.to_string());
            }
            Some(charset) => {
                debug!(charset, "ignoring unknown charset in content type");
                self.content_type = Some(without_charset(content_type));
            }
            None => self.content_type = Some(content_type.to_string()),
        }
    }

    fn character_encoding(&self) -> Option<&str> {
        self.character_encoding.as_deref()
    }

    fn locale(&self) -> Option<Locale> {
        self.locale
    }

    fn set_locale(&mut self, locale: Locale) {
        self.locale = Some(locale);
    }

    fn writer(&mut self) -> Result<&mut dyn fmt::Write, RenderError> {
        Ok(self.buffer.writer()?)
    }

    fn output_stream(&mut self) -> Result<&mut dyn io::Write, RenderError> {
        Ok(self.buffer.output_stream()?)
    }

    fn flush_buffer(&mut self) -> Result<(), RenderError> {
        self.buffer.flush();
        Ok(())
    }

    fn reset(&mut self) {
        self.buffer.reset();
        if !self.buffer.is_committed() {
            self.status = StatusCode::OK;
            self.headers.clear();
        }
    }

    fn reset_buffer(&mut self) {
        self.buffer.reset();
    }

    fn is_committed(&self) -> bool {
        self.buffer.is_committed()
    }
}

impl IntoResponse for ServletResponse {
    fn into_response(self) -> Response {
        let content_type = self.content_type_header();
        let encoding = self.encoding();
        let Self {
            status,
            mut headers,
            locale,
            buffer,
            ..
        } = self;

        match HeaderValue::from_str(&content_type) {
            Ok(value) => {
                headers.insert(CONTENT_TYPE, value);
            }
            Err(err) => warn!(content_type, error = %err, "dropping invalid content type"),
        }
        if let Some(locale) = locale
            && let Ok(value) = HeaderValue::from_str(locale.tag())
        {
            headers.insert(CONTENT_LANGUAGE, value);
        }

        let mut response = Response::new(Body::from(buffer.into_bytes(encoding)));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        response
    }
}

fn without_charset(content_type: &str) -> String {
    content_type
        .split(';')
        .filter(|param| {
            param
                .split_once('=')
                .is_none_or(|(key, _)| !key.trim().eq_ignore_ascii_case("charset"))
        })
        .collect::<Vec<_>>()
        .join(";")
        .trim()
        .to_string()
}

/// A render callback run against a fresh [`RenderContext`] for one HTTP request.
pub trait PageServlet: Send + Sync {
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError>;
}

impl<F> PageServlet for F
where
    F: Fn(&mut RenderContext<'_>) -> Result<(), RenderError> + Send + Sync,
{
    fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), RenderError> {
        self(ctx)
    }
}

/// Run `servlet` for one request and turn the outcome into an HTTP response.
///
/// A failed render discards whatever the servlet wrote and answers with an error page
/// carrying the error's status and public message.
pub fn serve_page(
    servlet: &dyn PageServlet,
    server: &dyn ServerContext,
    settings: &ViewSettings,
    request: &Parts,
) -> Response {
    let mut servlet_request = ServletRequest::from_parts(request);
    let mut servlet_response = ServletResponse::new(settings.default_character_encoding.clone());

    let result = {
        let mut ctx = RenderContext::new(
            &mut servlet_request,
            &mut servlet_response,
            server,
            settings.clone(),
        );
        servlet.render(&mut ctx)
    };

    match result {
        Ok(()) => servlet_response.into_response(),
        Err(err) => {
            if !matches!(err, RenderError::DispatchUnavailable { .. }) {
                error!(path = %request.uri.path(), error = %err, "page render failed");
            }
            render_error_response(err)
        }
    }
}
