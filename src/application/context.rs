//! Per-request render context: view lookup, dispatch, and output helpers.

use std::{
    any::Any,
    fmt::{self, Write as _},
};

use axum::http::Uri;
use chrono_tz::Tz;
use metrics::counter;
use tracing::{debug, instrument, warn};

use crate::{
    application::{
        error::RenderError,
        format::{DateFormat, Formatters, NumberFormat, format_pattern, xml_escape},
        resolver::{ResolvedView, ViewResolver},
    },
    config::ViewSettings,
    domain::{
        locale::Locale,
        types::{Model, ModelRef, TypeDescriptor},
        value::{Number, Value},
    },
    infra::{
        http::{
            capture::CaptureResponse,
            dispatch::{DispatchHandle, ServerContext},
            overlay::OverlayRequest,
            request::{AttributeValue, HttpRequest, attribute_value},
            response::HttpResponse,
        },
        telemetry::DISPATCH_UNAVAILABLE_TOTAL,
    },
};

/// Attribute under which `view` exposes the model to the template.
pub const MODEL_ATTRIBUTE: &str = "it";

/// View name used by [`RenderContext::view_index`].
pub const DEFAULT_VIEW: &str = "index";

/// Everything a page needs while rendering one request.
///
/// A context borrows the real request and response for its whole life and owns its
/// settings, so changes made through [`settings_mut`](Self::settings_mut) stay local to
/// this render. Formatters are built from the active locale on first use.
pub struct RenderContext<'a> {
    request: &'a mut dyn HttpRequest,
    response: &'a mut dyn HttpResponse,
    server: &'a dyn ServerContext,
    settings: ViewSettings,
    formatters: Formatters,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        request: &'a mut dyn HttpRequest,
        response: &'a mut dyn HttpResponse,
        server: &'a dyn ServerContext,
        settings: ViewSettings,
    ) -> Self {
        Self {
            request,
            response,
            server,
            settings,
            formatters: Formatters::new(),
        }
    }

    pub fn request(&self) -> &dyn HttpRequest {
        &*self.request
    }

    pub fn request_mut(&mut self) -> &mut dyn HttpRequest {
        &mut *self.request
    }

    pub fn response(&self) -> &dyn HttpResponse {
        &*self.response
    }

    pub fn response_mut(&mut self) -> &mut dyn HttpResponse {
        &mut *self.response
    }

    pub fn server(&self) -> &'a dyn ServerContext {
        self.server
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ViewSettings {
        &mut self.settings
    }

    pub fn set_null_string(&mut self, null_string: impl Into<String>) {
        self.settings.null_string = null_string.into();
    }

    pub fn set_view_prefixes<I, S>(&mut self, prefixes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.view_prefixes = prefixes.into_iter().map(Into::into).collect();
    }

    pub fn set_view_suffixes<I, S>(&mut self, suffixes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.settings.view_suffixes = suffixes.into_iter().map(Into::into).collect();
    }

    // Attributes and request data.

    /// Typed read of a request attribute.
    pub fn attribute<T: Any + Clone>(&self, name: &str) -> Result<T, RenderError> {
        let value = self
            .request
            .attribute(name)
            .ok_or_else(|| RenderError::no_such_attribute(name))?;
        downcast_attribute(name, &value)
    }

    /// Typed read that falls back to `default` when the attribute is not set.
    ///
    /// An attribute holding a different type is still an error.
    pub fn attribute_or_else<T: Any + Clone>(
        &self,
        name: &str,
        default: T,
    ) -> Result<T, RenderError> {
        match self.request.attribute(name) {
            Some(value) => downcast_attribute(name, &value),
            None => Ok(default),
        }
    }

    /// The model bound to this request, stored under [`MODEL_ATTRIBUTE`].
    pub fn resource(&self) -> Result<ModelRef, RenderError> {
        self.attribute(MODEL_ATTRIBUTE)
    }

    pub fn resource_or_else(&self, default: ModelRef) -> Result<ModelRef, RenderError> {
        self.attribute_or_else(MODEL_ATTRIBUTE, default)
    }

    /// The bound model, downcast to its concrete type.
    pub fn resource_as<T: Model + Clone>(&self) -> Result<T, RenderError> {
        let model = self.resource()?;
        model
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| RenderError::attribute_type::<T>(MODEL_ATTRIBUTE))
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Any + Send + Sync) {
        self.request.set_attribute(name, attribute_value(value));
    }

    pub fn set_attribute_value(&mut self, name: &str, value: AttributeValue) {
        self.request.set_attribute(name, value);
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<AttributeValue> {
        self.request.remove_attribute(name)
    }

    pub fn parameter(&self, name: &str) -> Option<String> {
        self.request.parameter(name)
    }

    pub fn parameter_values(&self, name: &str) -> Vec<String> {
        self.request.parameter_values(name)
    }

    pub fn request_uri(&self) -> &Uri {
        self.request.uri()
    }

    /// The request's preferred locale, or the configured default.
    pub fn locale(&self) -> Locale {
        self.request
            .locale()
            .unwrap_or(self.settings.default_locale)
    }

    pub fn time_zone(&self) -> Tz {
        self.settings.time_zone
    }

    // Views.

    /// Render `model` through its `view_name` template into the real response.
    ///
    /// Pending output is flushed first. The template runs against an overlay request
    /// with the model under [`MODEL_ATTRIBUTE`] and a capture response, and only its
    /// extracted text is written back. A failed render writes nothing.
    #[instrument(skip_all, fields(view = %view_name))]
    pub fn view(&mut self, model: Option<ModelRef>, view_name: &str) -> Result<(), RenderError> {
        self.write_view(model, view_name, None)
    }

    /// [`view`](Self::view) with the default view name.
    pub fn view_index(&mut self, model: Option<ModelRef>) -> Result<(), RenderError> {
        self.view(model, DEFAULT_VIEW)
    }

    /// [`view`](Self::view), starting the type walk at `start` instead of the model's
    /// runtime type.
    #[instrument(skip_all, fields(view = %view_name, start = start.name()))]
    pub fn view_from(
        &mut self,
        model: Option<ModelRef>,
        view_name: &str,
        start: &'static TypeDescriptor,
    ) -> Result<(), RenderError> {
        self.write_view(model, view_name, Some(start))
    }

    fn write_view(
        &mut self,
        model: Option<ModelRef>,
        view_name: &str,
        start: Option<&'static TypeDescriptor>,
    ) -> Result<(), RenderError> {
        let (model, resolved) = self.resolve_view(model, view_name, start)?;
        self.response.flush_buffer()?;
        let text = self.render_captured(model, &resolved)?;
        self.out()?.write_str(&text)?;
        Ok(())
    }

    /// Render `model` through its `view_name` template and return the text without
    /// touching the real response.
    pub fn capture_view(
        &mut self,
        model: Option<ModelRef>,
        view_name: &str,
    ) -> Result<String, RenderError> {
        let (model, resolved) = self.resolve_view(model, view_name, None)?;
        self.render_captured(model, &resolved)
    }

    fn resolve_view(
        &self,
        model: Option<ModelRef>,
        view_name: &str,
        start: Option<&'static TypeDescriptor>,
    ) -> Result<(ModelRef, ResolvedView<'a>), RenderError> {
        let model = model.ok_or(RenderError::NullModel)?;
        let resolver = ViewResolver::new(
            self.server,
            &self.settings.view_prefixes,
            &self.settings.view_suffixes,
        );
        let start = start.unwrap_or_else(|| model.descriptor());
        let resolved = resolver
            .resolve_from(&*model, view_name, start)
            .ok_or_else(|| RenderError::no_view_template(model.type_name(), view_name))?;
        Ok((model, resolved))
    }

    fn render_captured(
        &mut self,
        model: ModelRef,
        resolved: &ResolvedView<'_>,
    ) -> Result<String, RenderError> {
        let mut request = OverlayRequest::new(&*self.request)
            .with_attribute(MODEL_ATTRIBUTE, attribute_value(model));
        let mut response = CaptureResponse::new(
            &mut *self.response,
            self.settings.default_character_encoding.clone(),
        );
        resolved
            .handle
            .forward(&self.settings, &mut request, &mut response)?;
        debug!(
            path = resolved.handle.path(),
            status = response.captured_status().as_u16(),
            "view captured"
        );
        Ok(response.extract_text())
    }

    // Dispatch.

    /// Render the page at `path` into the real response after the current output.
    #[instrument(skip(self))]
    pub fn include(&mut self, path: &str) -> Result<(), RenderError> {
        let handle = self.dispatch_handle(path)?;
        let (request, response) = (&mut *self.request, &mut *self.response);
        handle.include(&self.settings, request, response)
    }

    /// Hand the request to the page at `path`, discarding uncommitted output.
    #[instrument(skip(self))]
    pub fn forward(&mut self, path: &str) -> Result<(), RenderError> {
        let handle = self.dispatch_handle(path)?;
        let (request, response) = (&mut *self.request, &mut *self.response);
        handle.forward(&self.settings, request, response)
    }

    fn dispatch_handle(&self, path: &str) -> Result<DispatchHandle<'a>, RenderError> {
        DispatchHandle::lookup(self.server, path).ok_or_else(|| {
            counter!(DISPATCH_UNAVAILABLE_TOTAL).increment(1);
            warn!(path, "no dispatcher for path");
            RenderError::dispatch_unavailable(path)
        })
    }

    // Output.

    /// The real response's character output.
    pub fn out(&mut self) -> Result<&mut dyn fmt::Write, RenderError> {
        self.response.writer()
    }

    /// Display text for `value`: dates and numbers are localized, null becomes the
    /// configured null string.
    pub fn to_string(&mut self, value: impl Into<Value>) -> Result<String, RenderError> {
        match value.into() {
            Value::Null => Ok(self.settings.null_string.clone()),
            Value::Date(instant) => {
                let (locale, time_zone) = (self.locale(), self.time_zone());
                self.formatters.date(locale, time_zone).format(instant)
            }
            Value::Number(number) => {
                let locale = self.locale();
                Ok(self.formatters.number(locale).format(number))
            }
            Value::Markup(markup) => Ok(markup.into_string()),
            Value::MarkupSeq(nodes) => Ok(nodes.iter().map(|node| node.as_str()).collect()),
            Value::Text(text) => Ok(text),
        }
    }

    /// Write `value`; markup is emitted as-is and everything else as display text.
    pub fn write(&mut self, value: impl Into<Value>) -> Result<(), RenderError> {
        match value.into() {
            Value::Markup(markup) => self.out()?.write_str(markup.as_str())?,
            Value::MarkupSeq(nodes) => {
                let out = self.out()?;
                for node in &nodes {
                    out.write_str(node.as_str())?;
                }
            }
            other => {
                let text = self.to_string(other)?;
                self.out()?.write_str(&text)?;
            }
        }
        Ok(())
    }

    /// Write `value` escaped for XML; markup is emitted unescaped.
    pub fn write_xml_escape(&mut self, value: impl Into<Value>) -> Result<(), RenderError> {
        let value = value.into();
        if value.is_markup() {
            return self.write(value);
        }
        let text = xml_escape(&self.to_string(value)?);
        self.out()?.write_str(&text)?;
        Ok(())
    }

    /// Substitute `args`, rendered as display text for the active locale, into `pattern`.
    pub fn format(&mut self, pattern: &str, args: &[Value]) -> Result<String, RenderError> {
        let args = args
            .iter()
            .map(|arg| self.to_string(arg.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format_pattern(pattern, &args))
    }

    pub fn percent(&mut self, number: impl Into<Number>) -> String {
        let locale = self.locale();
        self.formatters.percent(locale).format(number.into())
    }

    // Formatters.

    pub fn number_format(&mut self) -> &NumberFormat {
        let locale = self.locale();
        self.formatters.number(locale)
    }

    pub fn percent_format(&mut self) -> &NumberFormat {
        let locale = self.locale();
        self.formatters.percent(locale)
    }

    pub fn date_format(&mut self) -> &DateFormat {
        let (locale, time_zone) = (self.locale(), self.time_zone());
        self.formatters.date(locale, time_zone)
    }

    pub fn set_number_format(&mut self, format: NumberFormat) {
        self.formatters.set_number(format);
    }

    pub fn set_percent_format(&mut self, format: NumberFormat) {
        self.formatters.set_percent(format);
    }

    pub fn set_date_format(&mut self, format: DateFormat) {
        self.formatters.set_date(format);
    }
}

impl fmt::Debug for RenderContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext")
            .field("uri", self.request.uri())
            .field("settings", &self.settings)
            .field("formatters", &self.formatters)
            .finish_non_exhaustive()
    }
}

fn downcast_attribute<T: Any + Clone>(
    name: &str,
    value: &AttributeValue,
) -> Result<T, RenderError> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| RenderError::attribute_type::<T>(name))
}
