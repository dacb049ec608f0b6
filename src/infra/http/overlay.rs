//! Request substitute that shadows attributes for one inner dispatch.

use std::collections::BTreeSet;

use axum::http::{HeaderMap, Method, Uri};

use super::request::{AttributeValue, Attributes, HttpRequest};
use crate::domain::locale::Locale;

/// Wraps the real request with a private attribute map.
///
/// Reads check the overlay first and fall back to the real request. Writes and removals
/// only touch the overlay, so the real request is never modified; removing an overlaid
/// name uncovers the real value again. The method always reads as `GET`.
pub struct OverlayRequest<'a> {
    inner: &'a dyn HttpRequest,
    overlay: Attributes,
}

impl<'a> OverlayRequest<'a> {
    pub fn new(inner: &'a dyn HttpRequest) -> Self {
        Self {
            inner,
            overlay: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.overlay.insert(name, value);
        self
    }
}

impl HttpRequest for OverlayRequest<'_> {
    fn method(&self) -> Method {
        Method::GET
    }

    fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn attribute(&self, name: &str) -> Option<AttributeValue> {
        self.overlay
            .get(name)
            .or_else(|| self.inner.attribute(name))
    }

    fn set_attribute(&mut self, name: &str, value: AttributeValue) {
        self.overlay.insert(name, value);
    }

    fn remove_attribute(&mut self, name: &str) -> Option<AttributeValue> {
        self.overlay.remove(name)
    }

    fn attribute_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.inner.attribute_names().into_iter().collect();
        names.extend(self.overlay.names().map(str::to_string));
        names.into_iter().collect()
    }

    fn locale(&self) -> Option<Locale> {
        self.inner.locale()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;
    use crate::infra::http::{request::attribute_value, servlet::ServletRequest};

    fn post_request() -> ServletRequest {
        let request = Request::post("/people/7?tab=bio")
            .body(())
            .expect("request");
        ServletRequest::from_request(&request)
    }

    fn read_str(request: &dyn HttpRequest, name: &str) -> Option<&'static str> {
        request
            .attribute(name)
            .and_then(|value| value.downcast_ref::<&'static str>().copied())
    }

    #[test]
    fn overlay_shadows_then_falls_back() {
        let mut real = post_request();
        real.set_attribute("title", attribute_value("real title"));
        real.set_attribute("user", attribute_value("alice"));

        let overlay = OverlayRequest::new(&real).with_attribute("title", attribute_value("shadow"));

        assert_eq!(read_str(&overlay, "title"), Some("shadow"));
        assert_eq!(read_str(&overlay, "user"), Some("alice"));
        assert_eq!(overlay.attribute_names(), ["title", "user"]);
    }

    #[test]
    fn writes_never_leak_into_the_real_request() {
        let mut real = post_request();
        real.set_attribute("x", attribute_value("before"));
        {
            let mut overlay = OverlayRequest::new(&real);
            overlay.set_attribute("x", attribute_value("during"));
            overlay.set_attribute("y", attribute_value("new"));
            assert_eq!(read_str(&overlay, "x"), Some("during"));
            overlay.remove_attribute("x");
            assert_eq!(read_str(&overlay, "x"), Some("before"));
        }
        assert_eq!(read_str(&real, "x"), Some("before"));
        assert_eq!(read_str(&real, "y"), None);
    }

    #[test]
    fn method_always_reads_as_get() {
        let real = post_request();
        assert_eq!(real.method(), Method::POST);
        let overlay = OverlayRequest::new(&real);
        assert_eq!(overlay.method(), Method::GET);
        assert_eq!(overlay.parameter("tab").as_deref(), Some("bio"));
        assert_eq!(overlay.uri().path(), "/people/7");
    }
}
