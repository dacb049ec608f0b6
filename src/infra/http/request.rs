//! Request capability seen by pages and render contexts.

use std::{any::Any, collections::HashMap, fmt, sync::Arc};

use axum::http::{HeaderMap, Method, Uri, header::ACCEPT_LANGUAGE};

use crate::domain::locale::Locale;

/// A request-scoped attribute value.
pub type AttributeValue = Arc<dyn Any + Send + Sync>;

/// Wrap any shareable value as an attribute.
pub fn attribute_value<T: Any + Send + Sync>(value: T) -> AttributeValue {
    Arc::new(value)
}

/// Named attribute store.
#[derive(Clone, Default)]
pub struct Attributes {
    entries: HashMap<String, AttributeValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<AttributeValue> {
        self.entries.get(name).cloned()
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: AttributeValue,
    ) -> Option<AttributeValue> {
        self.entries.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeValue> {
        self.entries.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Attributes").field("names", &names).finish()
    }
}

/// What a page may ask of the request it is rendering for.
pub trait HttpRequest {
    fn method(&self) -> Method;

    fn uri(&self) -> &Uri;

    fn headers(&self) -> &HeaderMap;

    fn attribute(&self, name: &str) -> Option<AttributeValue>;

    fn set_attribute(&mut self, name: &str, value: AttributeValue);

    fn remove_attribute(&mut self, name: &str) -> Option<AttributeValue>;

    fn attribute_names(&self) -> Vec<String>;

    /// Preferred display locale from `Accept-Language`, if any entry is supported.
    ///
    /// Repeated header lines are ranked together as one list.
    fn locale(&self) -> Option<Locale> {
        let header = self
            .headers()
            .get_all(ACCEPT_LANGUAGE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join(",");
        Locale::from_accept_language(&header)
    }

    /// All decoded query-string values for `name`, in order.
    fn parameter_values(&self, name: &str) -> Vec<String> {
        let Some(query) = self.uri().query() else {
            return Vec::new();
        };
        url::form_urlencoded::parse(query.as_bytes())
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
            .collect()
    }

    fn parameter(&self, name: &str) -> Option<String> {
        self.parameter_values(name).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bare {
        uri: Uri,
        headers: HeaderMap,
    }

    impl HttpRequest for Bare {
        fn method(&self) -> Method {
            Method::GET
        }

        fn uri(&self) -> &Uri {
            &self.uri
        }

        fn headers(&self) -> &HeaderMap {
            &self.headers
        }

        fn attribute(&self, _name: &str) -> Option<AttributeValue> {
            None
        }

        fn set_attribute(&mut self, _name: &str, _value: AttributeValue) {}

        fn remove_attribute(&mut self, _name: &str) -> Option<AttributeValue> {
            None
        }

        fn attribute_names(&self) -> Vec<String> {
            Vec::new()
        }
    }

    fn bare(uri: &str, accept_language: Option<&str>) -> Bare {
        let mut headers = HeaderMap::new();
        if let Some(value) = accept_language {
            headers.insert(ACCEPT_LANGUAGE, value.parse().expect("header value"));
        }
        Bare {
            uri: uri.parse().expect("uri"),
            headers,
        }
    }

    #[test]
    fn parameters_are_decoded_in_order() {
        let request = bare("/search?q=caf%C3%A9&tag=a&tag=b+c", None);
        assert_eq!(request.parameter("q").as_deref(), Some("café"));
        assert_eq!(request.parameter_values("tag"), ["a", "b c"]);
        assert_eq!(request.parameter("missing"), None);
    }

    #[test]
    fn locale_comes_from_accept_language() {
        assert_eq!(
            bare("/", Some("de-CH, en;q=0.5")).locale(),
            Some(Locale::DE_DE)
        );
        assert_eq!(bare("/", None).locale(), None);
    }

    #[test]
    fn repeated_accept_language_lines_rank_together() {
        let mut request = bare("/", Some("fr-FR;q=0.3"));
        let value = "de-DE;q=0.9".parse().expect("header value");
        request.headers.append(ACCEPT_LANGUAGE, value);
        assert_eq!(request.locale(), Some(Locale::DE_DE));
    }

    #[test]
    fn attributes_debug_lists_sorted_names() {
        let mut attributes = Attributes::new();
        attributes.insert("b", attribute_value(1_u8));
        attributes.insert("a", attribute_value("x"));
        assert_eq!(
            format!("{attributes:?}"),
            r#"Attributes { names: ["a", "b"] }"#
        );
    }
}
