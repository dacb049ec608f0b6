//! Response substitute that keeps an inner dispatch's output in memory.

use std::{fmt, io};

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

use super::response::{HttpResponse, OutputBuffer, resolve_encoding};
use crate::{application::error::RenderError, domain::locale::Locale};

/// Wraps the real response for the duration of one inner dispatch.
///
/// Writes land in a private [`OutputBuffer`]. Status, content type, locale, and buffer
/// resets are absorbed so the inner page cannot disturb the outer response. Headers
/// still pass through to the real response.
pub struct CaptureResponse<'a> {
    inner: &'a mut dyn HttpResponse,
    buffer: OutputBuffer,
    status: StatusCode,
    default_encoding: String,
}

impl<'a> CaptureResponse<'a> {
    pub fn new(inner: &'a mut dyn HttpResponse, default_encoding: impl Into<String>) -> Self {
        Self {
            inner,
            buffer: OutputBuffer::new(),
            status: StatusCode::OK,
            default_encoding: default_encoding.into(),
        }
    }

    /// Status the inner dispatch asked for. Never applied to the real response.
    pub fn captured_status(&self) -> StatusCode {
        self.status
    }

    /// Consume the capture and return what was written.
    ///
    /// Byte output is decoded with the real response's charset when it declares a known
    /// one, otherwise with the default encoding.
    pub fn extract_text(self) -> String {
        let encoding = resolve_encoding(self.inner.character_encoding(), &self.default_encoding);
        self.buffer.into_text(encoding)
    }
}

impl HttpResponse for CaptureResponse<'_> {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.inner.set_header(name, value);
    }

    fn content_type(&self) -> Option<&str> {
        self.inner.content_type()
    }

    fn set_content_type(&mut self, _content_type: &str) {}

    fn character_encoding(&self) -> Option<&str> {
        self.inner.character_encoding()
    }

    fn locale(&self) -> Option<Locale> {
        self.inner.locale()
    }

    fn set_locale(&mut self, _locale: Locale) {}

    fn writer(&mut self) -> Result<&mut dyn fmt::Write, RenderError> {
        Ok(self.buffer.writer()?)
    }

    fn output_stream(&mut self) -> Result<&mut dyn io::Write, RenderError> {
        Ok(self.buffer.output_stream()?)
    }

    fn flush_buffer(&mut self) -> Result<(), RenderError> {
        Ok(())
    }

    fn reset(&mut self) {}

    fn reset_buffer(&mut self) {}

    fn is_committed(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;
    use std::io::Write as _;

    use axum::http::header::CACHE_CONTROL;

    use super::*;
    use crate::infra::http::servlet::ServletResponse;

    #[test]
    fn writes_never_reach_the_real_response() {
        let mut real = ServletResponse::new("UTF-8");
        {
            let mut capture = CaptureResponse::new(&mut real, "UTF-8");
            capture
                .writer()
                .expect("writer")
                .write_str("<p>inner</p>")
                .expect("write");
            assert_eq!(capture.extract_text(), "<p>inner</p>");
        }
        assert!(real.buffered_text().is_empty());
    }

    #[test]
    fn output_modes_are_exclusive() {
        let mut real = ServletResponse::new("UTF-8");
        let mut capture = CaptureResponse::new(&mut real, "UTF-8");
        capture.writer().expect("writer");
        assert!(matches!(
            capture.output_stream(),
            Err(RenderError::WriterStreamConflict)
        ));

        let mut real = ServletResponse::new("UTF-8");
        let mut capture = CaptureResponse::new(&mut real, "UTF-8");
        capture.output_stream().expect("stream");
        assert!(matches!(
            capture.writer(),
            Err(RenderError::WriterStreamConflict)
        ));
    }

    #[test]
    fn status_and_content_settings_stay_local() {
        let mut real = ServletResponse::new("UTF-8");
        real.set_content_type("text/html; charset=UTF-8");
        real.set_locale(Locale::EN_GB);
        {
            let mut capture = CaptureResponse::new(&mut real, "UTF-8");
            capture.set_status(StatusCode::NOT_FOUND);
            capture.set_content_type("application/json");
            capture.set_locale(Locale::JA_JP);
            capture.reset();
            capture.reset_buffer();
            capture.set_header(CACHE_CONTROL, HeaderValue::from_static("no-store"));
            assert_eq!(capture.captured_status(), StatusCode::NOT_FOUND);
        }
        assert_eq!(real.status(), StatusCode::OK);
        assert_eq!(real.content_type(), Some("text/html; charset=UTF-8"));
        assert_eq!(real.locale(), Some(Locale::EN_GB));
        assert_eq!(
            real.headers().get(CACHE_CONTROL),
            Some(&HeaderValue::from_static("no-store"))
        );
    }

    #[test]
    fn bytes_decode_with_real_charset_or_default() {
        let mut real = ServletResponse::new("UTF-8");
        real.set_content_type("text/plain; charset=ISO-8859-1");
        let mut capture = CaptureResponse::new(&mut real, "UTF-8");
        capture
            .output_stream()
            .expect("stream")
            .write_all(&[0x6E, 0x61, 0xEF, 0x76, 0x65])
            .expect("write");
        assert_eq!(capture.extract_text(), "naïve");

        let mut real = ServletResponse::new("UTF-8");
        let mut capture = CaptureResponse::new(&mut real, "UTF-8");
        capture
            .output_stream()
            .expect("stream")
            .write_all("naïve".as_bytes())
            .expect("write");
        assert_eq!(capture.extract_text(), "naïve");
    }

    #[test]
    fn unknown_real_charset_decodes_with_the_default() {
        let mut real = ServletResponse::new("UTF-8");
        real.set_content_type("text/plain; charset=x-klingon");
        let mut capture = CaptureResponse::new(&mut real, "ISO-8859-1");
        capture
            .output_stream()
            .expect("stream")
            .write_all(&[0x6E, 0x61, 0xEF, 0x76, 0x65])
            .expect("write");
        assert_eq!(capture.extract_text(), "naïve");
    }

    #[test]
    fn unused_capture_extracts_empty_text() {
        let mut real = ServletResponse::new("UTF-8");
        let capture = CaptureResponse::new(&mut real, "UTF-8");
        assert_eq!(capture.extract_text(), "");
    }
}
