//! Response capability and the mode-exclusive output buffer behind it.

use std::{fmt, io};

use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use encoding_rs::{Encoding, UTF_8};
use tracing::debug;

use crate::{application::error::RenderError, domain::locale::Locale};

/// What a page may do to the response it renders into.
pub trait HttpResponse {
    fn status(&self) -> StatusCode;

    fn set_status(&mut self, status: StatusCode);

    fn headers(&self) -> &HeaderMap;

    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    fn content_type(&self) -> Option<&str>;

    fn set_content_type(&mut self, content_type: &str);

    /// Charset used to encode character output, when one was declared.
    fn character_encoding(&self) -> Option<&str>;

    fn locale(&self) -> Option<Locale>;

    fn set_locale(&mut self, locale: Locale);

    /// Character output. Fails once byte output has been used.
    fn writer(&mut self) -> Result<&mut dyn fmt::Write, RenderError>;

    /// Byte output. Fails once character output has been used.
    fn output_stream(&mut self) -> Result<&mut dyn io::Write, RenderError>;

    /// Commit everything written so far.
    fn flush_buffer(&mut self) -> Result<(), RenderError>;

    /// Discard uncommitted output, status, and headers.
    fn reset(&mut self);

    /// Discard uncommitted output only.
    fn reset_buffer(&mut self);

    fn is_committed(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Characters,
    Bytes,
}

#[derive(Debug, Default)]
enum BufferState {
    #[default]
    Unused,
    Characters(String),
    Bytes(Vec<u8>),
}

/// In-memory output accepting either characters or bytes, never both.
///
/// The first acquisition picks the mode for the lifetime of the buffer.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    state: BufferState,
    committed: usize,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Option<OutputMode> {
        match self.state {
            BufferState::Unused => None,
            BufferState::Characters(_) => Some(OutputMode::Characters),
            BufferState::Bytes(_) => Some(OutputMode::Bytes),
        }
    }

    pub fn writer(&mut self) -> Result<&mut String, RenderError> {
        if let BufferState::Unused = self.state {
            self.state = BufferState::Characters(String::new());
        }
        match &mut self.state {
            BufferState::Characters(text) => Ok(text),
            BufferState::Unused | BufferState::Bytes(_) => Err(RenderError::WriterStreamConflict),
        }
    }

    pub fn output_stream(&mut self) -> Result<&mut Vec<u8>, RenderError> {
        if let BufferState::Unused = self.state {
            self.state = BufferState::Bytes(Vec::new());
        }
        match &mut self.state {
            BufferState::Bytes(bytes) => Ok(bytes),
            BufferState::Unused | BufferState::Characters(_) => {
                Err(RenderError::WriterStreamConflict)
            }
        }
    }

    /// Buffered length in bytes.
    pub fn len(&self) -> usize {
        match &self.state {
            BufferState::Unused => 0,
            BufferState::Characters(text) => text.len(),
            BufferState::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn flush(&mut self) {
        self.committed = self.len();
    }

    pub fn is_committed(&self) -> bool {
        self.committed > 0
    }

    /// Drop everything written since the last flush.
    pub fn reset(&mut self) {
        match &mut self.state {
            BufferState::Unused => {}
            BufferState::Characters(text) => text.truncate(self.committed),
            BufferState::Bytes(bytes) => bytes.truncate(self.committed),
        }
    }

    /// A copy of the buffered output as text.
    pub fn to_text(&self, encoding: &'static Encoding) -> String {
        match &self.state {
            BufferState::Unused => String::new(),
            BufferState::Characters(text) => text.clone(),
            BufferState::Bytes(bytes) => {
                let (decoded, _, _) = encoding.decode(bytes);
                decoded.into_owned()
            }
        }
    }

    /// The buffered output as text, decoding bytes with `encoding`.
    pub fn into_text(self, encoding: &'static Encoding) -> String {
        match self.state {
            BufferState::Unused => String::new(),
            BufferState::Characters(text) => text,
            BufferState::Bytes(bytes) => {
                let (decoded, _, _) = encoding.decode(&bytes);
                decoded.into_owned()
            }
        }
    }

    /// The buffered output as bytes, encoding characters with `encoding`.
    pub fn into_bytes(self, encoding: &'static Encoding) -> Vec<u8> {
        match self.state {
            BufferState::Unused => Vec::new(),
            BufferState::Characters(text) => {
                if encoding == UTF_8 {
                    return text.into_bytes();
                }
                let (encoded, _, _) = encoding.encode(&text);
                encoded.into_owned()
            }
            BufferState::Bytes(bytes) => bytes,
        }
    }
}

/// Look up a charset label.
pub fn encoding_for(charset: &str) -> Option<&'static Encoding> {
    Encoding::for_label(charset.trim().as_bytes())
}

/// The encoding for a response: the declared charset if it is known, else `default`,
/// else UTF-8.
pub fn resolve_encoding(declared: Option<&str>, default: &str) -> &'static Encoding {
    if let Some(charset) = declared {
        match encoding_for(charset) {
            Some(encoding) => return encoding,
            None => debug!(charset, default, "unknown charset, using the default"),
        }
    }
    encoding_for(default).unwrap_or_else(|| {
        debug!(charset = default, "unknown default charset, using UTF-8");
        UTF_8
    })
}

/// The `charset` parameter of a content type, if present.
pub fn charset_of(content_type: &str) -> Option<&str> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"'))
        .filter(|value| !value.is_empty())
}
