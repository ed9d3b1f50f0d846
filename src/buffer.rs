use std::fmt;

use crate::utils::escape_html;

/// A string that is already safe for HTML output and must not be escaped
/// again when appended to an [`EscapingBuffer`].
///
/// Rendered partial output is the main producer: it has already been routed
/// through a buffer once, so interpolating it into an enclosing template
/// must not double-escape it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SafeString(String);

impl SafeString {
    /// Marks `content` as safe. The caller asserts that the content either
    /// contains no HTML-significant characters or was escaped already.
    pub fn new(content: impl Into<String>) -> Self {
        SafeString(content.into())
    }

    /// The safe content as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SafeString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SafeString> for String {
    fn from(s: SafeString) -> String {
        s.0
    }
}

impl PartialEq<&str> for SafeString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<SafeString> for &str {
    fn eq(&self, other: &SafeString) -> bool {
        *self == other.0
    }
}

/// A value on its way into the buffer, tagged with whether it still needs
/// escaping.
#[derive(Clone, Debug, PartialEq)]
pub enum Chunk {
    /// Pre-escaped content, appended verbatim
    Safe(SafeString),
    /// Untrusted text, escaped on append
    Text(String),
}

/// The output accumulator of compiled templates and the sole sanitization
/// boundary: every piece of render output passes through here, and anything
/// not explicitly marked safe is HTML-escaped on append.
#[derive(Debug, Default)]
pub struct EscapingBuffer {
    out: String,
}

impl EscapingBuffer {
    pub fn new() -> Self {
        EscapingBuffer { out: String::new() }
    }

    /// Appends a chunk, escaping it unless it is already marked safe.
    pub fn append(&mut self, chunk: Chunk) {
        match chunk {
            Chunk::Safe(s) => self.out.push_str(s.as_str()),
            Chunk::Text(s) => self.out.push_str(&escape_html(&s)),
        }
    }

    /// Appends verbatim, bypassing escaping.
    ///
    /// Only for literal template text known at compile time to be safe, or
    /// for expressions explicitly marked raw.
    pub fn append_safe(&mut self, content: &str) {
        self.out.push_str(content);
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    /// Consumes the buffer, returning the accumulated content.
    pub fn into_string(self) -> String {
        self.out
    }

    /// Consumes the buffer as pre-escaped output, ready to be interpolated
    /// into an enclosing template.
    pub fn into_safe(self) -> SafeString {
        SafeString(self.out)
    }
}
