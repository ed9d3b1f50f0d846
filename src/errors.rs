use std::error::Error as StdError;
use std::fmt;

/// The kind of an error.
#[derive(Debug)]
pub enum ErrorKind {
    /// Generic error
    Msg(String),
    /// An error happened while compiling a template
    Syntax {
        /// Name of the template where the error happened
        template: String,
        /// 1-indexed line of the offending tag or expression
        line: usize,
        /// What went wrong
        message: String,
    },
    /// `render` was called on an anonymous scope without a partial name
    MissingPartialName,
    /// Dynamic member resolution exhausted every tier
    NoMember(String),
    /// A partial name resolved to no template. Produced by `Rendering`
    /// collaborators and propagated unchanged.
    UnresolvedPartial(String),
    /// A template tried to iterate a value that is not a collection
    NotIterable(String),
    /// An error happened while serializing a value
    Json(serde_json::Error),
    /// This enum may grow additional variants, so matching against it
    /// outside of this crate should include a wildcard arm.
    #[doc(hidden)]
    __Nonexhaustive,
}

/// The error type of this crate.
#[derive(Debug)]
pub struct Error {
    /// The kind of the error
    pub kind: ErrorKind,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ErrorKind::Msg(ref message) => write!(f, "{}", message),
            ErrorKind::Syntax { ref template, line, ref message } => {
                write!(f, "Syntax error in template '{}' at line {}: {}", template, line, message)
            }
            ErrorKind::MissingPartialName => {
                write!(f, "A partial name must be given when rendering from an unnamed scope")
            }
            ErrorKind::NoMember(ref name) => {
                write!(f, "Member `{}` could not be resolved", name)
            }
            ErrorKind::UnresolvedPartial(ref name) => {
                write!(f, "Partial `{}` does not resolve to a template", name)
            }
            ErrorKind::NotIterable(ref what) => {
                write!(f, "Value `{}` is not iterable", what)
            }
            ErrorKind::Json(ref e) => write!(f, "{}", e),
            ErrorKind::__Nonexhaustive => write!(f, "Nonexhaustive"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|c| &**c as &(dyn StdError + 'static))
    }
}

impl Error {
    /// Creates generic error
    pub fn msg(value: impl ToString) -> Self {
        Self { kind: ErrorKind::Msg(value.to_string()), source: None }
    }

    /// Creates generic error with a cause
    pub fn chain(value: impl ToString, source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self { kind: ErrorKind::Msg(value.to_string()), source: Some(source.into()) }
    }

    /// Creates a compile-time syntax error
    pub fn syntax(template: impl ToString, line: usize, message: impl ToString) -> Self {
        Self {
            kind: ErrorKind::Syntax {
                template: template.to_string(),
                line,
                message: message.to_string(),
            },
            source: None,
        }
    }

    /// Creates a missing partial name error
    pub fn missing_partial_name() -> Self {
        Self { kind: ErrorKind::MissingPartialName, source: None }
    }

    /// Creates an unresolved member error
    pub fn no_member(name: impl ToString) -> Self {
        Self { kind: ErrorKind::NoMember(name.to_string()), source: None }
    }

    /// Creates an unresolved partial error
    pub fn partial_not_found(name: impl ToString) -> Self {
        Self { kind: ErrorKind::UnresolvedPartial(name.to_string()), source: None }
    }

    /// Creates an error for iterating a non-collection
    pub fn not_iterable(what: impl ToString) -> Self {
        Self { kind: ErrorKind::NotIterable(what.to_string()), source: None }
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Self::msg(e)
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Self::msg(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self { kind: ErrorKind::Json(e), source: None }
    }
}

/// Convenient wrapper around std::Result.
pub type Result<T> = ::std::result::Result<T, Error>;
