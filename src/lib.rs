//! # Vellum
//!
//! A template-backed view layer for Rust
//!
//! Vellum renders ERB-style templates against layered scopes. Templates are
//! compiled once through a staged pipeline and then rendered any number of
//! times; every name a template mentions resolves dynamically through its
//! scope, falling back from locals to the context object to built-in
//! aliases. Values wrapped in a [`ValuePart`] carry their own rendering
//! environment, so domain data can render its own partials.
//!
//! Interpolated output is HTML-escaped by default; only strings produced by
//! the engine itself, or explicitly marked raw in the template, bypass
//! escaping.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vellum::{locals, Engine, RenderingMissing, Scope};
//!
//! let engine = Engine::new();
//! let template = engine.compile("hello", "Hello, <%= name %>!").unwrap();
//!
//! let scope = Scope::new(None, locals! { name => "World" }, Arc::new(RenderingMissing));
//! let rendered = template.render(&scope).unwrap();
//! assert_eq!(rendered, "Hello, World!");
//! ```

mod buffer;
mod compiler;
mod errors;
mod parser;
mod part;
mod renderer;
mod rendering;
mod scope;
mod template;
mod utils;
mod value;

// Library exports.

pub use crate::buffer::{Chunk, EscapingBuffer, SafeString};
pub use crate::compiler::{BlockFilter, Engine, EscapeFilter, Filter, TrimFilter};
pub use crate::errors::{Error, ErrorKind, Result};
pub use crate::parser::ast::{BinOp, BlockHead, Call, Expr, Node};
pub use crate::part::{Part, ValuePart};
pub use crate::rendering::{
    BlockFn, ContextObject, DefaultInflector, EmptyContext, Inflector, Rendering, RenderingMissing,
};
pub use crate::scope::{PartialName, Scope};
pub use crate::template::Template;
pub use crate::utils::escape_html;
pub use crate::value::{Locals, ScopeValue};
