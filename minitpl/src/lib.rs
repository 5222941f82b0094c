//! minitpl is a tiny HTML template engine in which templates embed
//! JavaScript-style expressions and control flow between `<%` and `%>`.
//!
//! ```html
//! <ul>
//! <% for (var i = 0; i < users.length; i++) { %>
//!   <li><% users[i].name %></li>
//! <% } %>
//! </ul>
//! ```
//!
//! A template is made of literal text and fragments.  A fragment that
//! contains a block brace is a control fragment (`if (c) {`, `} else {`,
//! `while (c) {`, `for (...) {` or a lone `}`), every other fragment is an
//! expression whose value is HTML escaped and written to the output.
//! Expressions refer to the entries of the render [`Context`] as free
//! variables.
//!
//! # Rendering
//!
//! For the common case of rendering a string once the [`render`] function
//! can be used:
//!
//! ```
//! use minitpl::context;
//!
//! let mut ctx = context!(name => "<b>World</b>");
//! let rv = minitpl::render("<p>Hello <% name %></p>", &mut ctx).unwrap();
//! assert_eq!(rv, "<p>Hello &#60;b&#62;World&#60;/b&#62;</p>");
//! ```
//!
//! Templates that are rendered more than once can be compiled ahead of time
//! with an [`Environment`]:
//!
//! ```
//! use minitpl::{context, Environment};
//!
//! let env = Environment::new();
//! let tmpl = env.compile("<% items.join(', ') %>").unwrap();
//! let rv = tmpl.render(&mut context!(items => vec!["a", "b"])).unwrap();
//! assert_eq!(rv, "a, b");
//! ```
//!
//! # Whitespace
//!
//! Before a template is scanned all newlines and carriage returns are
//! removed and every run of two or more whitespace characters is dropped.
//! Single spaces survive.  Note that if the last fragment is followed by
//! exactly one character, that character is not emitted.
//!
//! # Escaping
//!
//! Expression values are escaped with [`escape_html`] which replaces `"`,
//! `&`, `'`, `<` and `>` with numeric character references.  The escaper is
//! also stored in the context under [`ESCAPER_KEY`] (`escapeHTML`) so it can
//! be called explicitly from a template.
//!
//! # Error Handling
//!
//! Errors are never caught or annotated by the engine.  Syntax errors
//! (including unbalanced blocks) are reported when a template is compiled,
//! everything else when it runs.  See [`Error`] and [`ErrorKind`].
//!
//! # Optional Features
//!
//! - `builtins`: enabled by default.  Provides the built-in string and
//!   array methods (`toUpperCase`, `join`, `slice`, ...).
//! - `fuel`: makes the engine track fuel consumption so that templates that
//!   loop forever can be stopped.  See [`Environment::set_fuel`].
//! - `unicode`: allows Unicode identifiers.  Without it only ASCII
//!   identifiers (plus `$` and `_`) are supported.
//! - `preserve_order`: objects keep the insertion order of their keys.
//! - `tracing`: emits log events through the `tracing` crate.
//! - `unstable_machinery`: exposes an unstable internal API (no semver
//!   guarantees) to scan and parse templates and to interact with the
//!   engine internals.
#![allow(clippy::cognitive_complexity)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

#[macro_use]
mod macros;
#[macro_use]
mod tracing_macros;

mod compiler;
mod context;
mod environment;
mod error;
mod output;
mod template;
mod utils;
mod vm;

pub mod value;

use std::fmt;

pub use self::context::Context;
pub use self::environment::Environment;
pub use self::error::{Error, ErrorKind};
pub use self::template::Template;
pub use self::utils::{escape_html, escape_value, ESCAPER_KEY};

#[doc(hidden)]
pub use self::macros::__context;

/// Renders a template against a context.
///
/// This compiles the template with a default [`Environment`] and renders it
/// right away.  The context is extended with the escaper under
/// [`ESCAPER_KEY`] before anything else happens, so it is updated even if
/// the template fails to compile.
///
/// ```
/// # use minitpl::{render, context};
/// let mut ctx = context!(n => 5);
/// assert_eq!(render("<% n %>", &mut ctx).unwrap(), "5");
/// assert_eq!(render("<% for (var i = 0; i < 3; i++) { %>x<% } %>", &mut ctx).unwrap(), "xxx");
/// ```
pub fn render<T: fmt::Display + ?Sized>(template: &T, ctx: &mut Context) -> Result<String, Error> {
    Environment::new().render_str(&template.to_string(), ctx)
}

/// This module gives access to the low level machinery.
///
/// This module is only provided by the `unstable_machinery` feature and does not
/// have a stable interface.  It mostly exists for internal testing purposes and
/// for debugging.
#[cfg(feature = "unstable_machinery")]
#[cfg_attr(docsrs, doc(cfg(feature = "unstable_machinery")))]
pub mod machinery {
    #![allow(missing_docs)]
    pub use crate::compiler::ast;
    pub use crate::compiler::codegen::{generate, CodeGenerator};
    pub use crate::compiler::lexer::{normalize, scan, tokenize, Scanner, Segment, Tokenizer};
    pub use crate::compiler::parser::{parse_expr, parse_fragment, parse_steps};
    pub use crate::compiler::tokens::Token;
    pub use crate::output::Output;
    pub use crate::vm::Vm;

    /// Returns the procedure of a compiled [`Template`](crate::Template).
    pub fn get_procedure<'x>(tmpl: &'x crate::Template<'_>) -> &'x ast::Procedure {
        &tmpl.procedure
    }

    /// Creates an [`Output`] that writes into a string.
    pub fn make_string_output(s: &mut String) -> Output<'_> {
        Output::new(s)
    }
}
