use std::{fmt, io};

use crate::compiler::ast::Procedure;
use crate::context::Context;
use crate::environment::Environment;
use crate::error::Error;
use crate::output::{Output, WriteWrapper};
use crate::vm::Vm;

/// Represents a compiled template.
///
/// Templates are created with [`Environment::compile`] and can be rendered
/// any number of times against different contexts.
pub struct Template<'env> {
    env: &'env Environment,
    source: String,
    pub(crate) procedure: Procedure,
}

impl fmt::Debug for Template<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("source", &self.source)
            .field("env", &self.env)
            .finish()
    }
}

impl<'env> Template<'env> {
    pub(crate) fn new(env: &'env Environment, source: String, procedure: Procedure) -> Self {
        Template {
            env,
            source,
            procedure,
        }
    }

    /// Renders the template into a string.
    ///
    /// The escaper is stored in the context under
    /// [`ESCAPER_KEY`](crate::ESCAPER_KEY) before the template runs.  Apart
    /// from that the context is only read.
    ///
    /// ```
    /// # use minitpl::{Environment, context};
    /// let env = Environment::new();
    /// let tmpl = env.compile("<% for (var i = 0; i < n; i++) { %>x<% } %>").unwrap();
    /// assert_eq!(tmpl.render(&mut context!(n => 3)).unwrap(), "xxx");
    /// ```
    pub fn render(&self, ctx: &mut Context) -> Result<String, Error> {
        self.env.inject_escaper(ctx);
        self._render(ctx)
    }

    /// Renders the template into an [`io::Write`].
    ///
    /// This works exactly like [`render`](Self::render) but writes the output
    /// as it's evaluating.
    pub fn render_to_write<W: io::Write>(&self, ctx: &mut Context, w: W) -> Result<(), Error> {
        self.env.inject_escaper(ctx);
        let mut wrapper = WriteWrapper { w, err: None };
        self._eval(ctx, &mut Output::new(&mut wrapper))
            .map_err(|err| wrapper.take_err(err))
    }

    pub(crate) fn _render(&self, ctx: &Context) -> Result<String, Error> {
        let mut rv = String::with_capacity(self.source.len());
        ok!(self._eval(ctx, &mut Output::new(&mut rv)));
        Ok(rv)
    }

    fn _eval(&self, ctx: &Context, out: &mut Output) -> Result<(), Error> {
        trace!(vars = ctx.len(), "rendering template");
        ok!(Vm::new(self.env).eval(&self.procedure, ctx, out));
        debug!("rendered template");
        Ok(())
    }

    /// Returns the normalized source of the template.
    ///
    /// This is the source after whitespace normalization, which is the text
    /// fragments and literals are taken from.
    pub fn source(&self) -> &str {
        &self.source
    }
}
