use std::fmt;

use crate::compiler::codegen::generate;
use crate::compiler::lexer::normalize;
use crate::compiler::parser::parse_steps;
use crate::context::Context;
use crate::error::Error;
use crate::template::Template;
use crate::utils::{escaper_function, ESCAPER_KEY};
use crate::value::Value;

/// An abstraction that holds the engine configuration.
///
/// The environment compiles template sources into [`Template`]s and knows
/// how they are executed.  For one-off rendering the top-level
/// [`render`](crate::render) function uses a default environment.
///
/// ```
/// # use minitpl::{Environment, context};
/// let env = Environment::new();
/// let tmpl = env.compile("<p>Hello <% name %></p>").unwrap();
/// let mut ctx = context!(name => "World");
/// assert_eq!(tmpl.render(&mut ctx).unwrap(), "<p>Hello World</p>");
/// ```
#[derive(Clone)]
pub struct Environment {
    escaper: Value,
    #[cfg(feature = "fuel")]
    fuel: Option<u64>,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[allow(unused_mut)]
        let mut ds = f.debug_struct("Environment");
        #[cfg(feature = "fuel")]
        ds.field("fuel", &self.fuel);
        ds.finish()
    }
}

impl Environment {
    /// Creates a new environment with the default configuration.
    pub fn new() -> Environment {
        Environment {
            escaper: escaper_function(),
            #[cfg(feature = "fuel")]
            fuel: None,
        }
    }

    /// Compiles a template source.
    ///
    /// The source is normalized, split into literal text and fragments, and
    /// the fragments are parsed.  Syntax errors, including unbalanced
    /// blocks, are reported here before anything is executed.
    pub fn compile(&self, source: &str) -> Result<Template<'_>, Error> {
        let source = normalize(source);
        let steps = ok!(parse_steps(&source));
        debug!(
            source_len = source.len(),
            steps = steps.len(),
            "compiled template"
        );
        let procedure = ok!(generate(steps));
        Ok(Template::new(self, source, procedure))
    }

    /// Compiles and renders a template source in one go.
    ///
    /// The escaper is stored in the context before the source is compiled
    /// which means the context is updated even if compilation fails.
    pub fn render_str(&self, source: &str, ctx: &mut Context) -> Result<String, Error> {
        self.inject_escaper(ctx);
        let tmpl = ok!(self.compile(source));
        tmpl._render(ctx)
    }

    /// Stores the escaper in the context under [`ESCAPER_KEY`].
    pub(crate) fn inject_escaper(&self, ctx: &mut Context) {
        ctx.insert(ESCAPER_KEY, self.escaper.clone());
    }

    /// Sets the optional fuel of the engine.
    ///
    /// When minitpl is compiled with the `fuel` feature then every executed
    /// statement and every loop iteration consumes one unit of fuel.  By
    /// default the engine has no fuel limit (`None`) and a loop that never
    /// terminates will hang the render.  To turn on fuel set something like
    /// `Some(50000)`.
    ///
    /// Fuel is consumed per-render.
    #[cfg(feature = "fuel")]
    #[cfg_attr(docsrs, doc(cfg(feature = "fuel")))]
    pub fn set_fuel(&mut self, fuel: Option<u64>) {
        self.fuel = fuel;
    }

    /// Returns the configured fuel.
    #[cfg(feature = "fuel")]
    #[cfg_attr(docsrs, doc(cfg(feature = "fuel")))]
    pub fn fuel(&self) -> Option<u64> {
        self.fuel
    }
}
