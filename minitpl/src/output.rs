use std::{fmt, io};

use crate::error::{Error, ErrorKind};
use crate::value::Value;

/// The accumulator rendered text is pushed into.
///
/// Pushes are written straight through to the underlying writer, which has
/// the same effect as collecting all chunks and joining them without a
/// separator at the end.
pub struct Output<'a> {
    w: &'a mut (dyn fmt::Write + 'a),
}

impl<'a> Output<'a> {
    /// Creates a new output.
    pub(crate) fn new(w: &'a mut (dyn fmt::Write + 'a)) -> Self {
        Self { w }
    }

    /// Pushes literal text.
    #[inline]
    pub fn write_str(&mut self, s: &str) -> fmt::Result {
        self.w.write_str(s)
    }

    /// Pushes a value.
    ///
    /// `null` and `undefined` contribute nothing, every other value is
    /// converted to its string form.
    pub fn write_value(&mut self, value: &Value) -> fmt::Result {
        if value.is_nullish() {
            Ok(())
        } else {
            write!(self.w, "{value}")
        }
    }
}

/// Adapts an [`io::Write`] so that output can be rendered into it.
pub struct WriteWrapper<W> {
    /// The wrapped writer.
    pub w: W,
    /// The last I/O error, kept so it can be reported as error source.
    pub err: Option<io::Error>,
}

impl<W> WriteWrapper<W> {
    /// Replaces the given error with the held error if available.
    pub fn take_err(&mut self, original: Error) -> Error {
        self.err
            .take()
            .map(|io_err| {
                Error::new(ErrorKind::WriteFailure, "I/O error during rendering")
                    .with_source(io_err)
            })
            .unwrap_or(original)
    }
}

impl<W: io::Write> fmt::Write for WriteWrapper<W> {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.w.write_all(s.as_bytes()).map_err(|e| {
            self.err = Some(e);
            fmt::Error
        })
    }
}
