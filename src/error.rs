//! Failure kinds and classification
//!
//! Failures carry enough structure for three different consumers:
//! - backtracking combinators, which only react to the *parse* family
//!   ([`Error::is_no_parse`]) and accumulate expected-token sets,
//! - enumerator catch combinators, which need the original host I/O error
//!   back when a pipeline is torn down,
//! - users, who get a rendered "expected one of {..}" diagnostic.
//!
//! Errors are cheap to clone (host I/O errors are shared) because a failure
//! is both stored in the failing state and handed to whichever handler
//! inspects it.

use std::fmt;
use std::io;
use std::sync::Arc;

#[cfg(test)]
mod tests;

/// A pipeline failure.
#[derive(Debug, Clone)]
pub enum Error {
    /// The stream ended where the consumer still needed data.
    ///
    /// When the end of stream was observed as a host I/O error, the original
    /// error is kept so that [`Iter::run`][crate::Iter::run] can hand it
    /// back unwrapped.
    Eof(Option<Arc<io::Error>>),
    /// A parser expected one of a set of tokens.
    Expected(Expected),
    /// Some other way a parse can fail.
    Parse(String),
    /// A failure raised with [`Iter::fail_msg`][crate::Iter::fail_msg].
    Generic(String),
    /// A host I/O error surfaced by an effectful step.
    Io(Arc<io::Error>),
}

/// Coarse classification of an [`Error`], for tests and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// [`Error::Eof`]
    Eof,
    /// [`Error::Expected`]
    Expected,
    /// [`Error::Parse`]
    Parse,
    /// [`Error::Generic`]
    Generic,
    /// [`Error::Io`]
    Io,
}

impl Error {
    /// An end-of-stream failure with no underlying host error.
    pub fn eof() -> Self {
        Error::Eof(None)
    }

    /// A parse failure that expected `token`.
    pub fn expected(token: impl Into<String>) -> Self {
        Error::Expected(Expected {
            saw: None,
            tokens: vec![token.into()],
        })
    }

    /// A host I/O error, unconditionally: used where end-of-file must not
    /// read as a quiet end of stream (resource acquire and release).
    pub fn io(err: io::Error) -> Self {
        Error::Io(Arc::new(err))
    }

    /// Classify a host I/O error: end-of-file becomes [`Error::Eof`]
    /// (keeping the original), anything else [`Error::Io`].
    pub fn from_io(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Error::Eof(Some(Arc::new(err)))
        } else {
            Error::Io(Arc::new(err))
        }
    }

    /// The coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Eof(_) => ErrorKind::Eof,
            Error::Expected(_) => ErrorKind::Expected,
            Error::Parse(_) => ErrorKind::Parse,
            Error::Generic(_) => ErrorKind::Generic,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether this failure belongs to the parse family that backtracking
    /// combinators may recover from: [`Eof`][Error::Eof],
    /// [`Expected`][Error::Expected] and [`Parse`][Error::Parse].
    pub fn is_no_parse(&self) -> bool {
        matches!(self, Error::Eof(_) | Error::Expected(_) | Error::Parse(_))
    }

    /// Strip the end-of-stream wrapping, restoring the original host error
    /// when one was captured.
    pub(crate) fn unwrap_eof(self) -> Self {
        match self {
            Error::Eof(Some(io)) => Error::Io(io),
            other => other,
        }
    }

    /// Fold the expected-token set of an earlier failure into a later one.
    ///
    /// Only merges when both failures are [`Expected`][Error::Expected]; the
    /// later failure otherwise stands on its own.
    pub(crate) fn merge_expected(earlier: Error, later: Error) -> Error {
        match (earlier, later) {
            (Error::Expected(a), Error::Expected(b)) => Error::Expected(a.merge(b)),
            (_, later) => later,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Eof(Some(io)) => write!(f, "unexpected end of input: {io}"),
            Error::Eof(None) => write!(f, "unexpected end of input"),
            Error::Expected(e) => e.fmt(f),
            Error::Parse(msg) => write!(f, "parse failure: {msg}"),
            Error::Generic(msg) => f.write_str(msg),
            Error::Io(io) => io.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Eof(Some(io)) | Error::Io(io) => Some(io.as_ref()),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::from_io(err)
    }
}

/// The expected-token set accumulated while backtracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expected {
    /// What the input held at the failure point, when known.
    pub saw: Option<String>,
    /// The alternatives that would have been accepted there.
    pub tokens: Vec<String>,
}

impl Expected {
    /// Union the token sets of two failures at the same input position,
    /// keeping the later observation of the input.
    pub fn merge(self, later: Expected) -> Expected {
        let mut tokens = self.tokens;
        for t in later.tokens {
            if !tokens.contains(&t) {
                tokens.push(t);
            }
        }
        Expected {
            saw: later.saw.or(self.saw),
            tokens,
        }
    }
}

impl fmt::Display for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tokens.as_slice() {
            [] => f.write_str("parse failure")?,
            [one] => write!(f, "expected {one}")?,
            many => {
                f.write_str("expected one of {")?;
                for (i, t) in many.iter().enumerate() {
                    if i != 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(t)?;
                }
                f.write_str("}")?;
            }
        }
        if let Some(saw) = &self.saw {
            write!(f, ", saw {saw}")?;
        }
        Ok(())
    }
}
