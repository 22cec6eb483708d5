//! Pipeline execution tracing
//!
//! With the `debug` cargo feature enabled, [`trace`] logs every step of a
//! consumer to stderr: the chunk it was fed and the state it settled into,
//! indented by pipeline depth. Without the feature it is free.

#[cfg(feature = "debug")]
mod internals;

use crate::chunk::StreamData;
use crate::error::Error;
use crate::Iter;

/// Log each step of `iter` under `name`.
///
/// ```rust
/// use thresh::sink::line;
/// use thresh::trace::trace;
///
/// let it = trace("first-line", line());
/// # let _ = it;
/// ```
#[cfg_attr(not(feature = "debug"), allow(unused_variables))]
pub fn trace<T, A>(name: impl std::fmt::Display, iter: Iter<T, A>) -> Iter<T, A>
where
    T: StreamData + std::fmt::Debug,
    A: Send + 'static,
{
    #[cfg(feature = "debug")]
    {
        internals::traced(name.to_string(), iter, 0)
    }
    #[cfg(not(feature = "debug"))]
    {
        iter
    }
}

/// Report an error to the diagnostic sink, prefixed with the program
/// identifier.
pub(crate) fn report(err: &Error) {
    #[cfg(feature = "debug")]
    {
        internals::report(err);
    }
    #[cfg(not(feature = "debug"))]
    {
        eprintln!("{}: {err}", progname());
    }
}

pub(crate) fn progname() -> String {
    std::env::args()
        .next()
        .map(|p| {
            std::path::Path::new(&p)
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_owned)
                .unwrap_or(p)
        })
        .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_owned())
}
