//! # thresh, streaming pipelines out of little state machines
//!
//! thresh is an iteratee library: stream processing built from three kinds
//! of value that compose like functions.
//!
//! - An [`Iter`] *consumes* a chunked stream. It is a state machine, not a
//!   running routine: whoever holds it feeds it a [`Chunk`] at a time, and
//!   it answers with its next state: still hungry, finished with a result
//!   and residual input, or failed.
//! - An [`Onum`] *produces* a stream, feeding a consumer until the consumer
//!   finishes or the source runs dry.
//! - An [`Inum`] *transforms* a stream: a consumer of its input that
//!   produces for the consumer it wraps.
//!
//! Pipelines are assembled with a handful of combinators:
//! [`cat`][Onum::cat] for sequencing sources, [`fuse`][Onum::fuse] for
//! grafting transformers onto them, [`pipe`][Onum::pipe] for running the
//! whole thing. The pieces stay reusable: a consumer that a source ran
//! dry on can be handed to the next source, a transformer's downstream can
//! be popped back out, and a consumer that outlived a failed producer can be
//! resumed against a fresh one.
//!
//! ## Example
//!
//! ```rust
//! use thresh::codec::{enum_i, Codec};
//! use thresh::sink::line;
//! use thresh::source::enum_pure;
//!
//! // produce → transform → consume
//! let shout = enum_i(Codec::map_chunks(|data: Vec<u8>| data.to_ascii_uppercase()));
//! let first = enum_pure(b"hello\nworld\n".to_vec())
//!     .fuse(shout)
//!     .pipe(line())
//!     .unwrap();
//! assert_eq!(first, b"HELLO".to_vec());
//! ```
//!
//! ## End of stream, failure, backtracking
//!
//! EOF is explicit: a chunk carries a flag, and only
//! [`run`][Iter::run]/[`pipe`][Onum::pipe] ever feed it; an enumerator
//! never ends the stream for the consumer it wraps. Failure is structured:
//! a consumer failing is distinct from a producer failing *around* a healthy
//! consumer, and the latter carries the survivor so
//! [`resume_i`][combinator::resume_i] can carry on with it. On top of the
//! same machinery sit backtracking parsers:
//! [`if_parse`][combinator::if_parse] and [`Iter::or`] rewind speculatively
//! consumed input, [`multi_parse`][combinator::multi_parse] runs two
//! branches in lock step when buffering is too expensive, and expected-token
//! sets accumulate into "expected one of {..}" diagnostics.
//!
//! ```rust
//! use thresh::combinator::expect_i;
//! use thresh::sink::{collect, exact};
//! use thresh::source::enum_pure;
//! use thresh::Iter;
//!
//! let keyword = |kw: &str| expect_i(exact(kw.as_bytes().to_vec()), format!("\"{kw}\""));
//! let parser = keyword("get").or(keyword("put")).and_then(|verb| {
//!     collect().map(move |rest: Vec<u8>| (verb, rest))
//! });
//!
//! let err = enum_pure(b"delete".to_vec()).pipe(parser).unwrap_err();
//! assert_eq!(err.to_string(), "expected one of {\"get\", \"put\"}, saw [100, 101, 108]");
//! ```
//!
//! ## Features
//!
//! - `debug`: step-by-step pipeline tracing to stderr via [`trace::trace`]
//! - `simd`: newline scanning with `memchr` in [`sink::line`]
#![deny(missing_docs)]

pub mod chunk;
pub mod codec;
pub mod combinator;
pub mod control;
pub mod enumerator;
pub mod error;
pub mod iter;
pub mod sink;
pub mod source;
pub mod sync;
pub mod trace;

pub use crate::chunk::Chunk;
pub use crate::chunk::SizedData;
pub use crate::chunk::StreamData;
pub use crate::enumerator::Inum;
pub use crate::enumerator::Onum;
pub use crate::error::Error;
pub use crate::error::ErrorKind;
pub use crate::iter::Iter;

/// Core types for glob import.
///
/// ```rust
/// use thresh::prelude::*;
///
/// let it: Iter<Vec<u8>, ()> = Iter::done(());
/// # let _ = it;
/// ```
pub mod prelude {
    pub use crate::chunk::Chunk;
    pub use crate::chunk::SizedData;
    pub use crate::chunk::StreamData;
    pub use crate::enumerator::Inum;
    pub use crate::enumerator::Onum;
    pub use crate::error::Error;
    pub use crate::error::ErrorKind;
    pub use crate::iter::Iter;
}
