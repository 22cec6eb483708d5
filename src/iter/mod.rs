//! The iteratee state machine
//!
//! An [`Iter`] is a stream consumer, represented as a value in one of a
//! handful of states rather than as a running routine. Whoever holds an
//! `Iter` advances it by [`step`][Iter::step]ping it with a [`Chunk`];
//! everything else in the crate (enumerators, combinators, `run`) is built
//! out of stepping.
//!
//! The states split into three groups:
//! - live: [`NeedInput`][Iter::NeedInput] (waiting for data) and
//!   [`Ctl`][Iter::Ctl] (waiting for a control reply),
//! - finished: [`Done`][Iter::Done], carrying the result and any residual
//!   input for the next consumer in a chain,
//! - failed: [`IterFail`][Iter::IterFail] (the consumer itself),
//!   [`EnumOFail`][Iter::EnumOFail] (the producer feeding it, consumer still
//!   live) and [`EnumIFail`][Iter::EnumIFail] (a transformer stage, popped
//!   downstream consumer still live).
//!
//! The distinction between the failure states is what makes producer
//! failures resumable: a handler can pull the surviving consumer out of an
//! `EnumOFail` and hand it to a fresh source
//! ([`resume_i`][crate::combinator::resume_i]).

use std::fmt;
use std::io;

use crate::chunk::Chunk;
use crate::chunk::StreamData;
use crate::control::CtlReply;
use crate::control::CtlReq;
use crate::error::Error;


/// The continuation stored by a consumer waiting for input.
pub type Cont<T, A> = Box<dyn FnOnce(Chunk<T>) -> Iter<T, A> + Send>;

/// The continuation stored by a consumer waiting for a control reply.
pub type CtlCont<T, A> = Box<dyn FnOnce(CtlReply) -> Iter<T, A> + Send>;

/// A stream consumer over payload type `T`, producing an `A`.
///
/// # Example
///
/// ```rust
/// use thresh::{Chunk, Iter};
/// use thresh::sink::take_data;
///
/// let it = take_data::<Vec<u8>>(3);
/// let it = it.step(Chunk::new(b"ab".to_vec()));
/// assert!(it.wants_input());
/// match it.step(Chunk::new(b"cd".to_vec())) {
///     Iter::Done(got, rest) => {
///         assert_eq!(got, b"abc".to_vec());
///         assert_eq!(rest.data(), &b"d"[..]);
///     }
///     _ => unreachable!(),
/// }
/// ```
pub enum Iter<T, A> {
    /// Needs another chunk to make progress.
    NeedInput(Cont<T, A>),
    /// Blocked on an out-of-band control request travelling outward.
    Ctl(CtlReq, CtlCont<T, A>),
    /// Finished, with unconsumed residual input.
    Done(A, Chunk<T>),
    /// The consumer itself failed.
    IterFail(Error),
    /// An outer enumerator failed while feeding the carried consumer, which
    /// is untouched and may be resumed against another source.
    EnumOFail(Error, Box<Iter<T, A>>),
    /// An inner enumerator (transformer) failed; the carried state is the
    /// popped continuation holding the still-live downstream consumer.
    EnumIFail(Error, Box<Iter<T, A>>),
}

impl<T, A> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    /// A finished consumer with no residual input.
    pub fn done(a: A) -> Self {
        Iter::Done(a, Chunk::empty())
    }

    /// A failed consumer.
    pub fn fail(err: Error) -> Self {
        Iter::IterFail(err)
    }

    /// A failed consumer with a generic message.
    pub fn fail_msg(msg: impl Into<String>) -> Self {
        Iter::IterFail(Error::Generic(msg.into()))
    }

    /// A consumer built from its input-handling continuation.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: FnOnce(Chunk<T>) -> Iter<T, A> + Send + 'static,
    {
        Iter::NeedInput(Box::new(f))
    }

    /// Defer a host effect into the consumer's next step.
    ///
    /// The effect does not run when the pipeline is *composed*, only when it
    /// is *driven*: the returned consumer runs `action` on its first step
    /// and finishes with its result, leaving the stepped chunk as residual.
    /// End-of-file errors are classified as [`Error::Eof`] (so parse
    /// combinators treat a short stream like any other parse failure); other
    /// I/O errors fail the consumer.
    pub fn lift<F>(action: F) -> Self
    where
        F: FnOnce() -> io::Result<A> + Send + 'static,
    {
        Iter::NeedInput(Box::new(move |chunk| match action() {
            Ok(a) => Iter::Done(a, chunk),
            Err(e) => Iter::IterFail(Error::from_io(e)),
        }))
    }

    /// Whether this consumer is waiting for a chunk.
    pub fn wants_input(&self) -> bool {
        matches!(self, Iter::NeedInput(_))
    }

    /// Whether this consumer has finished successfully.
    pub fn is_done(&self) -> bool {
        matches!(self, Iter::Done(..))
    }

    /// Whether this consumer is in any failure state.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Iter::IterFail(_) | Iter::EnumOFail(..) | Iter::EnumIFail(..)
        )
    }

    /// Feed one chunk.
    ///
    /// - A waiting consumer runs its continuation. An EOF chunk is
    ///   propagated into the residual if the continuation finishes.
    /// - A consumer blocked on a control reply keeps the chunk and delivers
    ///   it after the reply arrives; a flushing reply (a seek made the
    ///   buffered input stale) discards it instead.
    /// - A finished consumer appends the chunk to its residual.
    /// - Failure states are left untouched.
    pub fn step(self, chunk: Chunk<T>) -> Self {
        match self {
            Iter::NeedInput(f) => {
                let eof = chunk.is_eof();
                let next = f(chunk);
                if eof {
                    match next {
                        Iter::Done(a, r) => Iter::Done(a, r.with_eof()),
                        other => other,
                    }
                } else {
                    debug_assert!(
                        !matches!(&next, Iter::Done(_, r) if r.is_eof()),
                        "consumer invented an EOF residual from a non-EOF chunk"
                    );
                    next
                }
            }
            Iter::Ctl(req, k) => Iter::Ctl(
                req,
                Box::new(move |reply| {
                    let flush = reply.as_ref().map_or(false, |answer| answer.flushes());
                    let next = k(reply);
                    if flush {
                        next
                    } else {
                        next.step(chunk)
                    }
                }),
            ),
            Iter::Done(a, r) => Iter::Done(a, r.append(chunk)),
            failed => failed,
        }
    }

    /// Feed a chunk unless it is the identity chunk.
    pub(crate) fn step_residual(self, chunk: Chunk<T>) -> Self {
        if chunk.is_empty() && !chunk.is_eof() {
            self
        } else {
            self.step(chunk)
        }
    }

    /// Sequence a second consumer after this one.
    ///
    /// The composition is itself deferred: nothing runs until the combined
    /// consumer is stepped. When `self` finishes, `k` receives its result
    /// and is stepped with the residual input, so no data is lost between
    /// the two. Failures short-circuit; a producer failure loses its live
    /// continuation here (the result type changes underneath it) and is
    /// carried on as a consumer failure.
    ///
    /// # Example
    ///
    /// ```rust
    /// use thresh::Chunk;
    /// use thresh::sink::line;
    ///
    /// let both = line().and_then(|first| line().map(move |second| (first, second)));
    /// let both = both.step(Chunk::new(b"hello\nworld\n".to_vec()));
    /// let (a, b) = both.run().unwrap();
    /// assert_eq!(a, b"hello".to_vec());
    /// assert_eq!(b, b"world".to_vec());
    /// ```
    pub fn and_then<B, K>(self, k: K) -> Iter<T, B>
    where
        B: Send + 'static,
        K: FnOnce(A) -> Iter<T, B> + Send + 'static,
    {
        match self {
            Iter::NeedInput(f) => Iter::NeedInput(Box::new(move |c| f(c).and_then(k))),
            Iter::Ctl(req, kc) => Iter::Ctl(req, Box::new(move |r| kc(r).and_then(k))),
            Iter::Done(a, r) => Iter::NeedInput(Box::new(move |c| k(a).step(r.append(c)))),
            Iter::IterFail(e) => Iter::IterFail(e),
            Iter::EnumOFail(e, _) | Iter::EnumIFail(e, _) => Iter::IterFail(e),
        }
    }

    /// Transform the result, preserving the state structure.
    ///
    /// Unlike [`and_then`][Iter::and_then], producer failures keep their
    /// live continuation (it is mapped along), so `map` is safe to use
    /// inside enumerator plumbing.
    pub fn map<B, F>(self, f: F) -> Iter<T, B>
    where
        B: Send + 'static,
        F: FnOnce(A) -> B + Send + 'static,
    {
        match self {
            Iter::NeedInput(g) => Iter::NeedInput(Box::new(move |c| g(c).map(f))),
            Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| k(r).map(f))),
            Iter::Done(a, r) => Iter::Done(f(a), r),
            Iter::IterFail(e) => Iter::IterFail(e),
            Iter::EnumOFail(e, i) => Iter::EnumOFail(e, Box::new(i.map(f))),
            Iter::EnumIFail(e, i) => Iter::EnumIFail(e, Box::new(i.map(f))),
        }
    }

    /// Drive this consumer to its result by feeding EOF.
    ///
    /// Pending control requests receive the top-level "no handler" reply.
    /// A failure is returned with its end-of-stream wrapping stripped, so
    /// callers see the original host I/O error where there was one.
    pub fn run(self) -> Result<A, Error> {
        let mut iter = self;
        loop {
            match iter {
                Iter::NeedInput(f) => iter = Iter::NeedInput(f).step(Chunk::eof()),
                Iter::Ctl(_, k) => iter = k(None),
                Iter::Done(a, _) => return Ok(a),
                Iter::IterFail(e) | Iter::EnumOFail(e, _) | Iter::EnumIFail(e, _) => {
                    return Err(e.unwrap_eof())
                }
            }
        }
    }

    #[cfg_attr(not(feature = "debug"), allow(dead_code))]
    pub(crate) fn state_name(&self) -> &'static str {
        match self {
            Iter::NeedInput(_) => "NeedInput",
            Iter::Ctl(..) => "Ctl",
            Iter::Done(..) => "Done",
            Iter::IterFail(_) => "IterFail",
            Iter::EnumOFail(..) => "EnumOFail",
            Iter::EnumIFail(..) => "EnumIFail",
        }
    }
}

impl<T, A> fmt::Debug for Iter<T, A>
where
    T: StreamData + fmt::Debug,
    A: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Iter::NeedInput(_) => f.write_str("NeedInput"),
            Iter::Ctl(req, _) => f.debug_tuple("Ctl").field(req).finish(),
            Iter::Done(a, r) => f.debug_tuple("Done").field(a).field(r).finish(),
            Iter::IterFail(e) => f.debug_tuple("IterFail").field(e).finish(),
            Iter::EnumOFail(e, i) => f.debug_tuple("EnumOFail").field(e).field(i).finish(),
            Iter::EnumIFail(e, i) => f.debug_tuple("EnumIFail").field(e).field(i).finish(),
        }
    }
}
