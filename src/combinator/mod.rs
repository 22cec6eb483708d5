//! Failure handling and backtracking
//!
//! Two families live here. The catch family mirrors exception handling:
//! [`catch_i`] sees every failure along with the failing state, so a handler
//! can tell a consumer failure from a producer failure and pull the
//! surviving consumer out of the latter ([`resume_i`]). [`enum_catch`] and
//! [`inum_catch`] restrict a handler to producer failures: the former to the
//! wrapped enumerator's own stages, the latter additionally to transformer
//! stages fused on afterwards.
//!
//! The backtracking family is for speculative parsing. [`try_bi`] and
//! [`catch_bi`] copy input as it streams past so that a failing parse can be
//! rewound, at a memory cost proportional to the data consumed before the commit
//! point, which is the documented price of backtracking. [`multi_parse`]
//! avoids that cost by running both branches in lock step over the arriving
//! chunks. Expected-token sets accumulate across alternatives through
//! [`map_exception_i`], producing "expected one of {..}" diagnostics at the
//! failure point.

use crate::chunk::Chunk;
use crate::chunk::StreamData;
use crate::enumerator::Onum;
use crate::error::Error;
use crate::error::Expected;
use crate::Iter;

#[cfg(test)]
mod tests;

/// Invoke a handler on any failure, with the failing state.
///
/// The handler receives the error and the complete failure state, so it can
/// distinguish the failure flavours and recover the live consumer from a
/// producer failure.
///
/// # Example
///
/// ```rust
/// use thresh::combinator::catch_i;
/// use thresh::Iter;
///
/// let it: Iter<Vec<u8>, &str> = catch_i(
///     Iter::fail_msg("boom"),
///     |err, _state| {
///         assert_eq!(err.to_string(), "boom");
///         Iter::done("recovered")
///     },
/// );
/// assert_eq!(it.run().unwrap(), "recovered");
/// ```
pub fn catch_i<T, A, H>(iter: Iter<T, A>, handler: H) -> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
    H: FnOnce(Error, Iter<T, A>) -> Iter<T, A> + Send + 'static,
{
    match iter {
        Iter::NeedInput(f) => Iter::NeedInput(Box::new(move |c| catch_i(f(c), handler))),
        Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| catch_i(k(r), handler))),
        st @ Iter::Done(..) => st,
        Iter::IterFail(e) => handler(e.clone(), Iter::IterFail(e)),
        Iter::EnumOFail(e, cont) => handler(e.clone(), Iter::EnumOFail(e, cont)),
        Iter::EnumIFail(e, cont) => handler(e.clone(), Iter::EnumIFail(e, cont)),
    }
}

/// [`catch_i`] with input copying: on failure, everything the consumer was
/// fed is replayed into the handler's replacement.
///
/// The handler does not receive the failing state; after a rewind, resuming
/// the failed consumer makes no sense. Memory is proportional to the input
/// consumed.
pub fn catch_bi<T, A, H>(iter: Iter<T, A>, handler: H) -> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
    H: FnOnce(Error) -> Iter<T, A> + Send + 'static,
{
    catch_bi_go(iter, Chunk::empty(), handler)
}

fn catch_bi_go<T, A, H>(iter: Iter<T, A>, saved: Chunk<T>, handler: H) -> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
    H: FnOnce(Error) -> Iter<T, A> + Send + 'static,
{
    match iter {
        Iter::NeedInput(f) => Iter::NeedInput(Box::new(move |c: Chunk<T>| {
            let saved = saved.append(c.clone());
            catch_bi_go(Iter::NeedInput(f).step(c), saved, handler)
        })),
        Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| catch_bi_go(k(r), saved, handler))),
        st @ Iter::Done(..) => st,
        Iter::IterFail(e) | Iter::EnumOFail(e, _) | Iter::EnumIFail(e, _) => {
            handler(e).step_residual(saved)
        }
    }
}

/// Restrict a handler to failures of the enumerator's own stages.
///
/// Transformer stages fused onto the result afterwards are *not* covered:
/// their failures pass through for an [`inum_catch`] or a plain
/// [`catch_i`] further out.
pub fn enum_catch<T, A, H>(onum: Onum<T, A>, handler: H) -> Onum<T, A>
where
    T: StreamData,
    A: Send + 'static,
    H: FnOnce(Error, Iter<T, A>) -> Iter<T, A> + Send + 'static,
{
    Onum::new(move |iter| match onum.apply(iter) {
        Iter::EnumOFail(e, cont) => handler(e.clone(), Iter::EnumOFail(e, cont)),
        st => st,
    })
}

/// Restrict a handler to producer failures, including those of transformer
/// stages fused onto the result after the catch was attached.
pub fn inum_catch<T, A, H>(onum: Onum<T, A>, handler: H) -> Onum<T, A>
where
    T: StreamData,
    A: Send + 'static,
    H: FnOnce(Error, Iter<T, A>) -> Iter<T, A> + Send + 'static,
{
    Onum::new(move |iter| match onum.apply(iter) {
        Iter::EnumOFail(e, cont) => handler(e.clone(), Iter::EnumOFail(e, cont)),
        Iter::EnumIFail(e, cont) => handler(e.clone(), Iter::EnumIFail(e, cont)),
        st => st,
    })
}

/// Continue past a producer failure with the surviving consumer.
///
/// Consumer failures and healthy states pass through unchanged, so this can
/// be applied unconditionally inside a catch handler.
pub fn resume_i<T, A>(iter: Iter<T, A>) -> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    match iter {
        Iter::EnumOFail(_, cont) | Iter::EnumIFail(_, cont) => *cont,
        st => st,
    }
}

/// [`resume_i`], reporting the error to the diagnostic sink first.
pub fn verbose_resume_i<T, A>(iter: Iter<T, A>) -> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    match iter {
        Iter::EnumOFail(e, cont) | Iter::EnumIFail(e, cont) => {
            crate::trace::report(&e);
            *cont
        }
        st => st,
    }
}

/// A failure reified by [`try_i`].
pub struct TryFailure<T, A> {
    /// What went wrong.
    pub error: Error,
    /// The failing state, for inspection or [`resume_i`].
    pub state: Iter<T, A>,
}

impl<T, A> std::fmt::Debug for TryFailure<T, A>
where
    T: StreamData + std::fmt::Debug,
    A: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TryFailure")
            .field("error", &self.error)
            .field("state", &self.state)
            .finish()
    }
}

/// Reify failure into the result instead of failing.
///
/// The `Err` side carries the error together with the failing state;
/// producer failures can still be resumed from it. Input is *not* copied:
/// whatever the consumer ate before failing is gone, so this is only a
/// backtracking building block for consumers that have not consumed yet.
pub fn try_i<T, A>(iter: Iter<T, A>) -> Iter<T, Result<A, TryFailure<T, A>>>
where
    T: StreamData,
    A: Send + 'static,
{
    match iter {
        Iter::NeedInput(f) => Iter::NeedInput(Box::new(move |c| try_i(f(c)))),
        Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| try_i(k(r)))),
        Iter::Done(a, r) => Iter::Done(Ok(a), r),
        Iter::IterFail(e) => Iter::done(Err(TryFailure {
            error: e.clone(),
            state: Iter::IterFail(e),
        })),
        Iter::EnumOFail(e, cont) => Iter::done(Err(TryFailure {
            error: e.clone(),
            state: Iter::EnumOFail(e, cont),
        })),
        Iter::EnumIFail(e, cont) => Iter::done(Err(TryFailure {
            error: e.clone(),
            state: Iter::EnumIFail(e, cont),
        })),
    }
}

/// [`try_i`] with input copying: on failure, the copied input is left as the
/// residual, so the next consumer in the chain parses from the rewind point.
///
/// Only the error is reified; after a rewind the failing state is useless.
/// Memory is proportional to the input consumed before the verdict.
pub fn try_bi<T, A>(iter: Iter<T, A>) -> Iter<T, Result<A, Error>>
where
    T: StreamData,
    A: Send + 'static,
{
    try_bi_go(iter, Chunk::empty())
}

fn try_bi_go<T, A>(iter: Iter<T, A>, saved: Chunk<T>) -> Iter<T, Result<A, Error>>
where
    T: StreamData,
    A: Send + 'static,
{
    match iter {
        Iter::NeedInput(f) => Iter::NeedInput(Box::new(move |c: Chunk<T>| {
            let saved = saved.append(c.clone());
            try_bi_go(Iter::NeedInput(f).step(c), saved)
        })),
        Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| try_bi_go(k(r), saved))),
        Iter::Done(a, r) => Iter::Done(Ok(a), r),
        Iter::IterFail(e) | Iter::EnumOFail(e, _) | Iter::EnumIFail(e, _) => {
            Iter::Done(Err(e), saved)
        }
    }
}

/// Speculatively run a parse; on a parse failure, rewind and take the
/// fallback.
///
/// `on_ok` continues from the parse's residual (input is *not* rewound on
/// success). On a failure of the parse family the fallback sees the input
/// from the rewind point; if the fallback then fails with an expected-token
/// error, the speculative parse's expected set is folded into it. Failures
/// outside the parse family are re-raised untouched.
///
/// # Example
///
/// ```rust
/// use thresh::combinator::{expect_i, if_parse};
/// use thresh::sink::{collect, exact};
/// use thresh::source::enum_pure;
/// use thresh::Iter;
///
/// let parser = if_parse(
///     expect_i(exact(b"foo".to_vec()), "\"foo\""),
///     |_| Iter::done("matched"),
///     collect().map(|rest| {
///         assert_eq!(rest, b"bar".to_vec()); // fallback sees all the input
///         "fell back"
///     }),
/// );
/// assert_eq!(enum_pure(b"bar".to_vec()).pipe(parser).unwrap(), "fell back");
/// ```
pub fn if_parse<T, A, B, K>(iter: Iter<T, A>, on_ok: K, on_fail: Iter<T, B>) -> Iter<T, B>
where
    T: StreamData,
    A: Send + 'static,
    B: Send + 'static,
    K: FnOnce(A) -> Iter<T, B> + Send + 'static,
{
    try_bi(iter).and_then(move |res| match res {
        Ok(a) => on_ok(a),
        Err(e) => {
            if e.is_no_parse() {
                map_exception_i(on_fail, move |later| Error::merge_expected(e, later))
            } else {
                Iter::IterFail(e)
            }
        }
    })
}

impl<T, A> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    /// Try `self`; on a parse failure, rewind and run `other`.
    ///
    /// Expected-token sets of the two branches merge, so a chain of `or`s
    /// reports every alternative it would have accepted.
    pub fn or(self, other: Iter<T, A>) -> Iter<T, A> {
        if_parse(self, Iter::done, other)
    }
}

/// Run two parses in lock step, committing to the first as soon as it
/// settles.
///
/// Every arriving chunk is fed to both branches, so no input is buffered:
/// this is the bounded-memory alternative to [`if_parse`] when the fallback
/// can consume input as it arrives. The first branch wins with its result,
/// or with any failure outside the parse family; on a parse failure the
/// already-caught-up second branch takes over. Because the second branch may
/// be fed input even when the first one wins, it must be free of observable
/// effects.
///
/// # Example
///
/// ```rust
/// use thresh::combinator::multi_parse;
/// use thresh::sink::{collect, exact};
/// use thresh::source::enum_pure;
///
/// let quick = exact(b"abc".to_vec()).map(|_| "abc");
/// let anything = collect().map(|_| "anything");
/// let got = enum_pure(b"abx".to_vec())
///     .pipe(multi_parse(quick, anything))
///     .unwrap();
/// assert_eq!(got, "anything");
/// ```
pub fn multi_parse<T, A>(a: Iter<T, A>, b: Iter<T, A>) -> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    match a {
        Iter::NeedInput(f) => Iter::NeedInput(Box::new(move |c: Chunk<T>| {
            let b = b.step(c.clone());
            multi_parse(Iter::NeedInput(f).step(c), b)
        })),
        Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| multi_parse(k(r), b))),
        st @ Iter::Done(..) => st,
        Iter::IterFail(e) if e.is_no_parse() => {
            map_exception_i(b, move |later| Error::merge_expected(e, later))
        }
        failed => failed,
    }
}

/// Transform the error inside any failure state the consumer settles into.
pub fn map_exception_i<T, A, F>(iter: Iter<T, A>, f: F) -> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
    F: FnOnce(Error) -> Error + Send + 'static,
{
    match iter {
        Iter::NeedInput(g) => Iter::NeedInput(Box::new(move |c| map_exception_i(g(c), f))),
        Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| map_exception_i(k(r), f))),
        st @ Iter::Done(..) => st,
        Iter::IterFail(e) => Iter::IterFail(f(e)),
        Iter::EnumOFail(e, cont) => Iter::EnumOFail(f(e), cont),
        Iter::EnumIFail(e, cont) => Iter::EnumIFail(f(e), cont),
    }
}

/// Label a parse with the token it was looking for.
///
/// Any parse-family failure is rewritten to an expected-token failure for
/// `token`, which is what [`if_parse`] and [`Iter::or`] accumulate into
/// "expected one of {..}" diagnostics.
pub fn expect_i<T, A>(iter: Iter<T, A>, token: impl Into<String>) -> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    let token = token.into();
    map_exception_i(iter, move |e| {
        if e.is_no_parse() {
            let saw = match &e {
                Error::Expected(x) => x.saw.clone(),
                Error::Eof(_) => Some("end of input".to_owned()),
                _ => None,
            };
            Error::Expected(Expected {
                saw,
                tokens: vec![token],
            })
        } else {
            e
        }
    })
}

/// Observe a consumer's input: finishes with the terminal state and the
/// concatenation of every chunk that was fed, however the input was
/// partitioned.
pub fn copy_input<T, A>(iter: Iter<T, A>) -> Iter<T, (Iter<T, A>, Chunk<T>)>
where
    T: StreamData,
    A: Send + 'static,
{
    copy_input_go(iter, Chunk::empty())
}

fn copy_input_go<T, A>(iter: Iter<T, A>, saved: Chunk<T>) -> Iter<T, (Iter<T, A>, Chunk<T>)>
where
    T: StreamData,
    A: Send + 'static,
{
    match iter {
        Iter::NeedInput(f) => Iter::NeedInput(Box::new(move |c: Chunk<T>| {
            let saved = saved.append(c.clone());
            copy_input_go(Iter::NeedInput(f).step(c), saved)
        })),
        Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| copy_input_go(k(r), saved))),
        terminal => Iter::done((terminal, saved)),
    }
}
