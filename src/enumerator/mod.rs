//! Producers, transformers and the composition algebra
//!
//! An [`Onum`] is an outer enumerator: a data source that feeds a consumer
//! until the consumer finishes or the source runs dry. An [`Inum`] is an
//! inner enumerator: a transformer that is a consumer of its input stream
//! and a producer for the consumer it wraps. Both are first-class values, so
//! gluing a pipeline together is ordinary function composition:
//!
//! - [`Onum::cat`] / [`Inum::cat`] run two like enumerators in sequence over
//!   the same consumer,
//! - [`Onum::fuse`] grafts a transformer onto a source, yielding a source of
//!   the transformer's output type,
//! - [`Inum::compose`] fuses two transformers,
//! - [`Inum::wrap`] fuses a transformer into a consumer, yielding a consumer
//!   of the outer input type,
//! - [`Onum::pipe`] runs a whole pipeline to its result.
//!
//! Enumerators never feed EOF to the consumer they wrap: when a source runs
//! dry it hands the consumer back still live, so another source can be
//! concatenated after it. EOF reaches a consumer only from
//! [`run`][crate::Iter::run] at the very end of a pipeline.

use crate::chunk::Chunk;
use crate::chunk::StreamData;
use crate::error::Error;
use crate::Iter;


/// An outer enumerator: feeds chunks of `T` to a consumer.
///
/// Implementations must honour the enumerator discipline: never feed an EOF
/// chunk; stop as soon as the consumer is no longer asking for input; turn
/// source end-of-file into quiet termination and any other source error into
/// [`EnumOFail`][Iter::EnumOFail] carrying the still-live consumer.
pub struct Onum<T, A>(Box<dyn FnOnce(Iter<T, A>) -> Iter<T, A> + Send>);

impl<T, A> Onum<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    /// An enumerator from its feeding function.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Iter<T, A>) -> Iter<T, A> + Send + 'static,
    {
        Onum(Box::new(f))
    }

    /// Feed the consumer everything this enumerator has.
    ///
    /// The returned consumer may still be live (the source ran dry first)
    /// and can be handed to another enumerator.
    pub fn apply(self, iter: Iter<T, A>) -> Iter<T, A> {
        (self.0)(iter)
    }

    /// Sequence two sources: whatever `self` leaves unfinished, `other`
    /// continues feeding.
    ///
    /// Between the two phases the consumer is stepped once with the identity
    /// chunk, so effects deferred during the first phase complete before the
    /// second starts sampling input.
    ///
    /// # Example
    ///
    /// ```rust
    /// use thresh::sink::take_data;
    /// use thresh::source::enum_pure;
    ///
    /// let out = enum_pure(b"ab".to_vec())
    ///     .cat(enum_pure(b"cd".to_vec()))
    ///     .pipe(take_data(3))
    ///     .unwrap();
    /// assert_eq!(out, b"abc".to_vec());
    /// ```
    pub fn cat(self, other: Onum<T, A>) -> Onum<T, A> {
        Onum::new(move |iter| {
            let iter = self.apply(iter);
            let iter = match iter {
                st @ Iter::NeedInput(_) => st.step(Chunk::empty()),
                st => st,
            };
            match iter {
                st @ (Iter::NeedInput(_) | Iter::Ctl(..)) => other.apply(st),
                st => st,
            }
        })
    }

    /// Run the pipeline: feed the consumer, then drive it to its result.
    ///
    /// The consumer is sealed first: any producer failure arising *inside*
    /// it (from stages fused into the consumer side) is reclassified as a
    /// consumer failure, so catch combinators wrapped around `self` only see
    /// failures of `self`'s own stages.
    pub fn pipe(self, iter: Iter<T, A>) -> Result<A, Error> {
        self.apply(seal(iter)).run()
    }
}

impl<T, U, A> Onum<T, Iter<U, A>>
where
    T: StreamData,
    U: StreamData,
    A: Send + 'static,
{
    /// Graft a transformer onto this source, yielding a source of the
    /// transformer's output type.
    ///
    /// When the fused source terminates, the transformer level is driven to
    /// completion and popped; the downstream consumer never sees EOF and
    /// stays live for concatenation. A failure of the transformer becomes a
    /// failure of the fused source, owned by it from the outside.
    ///
    /// # Example
    ///
    /// ```rust
    /// use thresh::codec::{enum_i, Codec};
    /// use thresh::sink::collect;
    /// use thresh::source::enum_pure;
    ///
    /// let upper = enum_i(Codec::map_chunks(|data: Vec<u8>| data.to_ascii_uppercase()));
    /// let out = enum_pure(b"abc".to_vec()).fuse(upper).pipe(collect()).unwrap();
    /// assert_eq!(out, b"ABC".to_vec());
    /// ```
    pub fn fuse(self, inner: Inum<T, U, A>) -> Onum<U, A> {
        Onum::new(move |iter: Iter<U, A>| join(self.apply(inner.apply(iter))))
    }
}

impl<T, A> std::fmt::Debug for Onum<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Onum")
    }
}

/// An inner enumerator: consumes an `I` stream and feeds a transcoded `O`
/// stream to the consumer it wraps.
///
/// Applying an `Inum` yields a consumer over `I` whose *result* is the
/// wrapped consumer's state, so the downstream consumer can be popped back
/// out and re-fused when the transformer's input ends.
pub struct Inum<I, O, A>(Box<dyn FnOnce(Iter<O, A>) -> Iter<I, Iter<O, A>> + Send>);

impl<I, O, A> Inum<I, O, A>
where
    I: StreamData,
    O: StreamData,
    A: Send + 'static,
{
    /// A transformer from its wrapping function.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Iter<O, A>) -> Iter<I, Iter<O, A>> + Send + 'static,
    {
        Inum(Box::new(f))
    }

    /// Wrap the downstream consumer, yielding the transformer's consumer
    /// side.
    pub fn apply(self, iter: Iter<O, A>) -> Iter<I, Iter<O, A>> {
        (self.0)(iter)
    }

    /// Sequence two transformers over the same downstream consumer.
    ///
    /// When `self` pops a downstream that is still asking for input, `other`
    /// picks it up, starting from `self`'s unconsumed residual.
    pub fn cat(self, other: Inum<I, O, A>) -> Inum<I, O, A> {
        Inum::new(move |iter| hand_off(self.apply(iter), other))
    }

    /// Fuse this transformer into a consumer, yielding a consumer of the
    /// outer input type.
    ///
    /// Unlike [`Onum::fuse`], the downstream is run to its *result* once the
    /// transformer terminates: the returned consumer finishes with `A`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use thresh::codec::{enum_i, Codec};
    /// use thresh::sink::collect;
    /// use thresh::Chunk;
    ///
    /// let upper = enum_i(Codec::map_chunks(|data: Vec<u8>| data.to_ascii_uppercase()));
    /// let it = upper.wrap(collect());
    /// let it = it.step(Chunk::new(b"hi".to_vec()));
    /// assert_eq!(it.run().unwrap(), b"HI".to_vec());
    /// ```
    pub fn wrap(self, iter: Iter<O, A>) -> Iter<I, A> {
        finish_downstream(self.apply(iter))
    }
}

impl<T1, T2, T3, A> Inum<T1, T2, Iter<T3, A>>
where
    T1: StreamData,
    T2: StreamData,
    T3: StreamData,
    A: Send + 'static,
{
    /// Fuse two transformers into one.
    ///
    /// The middle stream is private to the fused pair: when the outer
    /// transformer pops, the middle level is flushed and the innermost
    /// downstream comes out, exactly as if the stages had been fused onto a
    /// source one by one.
    pub fn compose(self, other: Inum<T2, T3, A>) -> Inum<T1, T3, A> {
        Inum::new(move |iter: Iter<T3, A>| self.apply(other.apply(iter)).map(join))
    }
}

impl<I, O, A> std::fmt::Debug for Inum<I, O, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Inum")
    }
}

/// Drive a transformer stack to a terminal state at its input level and pop
/// the downstream consumer.
///
/// The input level receives EOF (its stream is over); the popped downstream
/// does not. Failures at the transformer level surface as
/// [`EnumOFail`][Iter::EnumOFail] in the downstream's world when the live
/// consumer can be recovered, and degrade to a consumer failure otherwise.
pub(crate) fn join<T, U, A>(stack: Iter<T, Iter<U, A>>) -> Iter<U, A>
where
    T: StreamData,
    U: StreamData,
    A: Send + 'static,
{
    let mut it = stack;
    loop {
        match it {
            Iter::NeedInput(f) => it = Iter::NeedInput(f).step(Chunk::eof()),
            Iter::Ctl(_, k) => it = k(None),
            Iter::Done(down, _) => return down,
            Iter::IterFail(e) => return Iter::IterFail(e),
            Iter::EnumOFail(e, cont) | Iter::EnumIFail(e, cont) => {
                return match pop(*cont) {
                    Ok(down) => Iter::EnumOFail(e, Box::new(down)),
                    Err(_) => Iter::IterFail(e),
                }
            }
        }
    }
}

/// Extract the downstream consumer from a transformer continuation.
fn pop<T, U, A>(cont: Iter<T, Iter<U, A>>) -> Result<Iter<U, A>, Error>
where
    T: StreamData,
    U: StreamData,
    A: Send + 'static,
{
    let mut it = cont;
    loop {
        match it {
            Iter::NeedInput(f) => it = Iter::NeedInput(f).step(Chunk::eof()),
            Iter::Ctl(_, k) => it = k(None),
            Iter::Done(down, _) => return Ok(down),
            Iter::IterFail(e) | Iter::EnumOFail(e, _) | Iter::EnumIFail(e, _) => return Err(e),
        }
    }
}

/// Reclassify producer failures originating inside a consumer as consumer
/// failures.
fn seal<T, A>(iter: Iter<T, A>) -> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    match iter {
        Iter::NeedInput(f) => Iter::NeedInput(Box::new(move |c| seal(f(c)))),
        Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| seal(k(r)))),
        Iter::EnumOFail(e, _) | Iter::EnumIFail(e, _) => Iter::IterFail(e),
        st => st,
    }
}

/// Continue a popped-but-unfinished downstream with a second transformer.
fn hand_off<I, O, A>(stack: Iter<I, Iter<O, A>>, next: Inum<I, O, A>) -> Iter<I, Iter<O, A>>
where
    I: StreamData,
    O: StreamData,
    A: Send + 'static,
{
    match stack {
        Iter::NeedInput(f) => Iter::NeedInput(Box::new(move |c| hand_off(f(c), next))),
        Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| hand_off(k(r), next))),
        Iter::Done(down, residual) => {
            if down.wants_input() {
                next.apply(down).step_residual(residual)
            } else {
                Iter::Done(down, residual)
            }
        }
        failed => failed,
    }
}

/// Run the downstream to its result as soon as the transformer level pops
/// it.
fn finish_downstream<I, O, A>(stack: Iter<I, Iter<O, A>>) -> Iter<I, A>
where
    I: StreamData,
    O: StreamData,
    A: Send + 'static,
{
    match stack {
        Iter::NeedInput(f) => Iter::NeedInput(Box::new(move |c| finish_downstream(f(c)))),
        Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| finish_downstream(k(r)))),
        Iter::Done(down, r) => match down.run() {
            Ok(a) => Iter::Done(a, r),
            Err(e) => Iter::IterFail(e),
        },
        Iter::IterFail(e) => Iter::IterFail(e),
        Iter::EnumOFail(e, cont) => Iter::EnumOFail(e, Box::new(finish_downstream(*cont))),
        Iter::EnumIFail(e, cont) => Iter::EnumIFail(e, Box::new(finish_downstream(*cont))),
    }
}
