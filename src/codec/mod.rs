//! Building enumerators out of codecs
//!
//! A [`Codec`] packages "produce one unit of output" as a consumer: it eats
//! source input and finishes with a [`CodecStep`] saying whether more output
//! will follow. The builders here turn codecs into enumerators while taking
//! care of the parts that are easy to get wrong: feeding the codec its final
//! EOF step so it can flush, never feeding EOF to the wrapped consumer,
//! stopping as soon as the consumer stops asking, translating source
//! end-of-file into quiet termination, and releasing resources on every
//! termination path.
//!
//! - [`enum_o`] builds an outer enumerator from a source codec (input `()`).
//! - [`enum_i`] builds a transformer from a translating codec.
//! - [`enum_bracket`] wraps a resource's acquire/produce/release cycle.

use std::io;

use crate::chunk::Chunk;
use crate::chunk::StreamData;
use crate::control::CtlTable;
use crate::control::Dispatch;
use crate::enumerator::Inum;
use crate::enumerator::Onum;
use crate::error::Error;
use crate::error::ErrorKind;
use crate::Iter;


/// A stateful translator that produces one output unit per run.
///
/// The wrapped consumer eats `I` input and finishes with a [`CodecStep`]
/// carrying the produced unit and, if more output can follow, the codec to
/// run next.
pub struct Codec<I, O>(pub(crate) Iter<I, CodecStep<I, O>>);

/// What a codec run produced.
pub enum CodecStep<I, O> {
    /// One output unit; run the carried codec for more.
    Continue(Box<Codec<I, O>>, O),
    /// One final output unit; do not run the codec again.
    End(O),
    /// Terminated without a final unit.
    Empty,
}

impl<I, O> Codec<I, O>
where
    I: StreamData,
    O: StreamData,
{
    /// A codec from the consumer that implements one run of it.
    pub fn new(iter: Iter<I, CodecStep<I, O>>) -> Self {
        Codec(iter)
    }

    /// A stateless codec translating each arriving payload into one output
    /// unit.
    pub fn map_chunks<F>(f: F) -> Self
    where
        F: FnMut(I) -> O + Send + 'static,
    {
        Codec(Iter::NeedInput(Box::new(move |c: Chunk<I>| {
            let mut f = f;
            let (data, eof) = c.into_parts();
            if data.is_empty() {
                if eof {
                    Iter::Done(CodecStep::Empty, Chunk::eof())
                } else {
                    Codec::map_chunks(f).0
                }
            } else {
                let out = f(data);
                if eof {
                    Iter::Done(CodecStep::End(out), Chunk::eof())
                } else {
                    Iter::Done(CodecStep::Continue(Box::new(Codec::map_chunks(f)), out), Chunk::empty())
                }
            }
        })))
    }

    /// A codec that repeatedly runs an element parser, one output unit per
    /// parse; the parser signals a clean end with `None`.
    ///
    /// A parser failing with an end-of-stream error also ends the codec:
    /// the builders translate that into quiet termination.
    pub fn repeat_with<F>(mut make: F) -> Self
    where
        F: FnMut() -> Iter<I, Option<O>> + Send + 'static,
    {
        let parse = make();
        Codec(parse.and_then(move |out| match out {
            Some(o) => Iter::done(CodecStep::Continue(Box::new(Codec::repeat_with(make)), o)),
            None => Iter::done(CodecStep::Empty),
        }))
    }
}

impl<O: StreamData> Codec<(), O> {
    /// A source codec from a chunk-producing action; `None` is end of
    /// source.
    pub fn from_source<F>(produce: F) -> Self
    where
        F: FnMut() -> io::Result<Option<O>> + Send + 'static,
    {
        Codec(Iter::NeedInput(Box::new(move |c: Chunk<()>| {
            let mut produce = produce;
            match produce() {
                Ok(Some(out)) => {
                    Iter::Done(CodecStep::Continue(Box::new(Codec::from_source(produce)), out), c)
                }
                Ok(None) => Iter::Done(CodecStep::Empty, c),
                Err(e) => Iter::IterFail(Error::from_io(e)),
            }
        })))
    }
}

impl<I, O> std::fmt::Debug for Codec<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Codec")
    }
}

/// An outer enumerator driving a source codec.
///
/// The codec is stepped with EOF (a source consumes nothing); each produced
/// unit is fed to the consumer as a data chunk. A source end-of-file error
/// terminates quietly, handing back the still-live consumer; any other
/// failure becomes [`EnumOFail`][Iter::EnumOFail].
///
/// # Example
///
/// ```rust
/// use thresh::codec::{enum_o, Codec};
/// use thresh::sink::collect;
///
/// let mut parts = vec![b"world".to_vec(), b"hello ".to_vec()];
/// let src = enum_o(Codec::from_source(move || Ok(parts.pop())));
/// assert_eq!(src.pipe(collect()).unwrap(), b"hello world".to_vec());
/// ```
pub fn enum_o<T, A>(codec: Codec<(), T>) -> Onum<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    enum_o_ctl(codec, CtlTable::new())
}

/// [`enum_o`] with a control-request handler chain.
pub fn enum_o_ctl<T, A>(codec: Codec<(), T>, table: CtlTable<()>) -> Onum<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    Onum::new(move |iter| {
        let mut codec = codec;
        let mut iter = iter;
        let mut table = table;
        loop {
            iter = match iter {
                // an outer enumerator is the top of its chain: requests
                // nobody handles get the "no handler" reply here
                Iter::Ctl(req, k) => match table.dispatch(&mut (), req) {
                    Dispatch::Reply(reply) => k(reply),
                    Dispatch::Pass(_) => k(None),
                },
                st @ Iter::NeedInput(_) => st,
                st => return st,
            };
            if !iter.wants_input() {
                continue;
            }
            match source_step(codec) {
                Ok(CodecStep::Continue(next, out)) => {
                    codec = *next;
                    iter = iter.step(Chunk::new(out));
                }
                Ok(CodecStep::End(out)) => {
                    return settle_pending(iter.step(Chunk::new(out)), &mut table)
                }
                Ok(CodecStep::Empty) => return settle_pending(iter, &mut table),
                Err(e) => {
                    return if e.kind() == ErrorKind::Eof {
                        settle_pending(iter, &mut table)
                    } else {
                        Iter::EnumOFail(e, Box::new(iter))
                    }
                }
            }
        }
    })
}

/// The source is dry: give the consumer one empty step so that a control
/// request hiding behind a deferred continuation can still reach this
/// enumerator's handlers, then answer whatever surfaces.
fn settle_pending<T, A>(iter: Iter<T, A>, table: &mut CtlTable<()>) -> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    let mut iter = iter.step(Chunk::empty());
    loop {
        iter = match iter {
            Iter::Ctl(req, k) => match table.dispatch(&mut (), req) {
                Dispatch::Reply(reply) => k(reply),
                Dispatch::Pass(_) => k(None),
            },
            st => return st,
        };
    }
}

/// One run of a source codec.
fn source_step<T: StreamData>(codec: Codec<(), T>) -> Result<CodecStep<(), T>, Error> {
    let mut it = codec.0;
    loop {
        match it {
            Iter::NeedInput(f) => it = Iter::NeedInput(f).step(Chunk::eof()),
            Iter::Ctl(_, k) => it = k(None),
            Iter::Done(step, _) => return Ok(step),
            Iter::IterFail(e) | Iter::EnumOFail(e, _) | Iter::EnumIFail(e, _) => return Err(e),
        }
    }
}

/// A transformer driving a translating codec.
///
/// Acts as a consumer of `I` input; every unit the codec produces is fed to
/// the downstream consumer as a data chunk. On source EOF the codec gets a
/// final EOF step so it can flush, but the downstream consumer sees no EOF:
/// it is popped still live. Codec failures become
/// [`EnumIFail`][Iter::EnumIFail] carrying the popped downstream.
pub fn enum_i<I, O, A>(codec: Codec<I, O>) -> Inum<I, O, A>
where
    I: StreamData,
    O: StreamData,
    A: Send + 'static,
{
    Inum::new(move |iter| drive(codec.0, iter))
}

fn drive<I, O, A>(cit: Iter<I, CodecStep<I, O>>, down: Iter<O, A>) -> Iter<I, Iter<O, A>>
where
    I: StreamData,
    O: StreamData,
    A: Send + 'static,
{
    // downstream control requests travel outward transparently
    let down = match down {
        Iter::Ctl(req, k) => return Iter::Ctl(req, Box::new(move |r| drive(cit, k(r)))),
        d if d.wants_input() => d,
        d => return Iter::Done(d, Chunk::empty()),
    };
    match cit {
        Iter::NeedInput(f) => Iter::NeedInput(Box::new(move |c: Chunk<I>| {
            let eof = c.is_eof();
            let cit = Iter::NeedInput(f).step(c);
            if eof {
                finish(cit, down)
            } else {
                drive(cit, down)
            }
        })),
        Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| drive(k(r), down))),
        Iter::Done(step, residual) => match step {
            CodecStep::Continue(next, out) => {
                let down = down.step(Chunk::new(out));
                drive(next.0, down).step_residual(residual)
            }
            CodecStep::End(out) => Iter::Done(down.step(Chunk::new(out)), residual),
            CodecStep::Empty => Iter::Done(down, residual),
        },
        Iter::IterFail(e) if e.kind() == ErrorKind::Eof => Iter::Done(down, Chunk::empty()),
        Iter::IterFail(e) | Iter::EnumOFail(e, _) | Iter::EnumIFail(e, _) => {
            Iter::EnumIFail(e, Box::new(Iter::Done(down, Chunk::empty())))
        }
    }
}

/// The codec's input has hit EOF: give it flush steps until it terminates,
/// then pop the downstream.
fn finish<I, O, A>(cit: Iter<I, CodecStep<I, O>>, down: Iter<O, A>) -> Iter<I, Iter<O, A>>
where
    I: StreamData,
    O: StreamData,
    A: Send + 'static,
{
    let mut cit = cit;
    let mut down = down;
    loop {
        down = match down {
            Iter::Ctl(req, k) => return Iter::Ctl(req, Box::new(move |r| finish(cit, k(r)))),
            d if d.wants_input() => d,
            d => return Iter::Done(d, Chunk::eof()),
        };
        match cit {
            Iter::NeedInput(f) => cit = Iter::NeedInput(f).step(Chunk::eof()),
            Iter::Ctl(req, k) => return Iter::Ctl(req, Box::new(move |r| finish(k(r), down))),
            Iter::Done(step, residual) => match step {
                CodecStep::Continue(next, out) => {
                    down = down.step(Chunk::new(out));
                    cit = next.0.step_residual(residual.with_eof());
                }
                CodecStep::End(out) => {
                    return Iter::Done(down.step(Chunk::new(out)), residual.with_eof())
                }
                CodecStep::Empty => return Iter::Done(down, residual.with_eof()),
            },
            Iter::IterFail(e) if e.kind() == ErrorKind::Eof => {
                return Iter::Done(down, Chunk::eof())
            }
            Iter::IterFail(e) | Iter::EnumOFail(e, _) | Iter::EnumIFail(e, _) => {
                return Iter::EnumIFail(e, Box::new(Iter::Done(down, Chunk::eof())))
            }
        }
    }
}

/// An outer enumerator owning a resource for the duration of the feed.
///
/// `acquire` runs once before any data; if it fails the consumer is returned
/// untouched inside an [`EnumOFail`][Iter::EnumOFail]. `produce` is called
/// for successive chunks until it returns `None`, fails, or the consumer
/// stops asking. `release` runs exactly once on every termination path; a
/// release failure masks a successful feed but never an earlier failure.
pub fn enum_bracket<R, T, A, Aq, Rl, Pr>(acquire: Aq, release: Rl, produce: Pr) -> Onum<T, A>
where
    R: Send + 'static,
    T: StreamData,
    A: Send + 'static,
    Aq: FnOnce() -> io::Result<R> + Send + 'static,
    Rl: FnOnce(&mut R) -> io::Result<()> + Send + 'static,
    Pr: FnMut(&mut R) -> io::Result<Option<T>> + Send + 'static,
{
    enum_bracket_ctl(acquire, release, produce, CtlTable::new())
}

/// [`enum_bracket`] with a control-request handler chain over the resource.
///
/// Seek-style handlers registered with
/// [`CtlTable::on_flush`][crate::control::CtlTable::on_flush] reposition the
/// resource themselves; their flushing reply additionally makes the parked
/// consumer discard anything this enumerator fed it ahead of the seek.
pub fn enum_bracket_ctl<R, T, A, Aq, Rl, Pr>(
    acquire: Aq,
    release: Rl,
    mut produce: Pr,
    mut table: CtlTable<R>,
) -> Onum<T, A>
where
    R: Send + 'static,
    T: StreamData,
    A: Send + 'static,
    Aq: FnOnce() -> io::Result<R> + Send + 'static,
    Rl: FnOnce(&mut R) -> io::Result<()> + Send + 'static,
    Pr: FnMut(&mut R) -> io::Result<Option<T>> + Send + 'static,
{
    Onum::new(move |iter: Iter<T, A>| {
        let mut res = match acquire() {
            Ok(r) => r,
            Err(e) => return Iter::EnumOFail(Error::io(e), Box::new(iter)),
        };
        let mut iter = iter;
        let mut failure = None;
        // `dry` flags a source that reported end-of-data; a handled control
        // request (a seek, say) may reposition it, so dispatching clears it
        let mut dry = false;
        loop {
            iter = match iter {
                Iter::Ctl(req, k) => {
                    dry = false;
                    match table.dispatch(&mut res, req) {
                        Dispatch::Reply(reply) => k(reply),
                        Dispatch::Pass(_) => k(None),
                    }
                }
                st @ Iter::NeedInput(_) => st,
                st => {
                    iter = st;
                    break;
                }
            };
            if !iter.wants_input() {
                continue;
            }
            if dry {
                break;
            }
            match produce(&mut res) {
                Ok(Some(data)) => iter = iter.step(Chunk::new(data)),
                Ok(None) => {
                    dry = true;
                    // surface any control request deferred behind a bind
                    iter = iter.step(Chunk::empty());
                }
                Err(e) => {
                    let e = Error::from_io(e);
                    if e.kind() == ErrorKind::Eof {
                        dry = true;
                        iter = iter.step(Chunk::empty());
                    } else {
                        failure = Some(e);
                        break;
                    }
                }
            }
        }
        let released = release(&mut res);
        match failure {
            Some(e) => Iter::EnumOFail(e, Box::new(iter)),
            None => match released {
                Ok(()) => iter,
                Err(e) => Iter::EnumOFail(Error::io(e), Box::new(iter)),
            },
        }
    })
}
