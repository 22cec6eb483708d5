//! Out-of-band control requests
//!
//! A consumer deep inside a pipeline sometimes needs to talk to its producer
//! rather than to the stream: ask a file enumerator to seek, ask for the
//! stream size, fetch the file descriptor behind a socket source. Such
//! requests travel *outward* through every enclosing enumerator until one of
//! them understands the request and replies, or the top of the chain answers
//! "no handler".
//!
//! Requests and replies are type-erased and tagged with [`TypeId`]s so that
//! enumerators can route requests they have never heard of: an unregistered
//! tag passes through transparently. [`ctl`] recovers the typed response on
//! the consumer side.
//!
//! The request is synchronous: the issuing consumer sits in the
//! [`Ctl`][crate::Iter::Ctl] state until the reply arrives. Data that
//! reaches the parked consumer in the meantime is buffered and delivered
//! after the reply, unless the reply is *flushing*
//! ([`CtlAnswer::flushing`], registered with [`CtlTable::on_flush`]): a
//! seek makes everything read ahead of it stale, so a flushing reply
//! discards that buffered input instead.

use std::any::type_name;
use std::any::Any;
use std::any::TypeId;
use std::fmt;
use std::io;

use crate::chunk::StreamData;
use crate::Iter;

#[cfg(test)]
mod tests;

/// A typed control request with a typed response.
///
/// # Example
///
/// ```rust
/// use thresh::control::CtlRequest;
///
/// struct Rewind;
/// impl CtlRequest for Rewind {
///     type Response = ();
/// }
/// ```
pub trait CtlRequest: Any + Send {
    /// What a handling enumerator replies with.
    type Response: Any + Send;
}

/// A type-erased request in flight.
pub struct CtlReq {
    tag: TypeId,
    name: &'static str,
    payload: Box<dyn Any + Send>,
}

/// A type-erased reply; `None` means no enumerator handled the request.
pub type CtlReply = Option<CtlAnswer>;

/// The payload of a handled control reply.
///
/// A *flushing* answer additionally tells the parked consumer that any
/// input buffered while the request was in flight is stale and must be
/// discarded; that is how a seek invalidates data read ahead of it.
pub struct CtlAnswer {
    payload: Box<dyn Any + Send>,
    flush: bool,
}

impl CtlAnswer {
    /// A plain reply.
    pub fn new<R: Any + Send>(resp: R) -> Self {
        CtlAnswer {
            payload: Box::new(resp),
            flush: false,
        }
    }

    /// A reply that also discards input buffered while the request was in
    /// flight.
    pub fn flushing<R: Any + Send>(resp: R) -> Self {
        CtlAnswer {
            payload: Box::new(resp),
            flush: true,
        }
    }

    /// Whether input buffered at the request point is now stale.
    pub fn flushes(&self) -> bool {
        self.flush
    }

    /// Recover the typed response.
    pub fn downcast<R: Any + Send>(self) -> Option<R> {
        self.payload.downcast::<R>().ok().map(|boxed| *boxed)
    }
}

impl fmt::Debug for CtlAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CtlAnswer")
            .field("flush", &self.flush)
            .finish()
    }
}

impl CtlReq {
    /// Erase a typed request.
    pub fn new<Q: CtlRequest>(req: Q) -> Self {
        CtlReq {
            tag: TypeId::of::<Q>(),
            name: type_name::<Q>(),
            payload: Box::new(req),
        }
    }

    /// Whether this request is a `Q`.
    pub fn is<Q: CtlRequest>(&self) -> bool {
        self.tag == TypeId::of::<Q>()
    }

    /// Borrow the request as a `Q`, if it is one.
    pub fn downcast_ref<Q: CtlRequest>(&self) -> Option<&Q> {
        self.payload.downcast_ref::<Q>()
    }

    /// The request's type name, for diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for CtlReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CtlReq").field(&self.name).finish()
    }
}

type HandlerFn<R> = Box<dyn FnMut(&mut R, &dyn Any) -> Option<Box<dyn Any + Send>> + Send>;

struct CtlEntry<R> {
    tag: TypeId,
    flush: bool,
    run: HandlerFn<R>,
}

/// An enumerator's handler chain, tried in registration order.
///
/// A handler that returns `None` declines the request and the chain moves
/// on; when no handler accepts, the request passes outward unchanged.
pub struct CtlTable<R = ()> {
    entries: Vec<CtlEntry<R>>,
}

impl<R> CtlTable<R> {
    /// An empty chain: every request passes through.
    pub fn new() -> Self {
        CtlTable {
            entries: Vec::new(),
        }
    }

    /// Register a handler for requests of type `Q`.
    pub fn on<Q, F>(mut self, f: F) -> Self
    where
        Q: CtlRequest,
        F: FnMut(&mut R, &Q) -> Option<Q::Response> + Send + 'static,
    {
        self.push(false, f);
        self
    }

    /// Register a handler for requests of type `Q` whose reply is flushing:
    /// input the consumer buffered while the request was in flight is
    /// discarded (seeks invalidate read-ahead).
    pub fn on_flush<Q, F>(mut self, f: F) -> Self
    where
        Q: CtlRequest,
        F: FnMut(&mut R, &Q) -> Option<Q::Response> + Send + 'static,
    {
        self.push(true, f);
        self
    }

    fn push<Q, F>(&mut self, flush: bool, mut f: F)
    where
        Q: CtlRequest,
        F: FnMut(&mut R, &Q) -> Option<Q::Response> + Send + 'static,
    {
        self.entries.push(CtlEntry {
            tag: TypeId::of::<Q>(),
            flush,
            run: Box::new(move |res, any| {
                let req = any.downcast_ref::<Q>()?;
                f(res, req).map(|resp| Box::new(resp) as Box<dyn Any + Send>)
            }),
        });
    }

    /// Whether any handler is registered at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn dispatch(&mut self, res: &mut R, req: CtlReq) -> Dispatch {
        for entry in &mut self.entries {
            if entry.tag == req.tag {
                if let Some(payload) = (entry.run)(res, req.payload.as_ref()) {
                    return Dispatch::Reply(Some(CtlAnswer {
                        payload,
                        flush: entry.flush,
                    }));
                }
            }
        }
        Dispatch::Pass(req)
    }
}

impl<R> Default for CtlTable<R> {
    fn default() -> Self {
        CtlTable::new()
    }
}

impl<R> fmt::Debug for CtlTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CtlTable")
            .field("handlers", &self.entries.len())
            .finish()
    }
}

pub(crate) enum Dispatch {
    Reply(CtlReply),
    Pass(CtlReq),
}

/// Issue a control request and park until the reply.
///
/// Returns `None` when no enclosing enumerator handled the request.
pub fn ctl<T, Q>(req: Q) -> Iter<T, Option<Q::Response>>
where
    T: StreamData,
    Q: CtlRequest,
{
    Iter::Ctl(
        CtlReq::new(req),
        Box::new(|reply: CtlReply| {
            let resp = reply.and_then(|answer| answer.downcast::<Q::Response>());
            Iter::done(resp)
        }),
    )
}

/// Reposition the handling enumerator's source.
#[derive(Debug, Clone, Copy)]
pub struct SeekReq(pub io::SeekFrom);

impl CtlRequest for SeekReq {
    type Response = u64;
}

/// Ask for the current position of the handling enumerator's source.
#[derive(Debug, Clone, Copy)]
pub struct TellReq;

impl CtlRequest for TellReq {
    type Response = u64;
}

/// Ask for the total size of the handling enumerator's source.
#[derive(Debug, Clone, Copy)]
pub struct SizeReq;

impl CtlRequest for SizeReq {
    type Response = u64;
}

/// Ask for the raw file descriptor behind the handling enumerator's source.
#[cfg(unix)]
#[derive(Debug, Clone, Copy)]
pub struct GetFdReq;

#[cfg(unix)]
impl CtlRequest for GetFdReq {
    type Response = std::os::unix::io::RawFd;
}

/// [`ctl`] with a [`SeekReq`]; the new position on success.
pub fn seek<T: StreamData>(pos: io::SeekFrom) -> Iter<T, Option<u64>> {
    ctl(SeekReq(pos))
}

/// [`ctl`] with a [`TellReq`].
pub fn tell<T: StreamData>() -> Iter<T, Option<u64>> {
    ctl(TellReq)
}

/// [`ctl`] with a [`SizeReq`].
pub fn size<T: StreamData>() -> Iter<T, Option<u64>> {
    ctl(SizeReq)
}
