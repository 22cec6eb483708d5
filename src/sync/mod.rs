//! Crossing task boundaries
//!
//! The pipeline core is single-threaded and cooperative; these are the three
//! sanctioned points where state is shared between tasks, each guarded by
//! its own lock with one owner:
//!
//! - [`iter_loop`]: a consumer/producer pair around a mailbox, for feeding a
//!   pipeline from one task and draining it in another,
//! - [`inum_split`]: serialised access to one consumer from several
//!   producers,
//! - [`pair_finalizer`]: a joint finaliser that runs once both halves of a
//!   consumer/producer pair have completed.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;

use crate::chunk::Chunk;
use crate::chunk::StreamData;
use crate::enumerator::Onum;
use crate::error::Error;
use crate::Iter;

#[cfg(test)]
mod tests;

struct Mailbox<T> {
    queue: Mutex<VecDeque<Chunk<T>>>,
    ready: Condvar,
}

impl<T: StreamData> Mailbox<T> {
    fn send(&self, chunk: Chunk<T>) {
        let mut queue = self.queue.lock().expect("mailbox lock poisoned");
        queue.push_back(chunk);
        self.ready.notify_one();
    }

    fn recv(&self) -> Chunk<T> {
        let mut queue = self.queue.lock().expect("mailbox lock poisoned");
        loop {
            if let Some(chunk) = queue.pop_front() {
                return chunk;
            }
            queue = self.ready.wait(queue).expect("mailbox lock poisoned");
        }
    }
}

/// A consumer/producer pair sharing a mailbox.
///
/// Chunks fed to the consumer half in one task come back out of the
/// producer half, in order, wherever it is applied, typically in another
/// task. An EOF chunk into the consumer finishes it and makes the producer
/// terminate once the queue is drained; like any producer, it never feeds
/// the EOF itself downstream.
///
/// # Example
///
/// ```rust
/// use thresh::sink::collect;
/// use thresh::sync::iter_loop;
/// use thresh::Chunk;
///
/// let (tx, rx) = iter_loop::<Vec<u8>, Vec<u8>>();
/// let feeder = std::thread::spawn(move || {
///     tx.step(Chunk::new(b"hi".to_vec())).step(Chunk::eof()).run()
/// });
/// assert_eq!(rx.pipe(collect()).unwrap(), b"hi".to_vec());
/// feeder.join().unwrap().unwrap();
/// ```
pub fn iter_loop<T, A>() -> (Iter<T, ()>, Onum<T, A>)
where
    T: StreamData,
    A: Send + 'static,
{
    let mailbox = Arc::new(Mailbox::<T> {
        queue: Mutex::new(VecDeque::new()),
        ready: Condvar::new(),
    });
    let sink = loop_sink(Arc::clone(&mailbox));
    let source = Onum::new(move |iter| {
        let mut iter = iter;
        loop {
            iter = match iter {
                Iter::Ctl(_, k) => k(None),
                st @ Iter::NeedInput(_) => {
                    let (data, eof) = mailbox.recv().into_parts();
                    let st = if data.is_empty() {
                        st
                    } else {
                        st.step(Chunk::new(data))
                    };
                    if eof {
                        return st;
                    }
                    st
                }
                st => return st,
            };
        }
    });
    (sink, source)
}

fn loop_sink<T: StreamData>(mailbox: Arc<Mailbox<T>>) -> Iter<T, ()> {
    Iter::NeedInput(Box::new(move |c: Chunk<T>| {
        let eof = c.is_eof();
        mailbox.send(c);
        if eof {
            Iter::Done((), Chunk::eof())
        } else {
            loop_sink(mailbox)
        }
    }))
}

/// Serialised access to one consumer from several producers.
///
/// Every handle and branch steps the same underlying consumer through a
/// lock. An EOF on a branch finishes that branch only; the shared consumer
/// is driven to its result by [`finish`][SplitIter::finish].
pub struct SplitIter<T, A> {
    shared: Arc<Mutex<Option<Iter<T, A>>>>,
}

impl<T, A> Clone for SplitIter<T, A> {
    fn clone(&self) -> Self {
        SplitIter {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, A> std::fmt::Debug for SplitIter<T, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SplitIter")
    }
}

/// Guard a consumer so that it is safe to step from several producers.
pub fn inum_split<T, A>(iter: Iter<T, A>) -> SplitIter<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    SplitIter {
        shared: Arc::new(Mutex::new(Some(iter))),
    }
}

impl<T, A> SplitIter<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    /// A consumer that forwards its input into the shared one.
    ///
    /// Data chunks are forwarded under the lock, one step at a time; an EOF
    /// chunk finishes this branch without touching the shared consumer.
    pub fn branch(&self) -> Iter<T, ()> {
        branch_go(Arc::clone(&self.shared))
    }

    /// Stop accepting input and drive the shared consumer to its result.
    pub fn finish(self) -> Result<A, Error> {
        let iter = self
            .shared
            .lock()
            .expect("splitter lock poisoned")
            .take()
            .ok_or_else(|| Error::Generic("split consumer already finished".to_owned()))?;
        iter.run()
    }
}

fn branch_go<T, A>(shared: Arc<Mutex<Option<Iter<T, A>>>>) -> Iter<T, ()>
where
    T: StreamData,
    A: Send + 'static,
{
    Iter::NeedInput(Box::new(move |c: Chunk<T>| {
        let (data, eof) = c.into_parts();
        if !data.is_empty() {
            let mut guard = shared.lock().expect("splitter lock poisoned");
            if let Some(inner) = guard.take() {
                *guard = Some(inner.step(Chunk::new(data)));
            }
        }
        if eof {
            Iter::Done((), Chunk::eof())
        } else {
            branch_go(shared)
        }
    }))
}

struct PairFlag {
    state: Mutex<PairState>,
}

struct PairState {
    iter_done: bool,
    enum_done: bool,
    finalize: Option<Box<dyn FnOnce() + Send>>,
}

impl PairFlag {
    fn mark(&self, iter_side: bool) {
        let mut state = self.state.lock().expect("finalizer lock poisoned");
        if iter_side {
            state.iter_done = true;
        } else {
            state.enum_done = true;
        }
        if state.iter_done && state.enum_done {
            if let Some(finalize) = state.finalize.take() {
                finalize();
            }
        }
    }
}

/// Tie a consumer and a producer to a joint finaliser.
///
/// `finalize` runs exactly once, when the consumer half has settled (result
/// or failure) *and* the producer half has been applied and returned. The
/// single-shot flag makes the release idempotent however the two halves
/// finish.
pub fn pair_finalizer<T, A, F>(
    iter: Iter<T, A>,
    onum: Onum<T, A>,
    finalize: F,
) -> (Iter<T, A>, Onum<T, A>)
where
    T: StreamData,
    A: Send + 'static,
    F: FnOnce() + Send + 'static,
{
    let flag = Arc::new(PairFlag {
        state: Mutex::new(PairState {
            iter_done: false,
            enum_done: false,
            finalize: Some(Box::new(finalize)),
        }),
    });
    let iter = watch(iter, Arc::clone(&flag));
    let onum = Onum::new(move |i| {
        let st = onum.apply(i);
        flag.mark(false);
        st
    });
    (iter, onum)
}

fn watch<T, A>(iter: Iter<T, A>, flag: Arc<PairFlag>) -> Iter<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    match iter {
        Iter::NeedInput(f) => {
            Iter::NeedInput(Box::new(move |c| watch(Iter::NeedInput(f).step(c), flag)))
        }
        Iter::Ctl(req, k) => Iter::Ctl(req, Box::new(move |r| watch(k(r), flag))),
        terminal => {
            flag.mark(true);
            terminal
        }
    }
}
