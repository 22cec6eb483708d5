//! Elementary consumers
//!
//! The small vocabulary of consumers everything else is phrased in: take so
//! many elements, match a literal, read a line, drain the stream. They obey
//! the consumer obligations: ask for input only while a result is
//! undecidable, and at EOF either finish with what they have or fail with an
//! end-of-stream error that backtracking treats as a parse failure.

use std::io::Write;

use crate::chunk::Chunk;
use crate::chunk::SizedData;
use crate::chunk::StreamData;
use crate::error::Error;
use crate::error::Expected;
use crate::Iter;


/// Consume and discard the rest of the stream.
pub fn null_iter<T: StreamData>() -> Iter<T, ()> {
    Iter::NeedInput(Box::new(|c: Chunk<T>| {
        if c.is_eof() {
            Iter::Done((), Chunk::eof())
        } else {
            null_iter()
        }
    }))
}

/// Gather the whole stream into one payload.
///
/// # Example
///
/// ```rust
/// use thresh::sink::collect;
/// use thresh::source::enum_pure;
///
/// let all = enum_pure(b"hello".to_vec()).pipe(collect()).unwrap();
/// assert_eq!(all, b"hello".to_vec());
/// ```
pub fn collect<T: StreamData>() -> Iter<T, T> {
    collect_go(T::empty())
}

fn collect_go<T: StreamData>(acc: T) -> Iter<T, T> {
    Iter::NeedInput(Box::new(move |c: Chunk<T>| {
        let (data, eof) = c.into_parts();
        let acc = acc.append(data);
        if eof {
            Iter::Done(acc, Chunk::eof())
        } else {
            collect_go(acc)
        }
    }))
}

/// Fold the stream's payloads into an accumulator.
pub fn fold<T, B, F>(init: B, f: F) -> Iter<T, B>
where
    T: StreamData,
    B: Send + 'static,
    F: FnMut(B, T) -> B + Send + 'static,
{
    Iter::NeedInput(Box::new(move |c: Chunk<T>| {
        let mut f = f;
        let (data, eof) = c.into_parts();
        let acc = if data.is_empty() { init } else { f(init, data) };
        if eof {
            Iter::Done(acc, Chunk::eof())
        } else {
            fold(acc, f)
        }
    }))
}

/// Look at the next non-empty payload without consuming it.
///
/// At EOF the payload is empty.
pub fn peek_chunk<T: StreamData>() -> Iter<T, T> {
    Iter::NeedInput(Box::new(|c: Chunk<T>| {
        if c.is_empty() && !c.is_eof() {
            peek_chunk()
        } else {
            Iter::Done(c.data().clone(), c)
        }
    }))
}

/// Take the first element of the stream, leaving the rest as residual.
///
/// Fails with an end-of-stream error on an empty stream.
///
/// # Example
///
/// ```rust
/// use thresh::sink::head;
/// use thresh::source::enum_pure;
///
/// let first = enum_pure(b"abc".to_vec()).pipe(head()).unwrap();
/// assert_eq!(first, b'a');
/// ```
pub fn head<E>() -> Iter<Vec<E>, E>
where
    E: Clone + Send + 'static,
{
    Iter::NeedInput(Box::new(|c: Chunk<Vec<E>>| {
        let (mut data, eof) = c.into_parts();
        if data.is_empty() {
            if eof {
                Iter::IterFail(Error::eof())
            } else {
                head()
            }
        } else {
            let first = data.remove(0);
            let residual = if eof {
                Chunk::new(data).with_eof()
            } else {
                Chunk::new(data)
            };
            Iter::Done(first, residual)
        }
    }))
}

/// Take exactly `n` elements, leaving the rest as residual.
///
/// Fails with an end-of-stream error when the stream ends short of `n`.
pub fn take_data<T: SizedData>(n: usize) -> Iter<T, T> {
    take_go(T::empty(), n)
}

fn take_go<T: SizedData>(acc: T, want: usize) -> Iter<T, T> {
    if want == 0 {
        return Iter::done(acc);
    }
    Iter::NeedInput(Box::new(move |c: Chunk<T>| {
        let (data, eof) = c.into_parts();
        if data.len() >= want {
            let (head, rest) = data.split_at(want);
            let residual = if eof {
                Chunk::new(rest).with_eof()
            } else {
                Chunk::new(rest)
            };
            Iter::Done(acc.append(head), residual)
        } else if eof {
            Iter::IterFail(Error::eof())
        } else {
            let want = want - data.len();
            take_go(acc.append(data), want)
        }
    }))
}

/// Match a literal payload, failing with an expected-token error otherwise.
///
/// The whole literal's worth of input is consumed before the comparison, so
/// wrap in [`try_bi`][crate::combinator::try_bi]-based combinators to
/// backtrack a mismatch.
pub fn exact<T>(pattern: T) -> Iter<T, T>
where
    T: SizedData + PartialEq + std::fmt::Debug,
{
    let token = format!("{pattern:?}");
    take_data(pattern.len()).and_then(move |got| {
        if got == pattern {
            Iter::done(got)
        } else {
            Iter::IterFail(Error::Expected(Expected {
                saw: Some(format!("{got:?}")),
                tokens: vec![token],
            }))
        }
    })
}

/// Read one `\n`-terminated line, consuming the terminator.
///
/// A trailing `\r` is stripped. At EOF, a non-empty partial line is returned
/// as a line; an empty one is an end-of-stream failure.
///
/// # Example
///
/// ```rust
/// use thresh::sink::line;
/// use thresh::source::enum_pure;
///
/// let first = enum_pure(b"hello\nworld".to_vec()).pipe(line()).unwrap();
/// assert_eq!(first, b"hello".to_vec());
/// ```
pub fn line() -> Iter<Vec<u8>, Vec<u8>> {
    line_go(Vec::new())
}

fn line_go(mut acc: Vec<u8>) -> Iter<Vec<u8>, Vec<u8>> {
    Iter::NeedInput(Box::new(move |c: Chunk<Vec<u8>>| {
        let (mut data, eof) = c.into_parts();
        match find_newline(&data) {
            Some(i) => {
                let rest = data.split_off(i + 1);
                data.pop();
                acc.extend_from_slice(&data);
                if acc.last() == Some(&b'\r') {
                    acc.pop();
                }
                let residual = if eof {
                    Chunk::new(rest).with_eof()
                } else {
                    Chunk::new(rest)
                };
                Iter::Done(acc, residual)
            }
            None => {
                acc.extend_from_slice(&data);
                if !eof {
                    line_go(acc)
                } else if acc.is_empty() {
                    Iter::IterFail(Error::eof())
                } else {
                    Iter::Done(acc, Chunk::eof())
                }
            }
        }
    }))
}

#[cfg(feature = "simd")]
fn find_newline(haystack: &[u8]) -> Option<usize> {
    memchr::memchr(b'\n', haystack)
}

#[cfg(not(feature = "simd"))]
fn find_newline(haystack: &[u8]) -> Option<usize> {
    haystack.iter().position(|&b| b == b'\n')
}

/// Copy the stream into a writer, flushing and returning it at EOF.
pub fn writer_iter<W>(writer: W) -> Iter<Vec<u8>, W>
where
    W: Write + Send + 'static,
{
    Iter::NeedInput(Box::new(move |c: Chunk<Vec<u8>>| {
        let mut writer = writer;
        let (data, eof) = c.into_parts();
        if let Err(e) = writer.write_all(&data) {
            return Iter::IterFail(Error::io(e));
        }
        if !eof {
            return writer_iter(writer);
        }
        match writer.flush() {
            Ok(()) => Iter::Done(writer, Chunk::eof()),
            Err(e) => Iter::IterFail(Error::io(e)),
        }
    }))
}
