//! Elementary producers
//!
//! In-memory and `std::io`-backed sources. The file enumerator doubles as
//! the worked example for bracketed resources and control handling: it owns
//! the open file for exactly the duration of the feed and answers
//! seek/tell/size requests from downstream consumers.

use std::fs::File;
use std::io;
use std::io::Seek;
use std::path::Path;

use crate::chunk::Chunk;
use crate::chunk::StreamData;
use crate::codec::enum_bracket;
use crate::codec::enum_bracket_ctl;
use crate::codec::enum_o;
use crate::codec::Codec;
use crate::control::CtlTable;
use crate::control::SeekReq;
use crate::control::SizeReq;
use crate::control::TellReq;
use crate::enumerator::Onum;
use crate::Iter;


/// How much [`enum_reader`] and [`enum_file`] read per chunk.
pub const READ_CHUNK: usize = 8 * 1024;

/// Feed one in-memory payload.
///
/// # Example
///
/// ```rust
/// use thresh::sink::collect;
/// use thresh::source::enum_pure;
///
/// let out = enum_pure(b"hello".to_vec()).pipe(collect()).unwrap();
/// assert_eq!(out, b"hello".to_vec());
/// ```
pub fn enum_pure<T, A>(data: T) -> Onum<T, A>
where
    T: StreamData,
    A: Send + 'static,
{
    Onum::new(move |iter| {
        let mut iter = iter;
        loop {
            iter = match iter {
                st @ Iter::NeedInput(_) => return st.step(Chunk::new(data)),
                Iter::Ctl(_, k) => k(None),
                st => return st,
            };
        }
    })
}

/// Feed a sequence of payloads, one chunk each.
pub fn enum_iter<T, A, I>(chunks: I) -> Onum<T, A>
where
    T: StreamData,
    A: Send + 'static,
    I: IntoIterator<Item = T>,
    I::IntoIter: Send + 'static,
{
    let mut chunks = chunks.into_iter();
    enum_o(Codec::from_source(move || Ok(chunks.next())))
}

/// Feed everything a reader produces, in [`READ_CHUNK`]-sized chunks.
///
/// The reader is owned for the duration of the feed and dropped when the
/// source terminates, on every path.
pub fn enum_reader<R, A>(reader: R) -> Onum<Vec<u8>, A>
where
    R: io::Read + Send + 'static,
    A: Send + 'static,
{
    enum_bracket(move || Ok(reader), |_| Ok(()), read_some)
}

/// Feed a file's contents, answering seek, tell and size requests.
///
/// A downstream [`seek`][crate::control::seek] repositions the feed; the
/// reply is the new offset.
pub fn enum_file<A, P>(path: P) -> Onum<Vec<u8>, A>
where
    A: Send + 'static,
    P: AsRef<Path>,
{
    let path = path.as_ref().to_owned();
    let table = CtlTable::new()
        .on_flush(|file: &mut File, req: &SeekReq| file.seek(req.0).ok())
        .on(|file: &mut File, _req: &TellReq| file.stream_position().ok())
        .on(|file: &mut File, _req: &SizeReq| file.metadata().ok().map(|m| m.len()));
    #[cfg(unix)]
    let table = table.on(|file: &mut File, _req: &crate::control::GetFdReq| {
        use std::os::unix::io::AsRawFd;
        Some(file.as_raw_fd())
    });
    enum_bracket_ctl(move || File::open(path), |_| Ok(()), read_some, table)
}

fn read_some<R: io::Read>(reader: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(n) => {
                buf.truncate(n);
                return Ok(Some(buf));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
