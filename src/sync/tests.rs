use super::*;

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use crate::sink::{collect, fold};
use crate::source::enum_pure;

#[test]
fn loopback_carries_chunks_across_threads_in_order() {
    let (tx, rx) = iter_loop::<Vec<u8>, Vec<u8>>();

    let feeder = thread::spawn(move || {
        tx.step(Chunk::new(b"one ".to_vec()))
            .step(Chunk::new(b"two ".to_vec()))
            .step(Chunk::new(b"three".to_vec()))
            .step(Chunk::eof())
            .run()
    });

    let out = rx.pipe(collect()).unwrap();
    assert_eq!(out, b"one two three".to_vec());
    feeder.join().unwrap().unwrap();
}

#[test]
fn loopback_source_stops_at_the_mailbox_eof_without_ending_the_consumer() {
    let (tx, rx) = iter_loop::<Vec<u8>, Vec<u8>>();
    let tx = tx.step(Chunk::new(b"ab".to_vec())).step(Chunk::eof());
    assert!(tx.is_done());

    let st = rx.apply(collect());
    assert!(st.wants_input(), "loopback must not feed EOF downstream");
    let out = enum_pure(b"cd".to_vec()).pipe(st).unwrap();
    assert_eq!(out, b"abcd".to_vec());
}

#[test]
fn split_serialises_concurrent_producers() {
    let split = inum_split(fold(0usize, |acc, data: Vec<u8>| acc + data.len()));

    let mut feeders = Vec::new();
    for _ in 0..4 {
        let branch = split.branch();
        feeders.push(thread::spawn(move || {
            let mut branch = branch;
            for _ in 0..50 {
                branch = branch.step(Chunk::new(vec![0u8; 3]));
            }
            branch.step(Chunk::eof()).run()
        }));
    }
    for f in feeders {
        f.join().unwrap().unwrap();
    }

    assert_eq!(split.finish().unwrap(), 4 * 50 * 3);
}

#[test]
fn a_branch_eof_does_not_finish_the_shared_consumer() {
    let split = inum_split(collect::<Vec<u8>>());

    let one = split.branch().step(Chunk::new(b"ab".to_vec()));
    one.step(Chunk::eof()).run().unwrap();

    let two = split.branch().step(Chunk::new(b"cd".to_vec()));
    two.step(Chunk::eof()).run().unwrap();

    assert_eq!(split.finish().unwrap(), b"abcd".to_vec());
}

#[test]
fn finishing_a_split_twice_is_an_error() {
    let split = inum_split(collect::<Vec<u8>>());
    let again = split.clone();
    split.finish().unwrap();
    assert!(again.finish().is_err());
}

#[test]
fn pair_finalizer_fires_once_after_both_halves_complete() {
    let fired = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&fired);

    let (iter, onum) = pair_finalizer(collect::<Vec<u8>>(), enum_pure(b"ab".to_vec()), move || {
        count.fetch_add(1, Ordering::SeqCst);
    });

    let st = onum.apply(iter);
    assert_eq!(fired.load(Ordering::SeqCst), 0, "consumer is still live");

    assert_eq!(st.run().unwrap(), b"ab".to_vec());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn pair_finalizer_fires_on_failure_paths_too() {
    let fired = Arc::new(AtomicUsize::new(0));
    let count = Arc::clone(&fired);

    let consumer: Iter<Vec<u8>, Vec<u8>> = Iter::fail_msg("sink broke");
    let (iter, onum) = pair_finalizer(consumer, enum_pure(b"ab".to_vec()), move || {
        count.fetch_add(1, Ordering::SeqCst);
    });

    let st = onum.apply(iter);
    assert!(st.run().is_err());
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}
