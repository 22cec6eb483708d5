use super::*;

use std::io;

use crate::codec::{enum_i, enum_o, Codec};
use crate::error::ErrorKind;
use crate::sink::{collect, exact, null_iter, take_data};
use crate::source::{enum_iter, enum_pure};

fn broken_source(data: Vec<u8>) -> crate::Onum<Vec<u8>, Vec<u8>> {
    let mut chunks = vec![data].into_iter();
    enum_o(Codec::from_source(move || match chunks.next() {
        Some(c) => Ok(Some(c)),
        None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe burst")),
    }))
}

#[test]
fn catch_i_hands_over_the_failing_state_for_resumption() {
    let st = broken_source(b"hello".to_vec()).apply(collect());
    let st = catch_i(st, |err, failing| {
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(matches!(failing, Iter::EnumOFail(..)));
        resume_i(failing)
    });
    // the survivor picks up right where it was interrupted
    let out = enum_pure(b" world".to_vec()).pipe(st).unwrap();
    assert_eq!(out, b"hello world".to_vec());
}

#[test]
fn catch_bi_replays_everything_into_the_handler() {
    let recovered = catch_bi(take_data(10), |err| {
        assert_eq!(err.kind(), ErrorKind::Eof);
        collect()
    });
    let out = enum_pure(b"abc".to_vec()).pipe(recovered).unwrap();
    assert_eq!(out, b"abc".to_vec());
}

#[test]
fn enum_catch_ignores_transformer_failures_fused_on_later() {
    let bad = enum_i::<Vec<u8>, Vec<u8>, ()>(Codec::new(Iter::fail_msg("stage broke")));
    let src = enum_catch(enum_pure(b"x".to_vec()), |_e, _st| {
        panic!("enum_catch must not see a fused transformer's failure")
    });
    let err = src.fuse(bad).pipe(null_iter()).unwrap_err();
    assert_eq!(err.to_string(), "stage broke");
}

#[test]
fn inum_catch_sees_transformer_failures_fused_on_later() {
    let bad = enum_i::<Vec<u8>, Vec<u8>, ()>(Codec::new(Iter::fail_msg("stage broke")));
    let src = inum_catch(enum_pure(b"x".to_vec()), |e, st| {
        assert_eq!(e.to_string(), "stage broke");
        resume_i(st)
    });
    src.fuse(bad).pipe(null_iter()).unwrap();
}

#[test]
fn resume_i_is_the_identity_on_healthy_states() {
    let it: Iter<Vec<u8>, i32> = Iter::done(3);
    assert_eq!(resume_i(it).run().unwrap(), 3);

    let it: Iter<Vec<u8>, i32> = Iter::fail_msg("really failed");
    assert!(resume_i(it).run().is_err());
}

#[test]
fn verbose_resume_reports_and_resumes() {
    let st = broken_source(b"hel".to_vec()).apply(collect());
    let st = verbose_resume_i(st);
    let out = enum_pure(b"lo".to_vec()).pipe(st).unwrap();
    assert_eq!(out, b"hello".to_vec());
}

#[test]
fn try_i_reifies_the_failure_and_its_state() {
    let it: Iter<Vec<u8>, ()> = Iter::fail_msg("boom");
    match try_i(it).run().unwrap() {
        Err(TryFailure { error, state }) => {
            assert_eq!(error.to_string(), "boom");
            assert!(state.is_failure());
        }
        Ok(()) => panic!("failure expected"),
    }
}

#[test]
fn try_bi_rewinds_into_the_residual() {
    // a failing speculative parse, then a fresh parse over the same input
    let it = try_bi(take_data::<Vec<u8>>(10)).and_then(|res| {
        assert_eq!(res.unwrap_err().kind(), ErrorKind::Eof);
        collect()
    });
    let out = enum_pure(b"abc".to_vec()).pipe(it).unwrap();
    assert_eq!(out, b"abc".to_vec());
}

#[test]
fn try_bi_keeps_the_residual_on_success() {
    let it = try_bi(take_data::<Vec<u8>>(2)).and_then(|res| {
        assert_eq!(res.unwrap(), b"ab".to_vec());
        collect()
    });
    let out = enum_pure(b"abcd".to_vec()).pipe(it).unwrap();
    assert_eq!(out, b"cd".to_vec(), "success must not rewind");
}

#[test]
fn if_parse_merges_expected_sets() {
    let parser = expect_i(exact(b"foo".to_vec()), "\"foo\"")
        .or(expect_i(exact(b"for".to_vec()), "\"for\""));
    let err = enum_pure(b"fox".to_vec()).pipe(parser).unwrap_err();
    match err {
        Error::Expected(exp) => {
            assert_eq!(exp.tokens, vec!["\"foo\"", "\"for\""]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn if_parse_reraises_failures_outside_the_parse_family() {
    let hard_failure: Iter<Vec<u8>, Vec<u8>> =
        Iter::IterFail(Error::io(io::Error::new(io::ErrorKind::BrokenPipe, "io")));
    let parser = if_parse(hard_failure, Iter::done, collect());
    let err = enum_pure(b"abc".to_vec()).pipe(parser).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn multi_parse_commits_to_the_first_branch_when_it_wins() {
    let first = exact(b"abc".to_vec()).map(|_| "first");
    let second = collect().map(|_| "second");
    let got = enum_iter(vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()])
        .pipe(multi_parse(first, second))
        .unwrap();
    assert_eq!(got, "first");
}

#[test]
fn multi_parse_falls_back_without_buffering() {
    // the fallback has been consuming the same chunks all along
    let first = exact(b"abc".to_vec()).map(|_| b"abc".to_vec());
    let second = collect();
    let got = enum_iter(vec![b"a".to_vec(), b"b".to_vec(), b"x".to_vec()])
        .pipe(multi_parse(first, second))
        .unwrap();
    assert_eq!(got, b"abx".to_vec());
}

#[test]
fn multi_parse_commits_to_a_non_parse_failure_of_the_first_branch() {
    let first: Iter<Vec<u8>, ()> = Iter::NeedInput(Box::new(|_c| {
        Iter::IterFail(Error::io(io::Error::new(io::ErrorKind::BrokenPipe, "io")))
    }));
    let second = null_iter();
    let err = enum_pure(b"abc".to_vec())
        .pipe(multi_parse(first, second))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn map_exception_i_rewrites_settled_errors() {
    let it: Iter<Vec<u8>, ()> = map_exception_i(Iter::fail(Error::eof()), |e| {
        assert_eq!(e.kind(), ErrorKind::Eof);
        Error::Generic("rewritten".to_owned())
    });
    assert_eq!(it.run().unwrap_err().to_string(), "rewritten");
}

#[test]
fn expect_i_labels_parse_failures() {
    let it = expect_i(take_data::<Vec<u8>>(5), "a five-byte header");
    let err = enum_pure(b"abc".to_vec()).pipe(it).unwrap_err();
    assert_eq!(
        err.to_string(),
        "expected a five-byte header, saw end of input"
    );
}

#[test]
fn copy_input_sees_every_chunk_regardless_of_partitioning() {
    let observed = copy_input(take_data::<Vec<u8>>(4));
    let (state, saved) = enum_iter(vec![b"a".to_vec(), b"bc".to_vec(), b"de".to_vec()])
        .pipe(observed)
        .unwrap();
    assert_eq!(saved.data(), &b"abcde"[..]);
    match state {
        Iter::Done(got, rest) => {
            assert_eq!(got, b"abcd".to_vec());
            assert_eq!(rest.data(), &b"e"[..]);
        }
        other => panic!("unexpected state {}", other.state_name()),
    }
}
