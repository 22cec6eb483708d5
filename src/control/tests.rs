use super::*;

use crate::sink::collect;
use crate::source::enum_pure;
use crate::Chunk;

struct Rewind(u64);

impl CtlRequest for Rewind {
    type Response = u64;
}

#[test]
fn typed_requests_roundtrip_through_erasure() {
    let req = CtlReq::new(Rewind(7));
    assert!(req.is::<Rewind>());
    assert!(!req.is::<SizeReq>());
    assert_eq!(req.downcast_ref::<Rewind>().map(|r| r.0), Some(7));
    assert!(req.name().contains("Rewind"));
}

#[test]
fn ctl_recovers_the_typed_reply() {
    let it: Iter<Vec<u8>, Option<u64>> = ctl(Rewind(3));
    match it {
        Iter::Ctl(req, k) => {
            assert!(req.is::<Rewind>());
            let done = k(Some(CtlAnswer::new(9u64)));
            assert_eq!(done.run().unwrap(), Some(9));
        }
        other => panic!("unexpected state {}", other.state_name()),
    }
}

#[test]
fn a_mistyped_reply_reads_as_unhandled() {
    let it: Iter<Vec<u8>, Option<u64>> = ctl(Rewind(3));
    match it {
        Iter::Ctl(_, k) => {
            let done = k(Some(CtlAnswer::new("not a number")));
            assert_eq!(done.run().unwrap(), None);
        }
        other => panic!("unexpected state {}", other.state_name()),
    }
}

#[test]
fn a_plain_reply_delivers_input_buffered_while_parked() {
    let it: Iter<Vec<u8>, Vec<u8>> = ctl(Rewind(0)).and_then(|_| collect());
    let it = it.step(Chunk::new(b"kept".to_vec()));
    let it = match it {
        Iter::Ctl(_, k) => k(Some(CtlAnswer::new(0u64))),
        other => panic!("unexpected state {}", other.state_name()),
    };
    assert_eq!(it.run().unwrap(), b"kept".to_vec());
}

#[test]
fn a_flushing_reply_discards_input_buffered_while_parked() {
    let it: Iter<Vec<u8>, Vec<u8>> = ctl(Rewind(0)).and_then(|_| collect());
    let it = it.step(Chunk::new(b"stale".to_vec()));
    let it = match it {
        Iter::Ctl(_, k) => k(Some(CtlAnswer::flushing(0u64))),
        other => panic!("unexpected state {}", other.state_name()),
    };
    // only data arriving after the reply reaches the consumer
    let it = it.step(Chunk::new(b"fresh".to_vec()));
    assert_eq!(it.run().unwrap(), b"fresh".to_vec());
}

#[test]
fn tables_dispatch_by_tag_and_pass_unknown_requests() {
    let mut table: CtlTable<u64> = CtlTable::new().on(|res: &mut u64, req: &Rewind| {
        *res = req.0;
        Some(*res)
    });
    let mut res = 0u64;

    match table.dispatch(&mut res, CtlReq::new(Rewind(5))) {
        Dispatch::Reply(reply) => {
            let answer = reply.expect("registered request must be answered");
            assert!(!answer.flushes());
            assert_eq!(answer.downcast::<u64>(), Some(5));
        }
        Dispatch::Pass(_) => panic!("registered request must be handled"),
    }
    assert_eq!(res, 5);

    match table.dispatch(&mut res, CtlReq::new(SizeReq)) {
        Dispatch::Pass(req) => assert!(req.is::<SizeReq>()),
        Dispatch::Reply(_) => panic!("unregistered request must pass through"),
    }
}

#[test]
fn a_declined_request_moves_down_the_chain() {
    let mut table: CtlTable<()> = CtlTable::new()
        .on(|_res, _req: &Rewind| None)
        .on(|_res, req: &Rewind| Some(req.0 + 1));
    match table.dispatch(&mut (), CtlReq::new(Rewind(1))) {
        Dispatch::Reply(reply) => {
            let answer = reply.expect("second handler must answer");
            assert_eq!(answer.downcast::<u64>(), Some(2));
        }
        Dispatch::Pass(_) => panic!("second handler should have accepted"),
    }
}

#[test]
fn flush_handlers_mark_their_replies() {
    let mut table: CtlTable<()> = CtlTable::new().on_flush(|_res, req: &Rewind| Some(req.0));
    match table.dispatch(&mut (), CtlReq::new(Rewind(1))) {
        Dispatch::Reply(reply) => assert!(reply.expect("handled").flushes()),
        Dispatch::Pass(_) => panic!("registered request must be handled"),
    }
}

#[test]
fn requests_with_no_handling_enumerator_get_the_top_level_reply() {
    let probe = size().and_then(|answer: Option<u64>| {
        assert_eq!(answer, None);
        collect()
    });
    let out = enum_pure(b"abc".to_vec()).pipe(probe).unwrap();
    assert_eq!(out, b"abc".to_vec());
}
