//! Property suites for the algebraic laws: chunk monoid behaviour, stepping,
//! partitioning invariance, concatenation order and backtracking rewind.

use proptest::collection::vec;
use proptest::prelude::*;

use thresh::combinator::{copy_input, try_bi};
use thresh::sink::{collect, take_data};
use thresh::source::enum_iter;
use thresh::{Chunk, Iter};

fn data() -> impl Strategy<Value = Vec<u8>> {
    vec(any::<u8>(), 0..16)
}

fn partition() -> impl Strategy<Value = Vec<Vec<u8>>> {
    vec(data(), 0..8)
}

proptest! {
    #[test]
    fn chunk_append_is_associative(a in data(), b in data(), c in data(), eof in any::<bool>()) {
        let last = if eof { Chunk::new(c.clone()).append(Chunk::eof()) } else { Chunk::new(c.clone()) };
        let left = Chunk::new(a.clone()).append(Chunk::new(b.clone())).append(last.clone());
        let right = Chunk::new(a).append(Chunk::new(b).append(last));
        prop_assert_eq!(left, right);
    }

    #[test]
    fn the_empty_chunk_is_the_identity(a in data()) {
        let chunk = Chunk::new(a);
        prop_assert_eq!(Chunk::empty().append(chunk.clone()), chunk.clone());
        prop_assert_eq!(chunk.clone().append(Chunk::empty()), chunk);
    }

    #[test]
    fn stepping_a_finished_consumer_appends_to_its_residual(
        result in any::<u32>(),
        residual in data(),
        incoming in data(),
    ) {
        let it = Iter::Done(result, Chunk::new(residual.clone()));
        match it.step(Chunk::new(incoming.clone())) {
            Iter::Done(got, rest) => {
                prop_assert_eq!(got, result);
                let mut expected = residual;
                expected.extend_from_slice(&incoming);
                prop_assert_eq!(rest.into_data(), expected);
            }
            _ => prop_assert!(false, "stepping Done must stay Done"),
        }
    }

    #[test]
    fn collect_is_invariant_under_partitioning(parts in partition()) {
        let flat = parts.concat();
        let out = enum_iter(parts).pipe(collect()).unwrap();
        prop_assert_eq!(out, flat);
    }

    #[test]
    fn take_is_invariant_under_partitioning(parts in partition(), n in 0usize..24) {
        let flat = parts.concat();
        let chunked = enum_iter(parts).pipe(take_data(n));
        let whole = enum_iter(vec![flat.clone()]).pipe(take_data(n));
        match (chunked, whole) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(&a, &b);
                prop_assert_eq!(a, flat[..n].to_vec());
            }
            (Err(_), Err(_)) => prop_assert!(flat.len() < n),
            _ => prop_assert!(false, "partitioning changed the verdict"),
        }
    }

    #[test]
    fn concatenated_sources_preserve_total_order(a in partition(), b in partition()) {
        let mut expected = a.concat();
        expected.extend(b.concat());
        let out = enum_iter(a).cat(enum_iter(b)).pipe(collect()).unwrap();
        prop_assert_eq!(out, expected);
    }

    #[test]
    fn copied_input_is_the_concatenation_of_everything_fed(parts in partition()) {
        let flat = parts.concat();
        let (state, saved) = enum_iter(parts).pipe(copy_input(collect())).unwrap();
        prop_assert_eq!(saved.into_data(), flat.clone());
        prop_assert_eq!(state.run().unwrap(), flat);
    }

    #[test]
    fn a_rewound_parse_is_equivalent_to_parsing_from_scratch(parts in partition(), n in 8usize..24) {
        // the speculative take consumes an arbitrary amount before failing;
        // afterwards the stream reads as if it had never run
        let flat = parts.concat();
        prop_assume!(flat.len() < n);
        let speculative = try_bi(take_data(n)).and_then(|res| {
            if res.is_ok() {
                Iter::fail_msg("take past the end must fail")
            } else {
                collect()
            }
        });
        let out = enum_iter(parts).pipe(speculative).unwrap();
        prop_assert_eq!(out, flat);
    }
}
