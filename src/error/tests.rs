use super::*;

#[test]
fn io_eof_is_classified_and_unwrapped() {
    let host = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
    let err = Error::from_io(host);
    assert_eq!(err.kind(), ErrorKind::Eof);
    assert!(err.is_no_parse());

    let unwrapped = err.unwrap_eof();
    assert_eq!(unwrapped.kind(), ErrorKind::Io);
    assert!(unwrapped.to_string().contains("short read"));
}

#[test]
fn other_io_errors_are_not_parse_failures() {
    let host = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
    let err = Error::from_io(host);
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(!err.is_no_parse());
}

#[test]
fn expected_sets_merge_without_duplicates() {
    let a = Expected {
        saw: None,
        tokens: vec!["foo".to_owned(), "bar".to_owned()],
    };
    let b = Expected {
        saw: Some("baz".to_owned()),
        tokens: vec!["bar".to_owned(), "qux".to_owned()],
    };
    let merged = a.merge(b);
    assert_eq!(merged.tokens, vec!["foo", "bar", "qux"]);
    assert_eq!(merged.saw.as_deref(), Some("baz"));
}

#[test]
fn expected_renders_the_alternatives() {
    let e = Error::Expected(Expected {
        saw: Some("\"bar\"".to_owned()),
        tokens: vec!["x".to_owned(), "y".to_owned(), "z".to_owned()],
    });
    assert_eq!(e.to_string(), "expected one of {x, y, z}, saw \"bar\"");

    let single = Error::expected("foo");
    assert_eq!(single.to_string(), "expected foo");
}

#[test]
fn merge_expected_leaves_other_kinds_alone() {
    let earlier = Error::expected("foo");
    let later = Error::Generic("boom".to_owned());
    let merged = Error::merge_expected(earlier, later);
    assert_eq!(merged.kind(), ErrorKind::Generic);
}
