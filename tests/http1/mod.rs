//! Integration tests for the HTTP/1.x parser and encoder.

use httpcore_sansio::http1::{encode_request, Error, Method, Parser, Request, Version};

#[test]
fn simple_get_request() {
    let input = b"GET /x HTTP/1.1\r\nHost: a\r\n\r\n";
    let mut parser = Parser::new();
    let mut req = Request::new();
    let consumed = parser.parse_request(input, &mut req).unwrap();

    assert_eq!(req.method, Method::Get);
    assert_eq!(req.target, b"/x");
    assert_eq!(req.version, Version::Http11);
    assert_eq!(req.headers.len(), 1);
    assert_eq!(req.headers[0].name, b"Host");
    assert_eq!(req.headers[0].value, b"a");
    assert!(req.body.is_empty());
    assert_eq!(consumed, input.len());
}

#[test]
fn chunked_body_reassembles_in_full() {
    let input = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
    let mut parser = Parser::new();
    let mut req = Request::new();
    parser.parse_request(input, &mut req).unwrap();
    assert_eq!(req.body, b"hello");
}

#[test]
fn byte_at_a_time_split_parse_matches_single_shot() {
    let input = b"GET /x HTTP/1.1\r\nHost: a\r\n\r\n";

    let mut whole_parser = Parser::new();
    let mut whole = Request::new();
    whole_parser.parse_request(input, &mut whole).unwrap();

    let mut incremental = Parser::new();
    let mut split = Request::new();
    for (i, &byte) in input.iter().enumerate() {
        let result = incremental.parse_request(&[byte], &mut split);
        if i + 1 < input.len() {
            assert!(matches!(result, Err(Error::NeedMoreData)), "expected NeedMoreData at byte {}", i);
        } else {
            result.unwrap();
        }
    }
    assert_eq!(split.method, whole.method);
    assert_eq!(split.target, whole.target);
    assert_eq!(split.headers, whole.headers);
    assert_eq!(split.body, whole.body);
}

#[test]
fn bare_lf_in_header_line_is_rejected() {
    let input = b"GET / HTTP/1.1\r\nHost: a\n\r\n";
    let mut parser = Parser::new();
    let mut req = Request::new();
    let err = parser.parse_request(input, &mut req).unwrap_err();
    assert_eq!(err, Error::InvalidHeader);
}

#[test]
fn round_trip_request_preserves_headers_and_body() {
    let mut req = Request::new();
    req.method = Method::Post;
    req.target = b"/upload".to_vec();
    req.version = Version::Http11;
    req.add_header("Host", "example.com");
    req.body = b"payload".to_vec();

    let encoded = encode_request(&req).unwrap();

    let mut parser = Parser::new();
    let mut decoded = Request::new();
    let consumed = parser.parse_request(&encoded, &mut decoded).unwrap();
    assert_eq!(consumed, encoded.len());
    assert_eq!(decoded.method, req.method);
    assert_eq!(decoded.target, req.target);
    assert_eq!(decoded.version, req.version);
    assert_eq!(decoded.headers[0].name, b"Host");
    assert_eq!(decoded.body, req.body);
}

#[test]
fn chunked_size_zero_terminates_body_and_requires_trailing_crlf() {
    let input = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n";
    let mut parser = Parser::new();
    let mut req = Request::new();
    let consumed = parser.parse_request(input, &mut req).unwrap();
    assert!(req.body.is_empty());
    assert_eq!(consumed, input.len());
}

#[test]
fn get_header_is_case_insensitive_and_returns_first_match() {
    let mut req = Request::new();
    req.add_header("Content-Type", "text/plain");
    req.add_header("content-type", "text/html");
    assert_eq!(req.get_header(b"CONTENT-TYPE"), Some(b"text/plain".as_slice()));
    assert_eq!(req.get_header(b"x-missing"), None);
}

#[test]
fn sticky_error_requires_reset_before_reuse() {
    let mut parser = Parser::new();
    let mut req = Request::new();
    let _ = parser.parse_request(b"garbage without a version\r\n\r\n", &mut req);
    let err = parser.parse_request(b"GET / HTTP/1.1\r\n\r\n", &mut req).unwrap_err();
    assert_ne!(err, Error::NeedMoreData);

    parser.reset();
    let mut req2 = Request::new();
    let consumed = parser.parse_request(b"GET / HTTP/1.1\r\n\r\n", &mut req2).unwrap();
    assert_eq!(consumed, b"GET / HTTP/1.1\r\n\r\n".len());
}
