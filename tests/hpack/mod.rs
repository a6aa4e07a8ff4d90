//! Integration tests for the HPACK encoder/decoder pair.

use httpcore_sansio::hpack::{Decoder, Encoder, HeaderToEncode};

#[test]
fn round_trip_with_incremental_indexing_grows_dynamic_table() {
    let headers = vec![
        HeaderToEncode::new(b":method".to_vec(), b"GET".to_vec()),
        HeaderToEncode::new(b":path".to_vec(), b"/".to_vec()),
        HeaderToEncode::new(b":scheme".to_vec(), b"https".to_vec()),
        HeaderToEncode::new(b":authority".to_vec(), b"example.com".to_vec()),
        HeaderToEncode::new(b"custom-key".to_vec(), b"custom-value".to_vec()),
    ];

    let mut encoder = Encoder::new(4096);
    let block = encoder.encode_fields(&headers);

    let mut decoder = Decoder::new(4096);
    let decoded = decoder.decode(&block).unwrap();

    assert_eq!(decoded.len(), headers.len());
    for (input, output) in headers.iter().zip(decoded.iter()) {
        assert_eq!(input.name, output.name);
        assert_eq!(input.value, output.value);
    }
}

#[test]
fn header_block_split_across_two_decode_calls_on_same_table() {
    let mut encoder = Encoder::new(4096);
    let first_block = encoder.encode(&[(b":method".to_vec(), b"GET".to_vec())]);
    let second_block = encoder.encode(&[(b"x-custom".to_vec(), b"value".to_vec())]);

    let mut decoder = Decoder::new(4096);
    let first = decoder.decode(&first_block).unwrap();
    let second = decoder.decode(&second_block).unwrap();

    assert_eq!(first[0].name, b":method");
    assert_eq!(second[0].name, b"x-custom");
}

#[test]
fn sensitive_header_is_never_indexed_on_either_side() {
    let mut encoder = Encoder::new(4096);
    let block = encoder.encode_fields(&[HeaderToEncode::sensitive(
        b"authorization".to_vec(),
        b"sekrit".to_vec(),
    )]);

    let mut decoder = Decoder::new(4096);
    let decoded = decoder.decode(&block).unwrap();
    assert!(decoded[0].never_indexed);
    assert_eq!(decoded[0].value, b"sekrit");
}

#[test]
fn table_sized_to_exactly_one_entry_evicts_on_the_next_insert() {
    // RFC 7541 §4.1: entry size = len(name) + len(value) + 32. A table
    // capped at exactly that size holds the entry but evicts it the
    // moment a second distinct entry is inserted.
    let name = b"custom-key".to_vec();
    let value = b"custom-value".to_vec();
    let entry_size = 32 + name.len() + value.len();

    let mut encoder = Encoder::new(entry_size);
    let mut decoder = Decoder::new(entry_size);

    let first_block = encoder.encode(&[(name.clone(), value.clone())]);
    let first = decoder.decode(&first_block).unwrap();
    assert_eq!(first[0].value, value);

    let second_block = encoder.encode(&[(b"other-key-x".to_vec(), b"other-value1".to_vec())]);
    let second = decoder.decode(&second_block).unwrap();
    assert_eq!(second[0].name, b"other-key-x");
}

#[test]
fn shrinking_table_size_is_emitted_and_applied_before_the_next_block() {
    let mut encoder = Encoder::new(4096);
    encoder.encode(&[(b"x-custom".to_vec(), b"value".to_vec())]);
    encoder.set_max_table_size(0);
    let block = encoder.encode(&[(b"x-custom".to_vec(), b"value".to_vec())]);

    let mut decoder = Decoder::new(4096);
    let decoded = decoder.decode(&block).unwrap();
    assert_eq!(decoded[0].name, b"x-custom");
}
