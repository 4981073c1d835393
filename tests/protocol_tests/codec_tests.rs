//! Codec Tests
//!
//! Tests for request and response framing.

use std::io::Cursor;

use cfkv::protocol::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, Context, KvPair, RawDeleteRequest,
    RawGetRequest, RawGetResponse, RawPutRequest, RawPutResponse, RawScanRequest,
    RawScanResponse, Request, RequestKind, Response, Status, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
use cfkv::CfkvError;

fn ctx() -> Context {
    Context {
        region_id: 3,
        term: 9,
    }
}

// =============================================================================
// Request Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_request_header_layout() {
    let request = Request::RawGet(RawGetRequest {
        context: ctx(),
        cf: "default".to_string(),
        key: b"hello".to_vec(),
    });
    let encoded = encode_request(&request).unwrap();

    assert_eq!(encoded[0], RequestKind::RawGet as u8);
    let len = u32::from_be_bytes([encoded[1], encoded[2], encoded[3], encoded[4]]) as usize;
    assert_eq!(encoded.len(), HEADER_SIZE + len);
}

#[test]
fn test_encode_decode_every_request() {
    let requests = vec![
        Request::RawGet(RawGetRequest {
            context: ctx(),
            cf: "default".to_string(),
            key: b"k".to_vec(),
        }),
        Request::RawPut(RawPutRequest {
            context: ctx(),
            cf: "lock".to_string(),
            key: vec![0x00, 0xff],
            value: (0..=255).collect(),
        }),
        Request::RawDelete(RawDeleteRequest {
            context: ctx(),
            cf: "write".to_string(),
            key: Vec::new(),
        }),
        Request::RawScan(RawScanRequest {
            context: ctx(),
            cf: "default".to_string(),
            start_key: b"a".to_vec(),
            limit: 100,
        }),
        Request::Ping,
    ];

    for request in requests {
        let encoded = encode_request(&request).unwrap();
        assert_eq!(encoded[0], request.kind() as u8);
        assert_eq!(decode_request(&encoded).unwrap(), request);
    }
}

#[test]
fn test_ping_has_empty_payload() {
    let encoded = encode_request(&Request::Ping).unwrap();
    assert_eq!(encoded, vec![0x05, 0, 0, 0, 0]);
}

#[test]
fn test_ping_with_payload_rejected() {
    let frame = vec![0x05, 0, 0, 0, 1, 0xaa];
    assert!(matches!(decode_request(&frame), Err(CfkvError::Protocol(_))));
}

#[test]
fn test_decode_unknown_request_type() {
    let frame = vec![0x7f, 0, 0, 0, 0];

    match decode_request(&frame) {
        Err(CfkvError::Protocol(msg)) => assert!(msg.contains("0x7f")),
        other => panic!("Expected protocol error, got {:?}", other),
    }
}

#[test]
fn test_decode_incomplete_header() {
    assert!(matches!(
        decode_request(&[0x01, 0, 0]),
        Err(CfkvError::Protocol(_))
    ));
}

#[test]
fn test_decode_incomplete_payload() {
    let request = Request::RawGet(RawGetRequest {
        context: ctx(),
        cf: "default".to_string(),
        key: b"k".to_vec(),
    });
    let encoded = encode_request(&request).unwrap();

    assert!(matches!(
        decode_request(&encoded[..encoded.len() - 1]),
        Err(CfkvError::Protocol(_))
    ));
}

#[test]
fn test_decode_payload_too_large() {
    let len = MAX_PAYLOAD_SIZE + 1;
    let mut frame = vec![0x01];
    frame.extend_from_slice(&len.to_be_bytes());

    assert!(matches!(decode_request(&frame), Err(CfkvError::Protocol(_))));
}

#[test]
fn test_decode_garbage_payload() {
    let frame = vec![0x01, 0, 0, 0, 2, 0xff, 0xff];
    assert!(matches!(
        decode_request(&frame),
        Err(CfkvError::Serialization(_))
    ));
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_response_ok() {
    let response = Response::RawGet(RawGetResponse {
        value: b"value".to_vec(),
        not_found: false,
        error: None,
    });
    let encoded = encode_response(&response).unwrap();

    assert_eq!(encoded[0], Status::Ok as u8);
    assert_eq!(decode_response(&encoded).unwrap(), response);
}

#[test]
fn test_encode_decode_response_error() {
    let response = Response::RawPut(RawPutResponse {
        error: Some("Column family not found: raft".to_string()),
    });
    let encoded = encode_response(&response).unwrap();

    assert_eq!(encoded[0], Status::Error as u8);
    assert_eq!(decode_response(&encoded).unwrap(), response);
}

#[test]
fn test_encode_decode_scan_and_failure() {
    let responses = vec![
        Response::RawScan(RawScanResponse {
            kvs: vec![
                KvPair {
                    key: b"a".to_vec(),
                    value: b"1".to_vec(),
                },
                KvPair {
                    key: b"b".to_vec(),
                    value: Vec::new(),
                },
            ],
            error: None,
        }),
        Response::Pong,
        Response::Failure("server busy".to_string()),
    ];

    for response in responses {
        let encoded = encode_response(&response).unwrap();
        assert_eq!(encoded[0], response.status() as u8);
        assert_eq!(decode_response(&encoded).unwrap(), response);
    }
}

#[test]
fn test_decode_response_status_mismatch() {
    let response = Response::RawPut(RawPutResponse {
        error: Some("boom".to_string()),
    });
    let mut encoded = encode_response(&response).unwrap();
    encoded[0] = Status::Ok as u8;

    assert!(matches!(
        decode_response(&encoded),
        Err(CfkvError::Protocol(_))
    ));
}

#[test]
fn test_decode_response_unknown_status() {
    let mut encoded = encode_response(&Response::Pong).unwrap();
    encoded[0] = 0x09;

    assert!(matches!(
        decode_response(&encoded),
        Err(CfkvError::Protocol(_))
    ));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_requests_back_to_back() {
    let first = Request::RawScan(RawScanRequest {
        context: Context::default(),
        cf: "default".to_string(),
        start_key: Vec::new(),
        limit: 0,
    });
    let second = Request::Ping;

    let mut buffer = Vec::new();
    write_request(&mut buffer, &first).unwrap();
    write_request(&mut buffer, &second).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_request(&mut cursor).unwrap(), first);
    assert_eq!(read_request(&mut cursor).unwrap(), second);
    assert!(matches!(read_request(&mut cursor), Err(CfkvError::Io(_))));
}

#[test]
fn test_stream_response() {
    let response = Response::RawGet(RawGetResponse {
        value: Vec::new(),
        not_found: true,
        error: None,
    });

    let mut buffer = Vec::new();
    write_response(&mut buffer, &response).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert_eq!(read_response(&mut cursor).unwrap(), response);
}

#[test]
fn test_stream_truncated_response_is_io_error() {
    let mut buffer = Vec::new();
    write_response(&mut buffer, &Response::Failure("x".to_string())).unwrap();
    buffer.truncate(buffer.len() - 1);

    let mut cursor = Cursor::new(buffer);
    assert!(matches!(read_response(&mut cursor), Err(CfkvError::Io(_))));
}
