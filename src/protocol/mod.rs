//! Protocol Module
//!
//! Defines the raw API messages and their wire encoding.
//!
//! ## Protocol Format (V1 - framed bincode)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Type (1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Request Types
//! - 0x01: RAW_GET
//! - 0x02: RAW_PUT
//! - 0x03: RAW_DELETE
//! - 0x04: RAW_SCAN
//! - 0x05: PING
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: ERROR (the payload's `error` field holds the message)

mod codec;
mod message;

pub use codec::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use message::{
    Context, ErrorResponse, KvPair, RawDeleteRequest, RawDeleteResponse, RawGetRequest,
    RawGetResponse, RawPutRequest, RawPutResponse, RawScanRequest, RawScanResponse, Request,
    RequestKind, Response, Status,
};
