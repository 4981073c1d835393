//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Type (1) │ Len (4)  │    Payload (bincode)        │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Request Type
//! - RAW_GET:    RawGetRequest
//! - RAW_PUT:    RawPutRequest
//! - RAW_DELETE: RawDeleteRequest
//! - RAW_SCAN:   RawScanRequest
//! - PING:       empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │  Payload (bincode Response) │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! The status byte and the response's embedded error must agree.

use std::io::{Read, Write};

use bytes::{BufMut, BytesMut};
use serde::Serialize;

use crate::error::{CfkvError, Result};

use super::message::RequestKind;
use super::{Request, Response, Status};

/// Header size: 1 byte type/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Framing
// =============================================================================

fn encode_frame<T: Serialize + ?Sized>(tag: u8, body: Option<&T>) -> Result<Vec<u8>> {
    let payload = match body {
        Some(body) => bincode::serialize(body)?,
        None => Vec::new(),
    };

    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(CfkvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(tag);
    message.put_u32(payload.len() as u32);
    message.put_slice(&payload);

    Ok(message.to_vec())
}

/// Split a complete frame into its tag and payload
fn split_frame(bytes: &[u8]) -> Result<(u8, &[u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(CfkvError::Protocol(format!(
            "Incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let tag = bytes[0];
    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]) as usize;

    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(CfkvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(CfkvError::Protocol(format!(
            "Incomplete payload: expected {} bytes, got {}",
            total_len,
            bytes.len()
        )));
    }

    Ok((tag, &bytes[HEADER_SIZE..total_len]))
}

/// Read one frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;

    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(CfkvError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut frame = vec![0u8; HEADER_SIZE + payload_len];
    frame[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut frame[HEADER_SIZE..])?;
    }

    Ok(frame)
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    let tag = request.kind() as u8;
    match request {
        Request::RawGet(req) => encode_frame(tag, Some(req)),
        Request::RawPut(req) => encode_frame(tag, Some(req)),
        Request::RawDelete(req) => encode_frame(tag, Some(req)),
        Request::RawScan(req) => encode_frame(tag, Some(req)),
        Request::Ping => encode_frame::<()>(tag, None),
    }
}

/// Decode a request from a complete frame
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    let (tag, payload) = split_frame(bytes)?;

    match RequestKind::try_from(tag)? {
        RequestKind::RawGet => Ok(Request::RawGet(bincode::deserialize(payload)?)),
        RequestKind::RawPut => Ok(Request::RawPut(bincode::deserialize(payload)?)),
        RequestKind::RawDelete => Ok(Request::RawDelete(bincode::deserialize(payload)?)),
        RequestKind::RawScan => Ok(Request::RawScan(bincode::deserialize(payload)?)),
        RequestKind::Ping => {
            if !payload.is_empty() {
                return Err(CfkvError::Protocol(format!(
                    "PING request: unexpected payload of {} bytes",
                    payload.len()
                )));
            }
            Ok(Request::Ping)
        }
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    encode_frame(response.status() as u8, Some(response))
}

/// Decode a response from a complete frame
///
/// Rejects frames whose status byte disagrees with the embedded error.
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (tag, payload) = split_frame(bytes)?;

    let status = match tag {
        0x00 => Status::Ok,
        0x01 => Status::Error,
        _ => {
            return Err(CfkvError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                tag
            )))
        }
    };

    let response: Response = bincode::deserialize(payload)?;
    if response.status() != status {
        return Err(CfkvError::Protocol(format!(
            "Response status {:?} does not match payload",
            status
        )));
    }

    Ok(response)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete request from a stream
///
/// Blocks until a complete request is received or an error occurs
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    let frame = read_frame(reader)?;
    decode_request(&frame)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let bytes = encode_request(request)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let frame = read_frame(reader)?;
    decode_response(&frame)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
