//! Message definitions
//!
//! Request and response shapes for the raw key-value API.

use serde::{Deserialize, Serialize};

use crate::error::CfkvError;

/// Request context, passed through to the storage engine untouched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub region_id: u64,
    pub term: u64,
}

/// A key-value pair returned by a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvPair {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGetRequest {
    pub context: Context,
    pub cf: String,
    pub key: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPutRequest {
    pub context: Context,
    pub cf: String,
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDeleteRequest {
    pub context: Context,
    pub cf: String,
    pub key: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawScanRequest {
    pub context: Context,
    pub cf: String,
    pub start_key: Vec<u8>,
    /// Maximum number of pairs to return; 0 returns nothing
    pub limit: u32,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGetResponse {
    pub value: Vec<u8>,
    pub not_found: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPutResponse {
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDeleteResponse {
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawScanResponse {
    pub kvs: Vec<KvPair>,
    pub error: Option<String>,
}

/// Responses that can carry an error message instead of a result
pub trait ErrorResponse: Default {
    /// Build the failure response for `err`
    fn from_error(err: &CfkvError) -> Self;

    /// The embedded error message, if the call failed
    fn error(&self) -> Option<&str>;
}

macro_rules! impl_error_response {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ErrorResponse for $ty {
                fn from_error(err: &CfkvError) -> Self {
                    Self {
                        error: Some(err.to_string()),
                        ..Default::default()
                    }
                }

                fn error(&self) -> Option<&str> {
                    self.error.as_deref()
                }
            }
        )*
    };
}

impl_error_response!(
    RawGetResponse,
    RawPutResponse,
    RawDeleteResponse,
    RawScanResponse,
);

// =============================================================================
// Envelopes
// =============================================================================

/// Request types on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestKind {
    RawGet = 0x01,
    RawPut = 0x02,
    RawDelete = 0x03,
    RawScan = 0x04,
    Ping = 0x05,
}

impl TryFrom<u8> for RequestKind {
    type Error = CfkvError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0x01 => Ok(RequestKind::RawGet),
            0x02 => Ok(RequestKind::RawPut),
            0x03 => Ok(RequestKind::RawDelete),
            0x04 => Ok(RequestKind::RawScan),
            0x05 => Ok(RequestKind::Ping),
            _ => Err(CfkvError::Protocol(format!(
                "Unknown request type: 0x{:02x}",
                byte
            ))),
        }
    }
}

/// A request from a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    RawGet(RawGetRequest),
    RawPut(RawPutRequest),
    RawDelete(RawDeleteRequest),
    RawScan(RawScanRequest),

    /// Health check
    Ping,
}

impl Request {
    /// Get the request type
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::RawGet(_) => RequestKind::RawGet,
            Request::RawPut(_) => RequestKind::RawPut,
            Request::RawDelete(_) => RequestKind::RawDelete,
            Request::RawScan(_) => RequestKind::RawScan,
            Request::Ping => RequestKind::Ping,
        }
    }
}

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    Error = 0x01,
}

/// A response to a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    RawGet(RawGetResponse),
    RawPut(RawPutResponse),
    RawDelete(RawDeleteResponse),
    RawScan(RawScanResponse),
    Pong,

    /// The request could not be decoded or dispatched
    Failure(String),
}

impl Response {
    /// The embedded error message, if the call failed
    pub fn error(&self) -> Option<&str> {
        match self {
            Response::RawGet(r) => r.error(),
            Response::RawPut(r) => r.error(),
            Response::RawDelete(r) => r.error(),
            Response::RawScan(r) => r.error(),
            Response::Pong => None,
            Response::Failure(msg) => Some(msg),
        }
    }

    /// Status carried in the frame header
    pub fn status(&self) -> Status {
        if self.error().is_some() {
            Status::Error
        } else {
            Status::Ok
        }
    }
}
