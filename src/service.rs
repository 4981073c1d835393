//! Raw API Service
//!
//! The four raw key-value handlers, built on a [`Storage`] engine.
//!
//! ## Responsibilities
//! - Get/Scan read through a per-request snapshot reader, released when the
//!   handler returns on any path
//! - Put/Delete submit a single-record write batch
//! - Absent keys are not errors: Get sets `not_found`, Delete succeeds
//!
//! Handlers return one `Result`. [`RawKvService::handle`] is the transport
//! boundary: it always produces a response and embeds a failure's message in
//! the response's `error` field.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::Result;
use crate::protocol::{
    ErrorResponse, KvPair, RawDeleteRequest, RawDeleteResponse, RawGetRequest, RawGetResponse,
    RawPutRequest, RawPutResponse, RawScanRequest, RawScanResponse, Request, Response,
};
use crate::storage::{Storage, StorageReader, WriteBatch};

/// Request handlers for the raw key-value API
///
/// Holds no locks of its own; concurrent calls are isolated by the engine.
pub struct RawKvService<S> {
    storage: Arc<S>,
}

impl<S> Clone for RawKvService<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> RawKvService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// The engine behind this service
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Look up one key
    pub fn raw_get(&self, req: &RawGetRequest) -> Result<RawGetResponse> {
        let reader = self.storage.reader(&req.context)?;
        let value = reader.get_cf(&req.cf, &req.key)?;

        Ok(match value {
            Some(value) => RawGetResponse {
                value: value.to_vec(),
                ..Default::default()
            },
            None => RawGetResponse {
                not_found: true,
                ..Default::default()
            },
        })
    }

    /// Write one key
    pub fn raw_put(&self, req: RawPutRequest) -> Result<RawPutResponse> {
        let mut batch = WriteBatch::new();
        batch.put(req.cf, Bytes::from(req.key), Bytes::from(req.value));
        self.storage.write(&req.context, batch)?;

        Ok(RawPutResponse::default())
    }

    /// Remove one key; removing an absent key succeeds
    pub fn raw_delete(&self, req: RawDeleteRequest) -> Result<RawDeleteResponse> {
        let mut batch = WriteBatch::new();
        batch.delete(req.cf, Bytes::from(req.key));
        self.storage.write(&req.context, batch)?;

        Ok(RawDeleteResponse::default())
    }

    /// Return up to `limit` pairs with key >= `start_key`, in key order
    ///
    /// A failed value read fails the whole scan; pairs collected before it
    /// are dropped.
    pub fn raw_scan(&self, req: &RawScanRequest) -> Result<RawScanResponse> {
        if req.limit == 0 {
            return Ok(RawScanResponse::default());
        }

        let reader = self.storage.reader(&req.context)?;
        let mut iter = reader.iter_cf(&req.cf);
        let limit = req.limit as usize;
        let mut kvs = Vec::new();

        iter.seek(&req.start_key);
        while iter.valid() && kvs.len() < limit {
            let Some(item) = iter.item() else {
                break;
            };
            let value = item.value()?;
            kvs.push(KvPair {
                key: item.key().to_vec(),
                value: value.to_vec(),
            });
            iter.next();
        }
        iter.status()?;

        Ok(RawScanResponse { kvs, error: None })
    }

    /// Dispatch a decoded request, always producing a response
    pub fn handle(&self, request: Request) -> Response {
        match request {
            Request::RawGet(req) => {
                tracing::debug!(cf = %req.cf, key_len = req.key.len(), "raw_get");
                Response::RawGet(respond("raw_get", self.raw_get(&req)))
            }
            Request::RawPut(req) => {
                tracing::debug!(
                    cf = %req.cf,
                    key_len = req.key.len(),
                    value_len = req.value.len(),
                    "raw_put"
                );
                Response::RawPut(respond("raw_put", self.raw_put(req)))
            }
            Request::RawDelete(req) => {
                tracing::debug!(cf = %req.cf, key_len = req.key.len(), "raw_delete");
                Response::RawDelete(respond("raw_delete", self.raw_delete(req)))
            }
            Request::RawScan(req) => {
                tracing::debug!(cf = %req.cf, limit = req.limit, "raw_scan");
                Response::RawScan(respond("raw_scan", self.raw_scan(&req)))
            }
            Request::Ping => Response::Pong,
        }
    }
}

/// Fold a handler result into its response, embedding any error
fn respond<R: ErrorResponse>(op: &'static str, result: Result<R>) -> R {
    result.unwrap_or_else(|e| {
        tracing::warn!(op, error = %e, "raw request failed");
        R::from_error(&e)
    })
}
