//! TCP Client
//!
//! Blocking client for the raw key-value API.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{CfkvError, Result};
use crate::protocol::{
    read_response, write_request, Context, KvPair, RawDeleteRequest, RawGetRequest,
    RawPutRequest, RawScanRequest, Request, Response,
};

/// A connection to a cfkv server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,

    /// Context attached to every request
    context: Context,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| CfkvError::Network(format!("connect failed: {}", e)))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
            context: Context::default(),
        })
    }

    /// Use `context` for subsequent requests
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Set a timeout for waiting on responses
    pub fn set_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send one request and wait for its response
    ///
    /// A response carrying an error becomes `CfkvError::Remote`.
    pub fn call(&mut self, request: &Request) -> Result<Response> {
        write_request(&mut self.writer, request)?;
        let response = read_response(&mut self.reader)?;

        match response.error() {
            Some(message) => Err(CfkvError::Remote(message.to_string())),
            None => Ok(response),
        }
    }

    /// Get a value; `Ok(None)` when the key is absent
    pub fn raw_get(&mut self, cf: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let request = Request::RawGet(RawGetRequest {
            context: self.context,
            cf: cf.to_string(),
            key: key.to_vec(),
        });

        match self.call(&request)? {
            Response::RawGet(resp) if resp.not_found => Ok(None),
            Response::RawGet(resp) => Ok(Some(resp.value)),
            other => Err(unexpected("RawGet", &other)),
        }
    }

    pub fn raw_put(&mut self, cf: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let request = Request::RawPut(RawPutRequest {
            context: self.context,
            cf: cf.to_string(),
            key: key.to_vec(),
            value: value.to_vec(),
        });

        match self.call(&request)? {
            Response::RawPut(_) => Ok(()),
            other => Err(unexpected("RawPut", &other)),
        }
    }

    pub fn raw_delete(&mut self, cf: &str, key: &[u8]) -> Result<()> {
        let request = Request::RawDelete(RawDeleteRequest {
            context: self.context,
            cf: cf.to_string(),
            key: key.to_vec(),
        });

        match self.call(&request)? {
            Response::RawDelete(_) => Ok(()),
            other => Err(unexpected("RawDelete", &other)),
        }
    }

    /// Scan up to `limit` pairs starting at `start_key`
    pub fn raw_scan(&mut self, cf: &str, start_key: &[u8], limit: u32) -> Result<Vec<KvPair>> {
        let request = Request::RawScan(RawScanRequest {
            context: self.context,
            cf: cf.to_string(),
            start_key: start_key.to_vec(),
            limit,
        });

        match self.call(&request)? {
            Response::RawScan(resp) => Ok(resp.kvs),
            other => Err(unexpected("RawScan", &other)),
        }
    }

    /// Health check
    pub fn ping(&mut self) -> Result<()> {
        match self.call(&Request::Ping)? {
            Response::Pong => Ok(()),
            other => Err(unexpected("Pong", &other)),
        }
    }
}

fn unexpected(expected: &str, got: &Response) -> CfkvError {
    CfkvError::Protocol(format!("expected {} response, got {:?}", expected, got))
}
