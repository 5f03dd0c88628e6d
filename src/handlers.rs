use crate::audit::{AuditLog, AuditRecord};
use crate::buffer::Buffer;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::http::{Method, Request, RequestParser, Response, Status};
use crate::locks::PathLocks;
use crate::stats::ServerStats;
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// How a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A response with this status was sent
    Responded(Status),
    /// The PUT payload ended early; nothing was sent back
    Aborted,
}

/// Parses one request from a connection and runs the matching method handler.
///
/// Request paths are the URI minus its leading `/`, joined onto the document
/// root with no further confinement.
pub struct RequestHandler {
    root: PathBuf,
    parser: RequestParser,
    locks: PathLocks,
    audit: Arc<AuditLog>,
    stats: Arc<ServerStats>,
    chunk_size: usize,
}

impl RequestHandler {
    pub fn new(config: &ServerConfig, audit: Arc<AuditLog>, stats: Arc<ServerStats>) -> Self {
        Self {
            root: config.document_root.clone(),
            parser: RequestParser::new(config.limits),
            locks: PathLocks::new(),
            audit,
            stats,
            chunk_size: config.transfer_chunk_size.max(1),
        }
    }

    /// Serve exactly one request on `stream`.
    ///
    /// Every failure is terminal: the caller closes the connection whatever
    /// the outcome.
    pub fn serve<S: Read + Write>(&self, stream: &mut S) -> ServerResult<Outcome> {
        let result = self.handle(stream);

        match &result {
            Ok(Outcome::Responded(status)) => self.stats.record_status(*status),
            Ok(Outcome::Aborted) => self.stats.aborted.increment(1),
            Err(_) => self.stats.failed.increment(1),
        }

        result
    }

    /// Statistics this handler updates
    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    fn handle<S: Read + Write>(&self, stream: &mut S) -> ServerResult<Outcome> {
        let mut buffer = Buffer::new(self.parser.limits().max_header_size);

        let request = match self.read_request(stream, &mut buffer) {
            Ok(request) => request,
            Err(ServerError::Parse(e)) => {
                debug!("Rejecting request: {}", e);
                return respond(stream, Status::BadRequest);
            }
            Err(e) => return Err(e),
        };

        debug!(
            "{} {} (Request-Id {})",
            request.method, request.uri, request.request_id
        );

        match request.method() {
            Some(Method::Get) => self.get(stream, &request),
            Some(Method::Head) => self.head(stream, &request),
            Some(Method::Put) => self.put(stream, &request, buffer.slice()),
            None => respond(stream, Status::NotImplemented),
        }
    }

    /// Read and validate the head, leaving any payload bytes in `buffer`
    fn read_request<R: Read>(&self, stream: &mut R, buffer: &mut Buffer) -> ServerResult<Request> {
        let head_len = self.parser.read_head(stream, buffer)?;
        let request = self.parser.parse(&buffer.slice()[..head_len])?;
        buffer.advance_read(head_len)?;
        Ok(request)
    }

    fn resolve(&self, request: &Request) -> PathBuf {
        self.root.join(request.path())
    }

    fn get<S: Write>(&self, stream: &mut S, request: &Request) -> ServerResult<Outcome> {
        let path = self.resolve(request);
        if path.is_dir() {
            return respond(stream, Status::Forbidden);
        }

        let lock = self.locks.lock_for(request.path());
        let guard = lock.read();

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) => return self.open_failed(stream, Method::Get, request, e),
        };

        let size = file.metadata()?.len();
        Response::headers_only(Status::Ok, size).write_to(stream)?;
        io::copy(&mut file.take(size), stream)?;
        stream.flush()?;
        drop(guard);

        self.audit(Method::Get, request, Status::Ok);
        Ok(Outcome::Responded(Status::Ok))
    }

    fn head<S: Write>(&self, stream: &mut S, request: &Request) -> ServerResult<Outcome> {
        let path = self.resolve(request);
        if path.is_dir() {
            return respond(stream, Status::Forbidden);
        }

        let lock = self.locks.lock_for(request.path());
        let guard = lock.read();

        let size = match File::open(&path) {
            Ok(file) => file.metadata()?.len(),
            Err(e) => return self.open_failed(stream, Method::Head, request, e),
        };
        drop(guard);

        // HEAD advertises one byte less than GET would send.
        Response::headers_only(Status::Ok, size.saturating_sub(1)).write_to(stream)?;

        self.audit(Method::Head, request, Status::Ok);
        Ok(Outcome::Responded(Status::Ok))
    }

    fn put<S: Read + Write>(
        &self,
        stream: &mut S,
        request: &Request,
        received: &[u8],
    ) -> ServerResult<Outcome> {
        let path = self.resolve(request);
        if path.is_dir() {
            return respond(stream, Status::Forbidden);
        }

        let lock = self.locks.lock_for(request.path());
        let guard = lock.write();

        let (mut file, created) = match OpenOptions::new().write(true).truncate(true).open(&path) {
            Ok(file) => (file, false),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return respond(stream, Status::Forbidden);
            }
            Err(_) => match OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)
            {
                Ok(file) => (file, true),
                Err(e) => {
                    warn!("PUT {}: cannot create {}: {}", request.uri, path.display(), e);
                    return respond(stream, Status::BadRequest);
                }
            },
        };

        let expected = request.content_length.unwrap_or(0);
        let written = self.receive_body(stream, received, &mut file, expected)?;
        drop(file);
        drop(guard);

        if written < expected {
            warn!(
                "PUT {}: client sent {} of {} bytes, dropping connection",
                request.uri, written, expected
            );
            return Ok(Outcome::Aborted);
        }

        let status = if created { Status::Created } else { Status::Ok };
        let outcome = respond(stream, status)?;
        self.audit(Method::Put, request, status);
        Ok(outcome)
    }

    /// Copy up to `expected` payload bytes into `file`, starting with the
    /// bytes that arrived alongside the head. Returns the number written,
    /// which is short of `expected` only if the client hung up.
    fn receive_body<R: Read, W: Write>(
        &self,
        stream: &mut R,
        received: &[u8],
        file: &mut W,
        expected: u64,
    ) -> ServerResult<u64> {
        let prefix_len = usize::try_from(expected).map_or(received.len(), |n| n.min(received.len()));
        file.write_all(&received[..prefix_len])?;

        let mut written = prefix_len as u64;
        let mut chunk = vec![0u8; self.chunk_size];

        while written < expected {
            let want = (expected - written).min(chunk.len() as u64) as usize;
            let bytes_read = match stream.read(&mut chunk[..want]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            file.write_all(&chunk[..bytes_read])?;
            written += bytes_read as u64;
        }

        file.flush()?;
        Ok(written)
    }

    /// Map a failed open for GET or HEAD onto a response
    fn open_failed<S: Write>(
        &self,
        stream: &mut S,
        method: Method,
        request: &Request,
        error: io::Error,
    ) -> ServerResult<Outcome> {
        match error.kind() {
            io::ErrorKind::PermissionDenied => respond(stream, Status::Forbidden),
            io::ErrorKind::NotFound => {
                let outcome = respond(stream, Status::NotFound)?;
                self.audit(method, request, Status::NotFound);
                Ok(outcome)
            }
            _ => {
                warn!("{} {}: open failed: {}", method, request.uri, error);
                respond(stream, Status::BadRequest)
            }
        }
    }

    fn audit(&self, method: Method, request: &Request, status: Status) {
        let record = AuditRecord::new(method, &request.uri, status, request.request_id);
        if let Err(e) = self.audit.record(&record) {
            warn!("Failed to write audit record {}: {}", record, e);
        }
    }
}

fn respond<W: Write>(stream: &mut W, status: Status) -> ServerResult<Outcome> {
    Response::new(status).write_to(stream)?;
    Ok(Outcome::Responded(status))
}
