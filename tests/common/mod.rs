#![allow(dead_code)]

use concurrent_file_server::{AuditLog, RequestHandler, ServerConfig, ServerStats};
use parking_lot::Mutex;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use std::sync::Arc;

/// In-memory duplex stream: reads come from a fixed script, writes are kept
pub struct MockStream {
    input: Cursor<Vec<u8>>,
    pub output: Vec<u8>,
    max_read: usize,
}

impl MockStream {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: Cursor::new(input.to_vec()),
            output: Vec::new(),
            max_read: usize::MAX,
        }
    }

    /// Deliver input at most `max_read` bytes per read call
    pub fn with_max_read(mut self, max_read: usize) -> Self {
        self.max_read = max_read;
        self
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len().min(self.max_read);
        self.input.read(&mut buf[..len])
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Cloneable audit sink whose contents tests can read back
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A handler serving `root`, plus the audit sink and stats it writes to
pub fn handler_for(root: &Path) -> (RequestHandler, SharedBuffer, Arc<ServerStats>) {
    let audit = SharedBuffer::new();
    let stats = Arc::new(ServerStats::new());
    let config = ServerConfig::new().with_document_root(root);
    let handler = RequestHandler::new(&config, Arc::new(AuditLog::new(audit.clone())), stats.clone());
    (handler, audit, stats)
}

/// Run one request through `handler` and return the raw response
pub fn exchange(handler: &RequestHandler, request: &[u8]) -> String {
    let mut stream = MockStream::new(request);
    handler.serve(&mut stream).unwrap();
    stream.output_str()
}
