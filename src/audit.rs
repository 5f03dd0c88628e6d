use crate::error::ServerResult;
use crate::http::{Method, Status};
use parking_lot::Mutex;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// One line of the audit log: `METHOD,/path,STATUS,id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord<'a> {
    pub method: Method,
    pub uri: &'a str,
    pub status: Status,
    pub request_id: i64,
}

impl<'a> AuditRecord<'a> {
    pub fn new(method: Method, uri: &'a str, status: Status, request_id: i64) -> Self {
        Self {
            method,
            uri,
            status,
            request_id,
        }
    }

    /// Only successful transfers and misses are audited; 400 and 403 are not.
    pub fn is_audited(status: Status) -> bool {
        matches!(status, Status::Ok | Status::Created | Status::NotFound)
    }
}

impl fmt::Display for AuditRecord<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.method, self.uri, self.status, self.request_id)
    }
}

/// Append-only audit sink shared by every worker.
///
/// Each record is formatted up front and written under the sink's lock in one
/// `write_all` followed by a flush, so lines from different workers never mix.
pub struct AuditLog {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl AuditLog {
    /// Audit to any writer
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            sink: Mutex::new(Box::new(writer)),
        }
    }

    /// Audit to the process's standard error
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Create (or truncate) a log file and audit to it
    pub fn create<P: AsRef<Path>>(path: P) -> ServerResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::new(file))
    }

    /// Append `record` if its status is audited.
    ///
    /// Returns whether a line was written.
    pub fn record(&self, record: &AuditRecord<'_>) -> io::Result<bool> {
        if !AuditRecord::is_audited(record.status) {
            return Ok(false);
        }

        let line = format!("{}\n", record);
        let mut sink = self.sink.lock();
        sink.write_all(line.as_bytes())?;
        sink.flush()?;
        Ok(true)
    }
}
