use crate::http::Status;
use std::fmt::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A simple counter that can be incremented atomically
#[derive(Debug)]
pub struct Counter {
    value: AtomicUsize,
}

impl Counter {
    /// Create a new counter with an initial value
    pub fn new(initial_value: usize) -> Self {
        Self {
            value: AtomicUsize::new(initial_value),
        }
    }

    /// Increment the counter by a specific amount
    pub fn increment(&self, amount: usize) {
        self.value.fetch_add(amount, Ordering::Relaxed);
    }

    /// Get the current value of the counter
    pub fn value(&self) -> usize {
        self.value.load(Ordering::Relaxed)
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(0)
    }
}

/// Running totals of what the server has done, shared by acceptor and workers
#[derive(Debug, Default)]
pub struct ServerStats {
    /// Connections handed to the queue
    pub accepted: Counter,

    pub ok: Counter,
    pub created: Counter,
    pub bad_request: Counter,
    pub forbidden: Counter,
    pub not_found: Counter,
    pub internal_error: Counter,
    pub not_implemented: Counter,

    /// PUT payloads cut short by the client; no response was sent
    pub aborted: Counter,
    /// Connections that failed with an I/O error
    pub failed: Counter,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a response sent with `status`
    pub fn record_status(&self, status: Status) {
        self.status_counter(status).increment(1);
    }

    /// Responses sent with `status` so far
    pub fn status_count(&self, status: Status) -> usize {
        self.status_counter(status).value()
    }

    fn status_counter(&self, status: Status) -> &Counter {
        match status {
            Status::Ok => &self.ok,
            Status::Created => &self.created,
            Status::BadRequest => &self.bad_request,
            Status::Forbidden => &self.forbidden,
            Status::NotFound => &self.not_found,
            Status::InternalServerError => &self.internal_error,
            Status::NotImplemented => &self.not_implemented,
        }
    }

    /// Total responses sent
    pub fn responses(&self) -> usize {
        [
            Status::Ok,
            Status::Created,
            Status::BadRequest,
            Status::Forbidden,
            Status::NotFound,
            Status::InternalServerError,
            Status::NotImplemented,
        ]
        .iter()
        .map(|&status| self.status_count(status))
        .sum()
    }

    /// Format the totals as a single log line
    pub fn format(&self) -> String {
        let mut output = String::new();

        let _ = write!(
            output,
            "accepted={} responses={} 200={} 201={} 400={} 403={} 404={} 500={} 501={} aborted={} failed={}",
            self.accepted.value(),
            self.responses(),
            self.ok.value(),
            self.created.value(),
            self.bad_request.value(),
            self.forbidden.value(),
            self.not_found.value(),
            self.internal_error.value(),
            self.not_implemented.value(),
            self.aborted.value(),
            self.failed.value(),
        );

        output
    }
}
