use crate::error::{ServerError, ServerResult};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of worker threads when `-t` is not given
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Largest request head (request line, headers and blank line) accepted
pub const MAX_HEADER_SIZE: usize = 4096;

/// Longest accepted method token
pub const MAX_METHOD_LEN: usize = 8;

/// Longest accepted request target, leading `/` included
pub const MAX_URI_LEN: usize = 19;

/// Size of each read while receiving a PUT payload
pub const TRANSFER_CHUNK_SIZE: usize = 2048;

/// Rejection thresholds applied by the request parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    pub max_header_size: usize,
    pub max_method_len: usize,
    pub max_uri_len: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_header_size: MAX_HEADER_SIZE,
            max_method_len: MAX_METHOD_LEN,
            max_uri_len: MAX_URI_LEN,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Network configuration
    pub listen_address: String,
    pub port: u16,
    pub backlog_size: i32,

    // Thread configuration
    pub worker_threads: usize,
    /// Queue slots; `None` sizes the queue to the worker count
    pub queue_capacity: Option<usize>,

    // Audit log destination; standard error when unset
    pub log_file: Option<PathBuf>,

    // Filesystem namespace served
    pub document_root: PathBuf,

    // HTTP configuration
    pub limits: RequestLimits,
    pub transfer_chunk_size: usize,

    /// Sleep between accept attempts while no client is waiting
    pub accept_poll_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0".to_string(),
            port: 8080,
            backlog_size: 128,

            worker_threads: DEFAULT_WORKER_THREADS,
            queue_capacity: None,

            log_file: None,

            document_root: PathBuf::from("."),

            limits: RequestLimits::default(),
            transfer_chunk_size: TRANSFER_CHUNK_SIZE,

            accept_poll_interval: Duration::from_millis(50),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from command-line arguments (program name excluded).
    ///
    /// The last argument is the port. `-t <n>` sets the worker count and
    /// `-l <path>` the audit log file; both also accept the value glued to the
    /// flag (`-t8`). Any other flag is ignored.
    pub fn from_args<I, S>(args: I) -> ServerResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let (port_arg, options) = match args.split_last() {
            Some(split) => split,
            None => return Err(ServerError::Config("missing port argument".to_string())),
        };

        let port = port_arg
            .parse::<u16>()
            .map_err(|_| ServerError::Config(format!("invalid port: {}", port_arg)))?;

        let mut config = Self::new().with_port(port);
        let mut iter = options.iter();

        while let Some(arg) = iter.next() {
            let mut chars = match arg.strip_prefix('-') {
                Some(rest) => rest.chars(),
                None => continue,
            };
            let flag = match chars.next() {
                Some(flag @ ('t' | 'l')) => flag,
                _ => continue,
            };
            let inline = chars.as_str();

            let value = if inline.is_empty() {
                iter.next().cloned().ok_or_else(|| {
                    ServerError::Config(format!("option -{} requires a value", flag))
                })?
            } else {
                inline.to_string()
            };

            match flag {
                't' => {
                    let threads = value
                        .parse::<usize>()
                        .ok()
                        .filter(|&n| n > 0)
                        .ok_or_else(|| ServerError::Config(format!("invalid thread count: {}", value)))?;
                    config.worker_threads = threads;
                }
                _ => config.log_file = Some(PathBuf::from(value)),
            }
        }

        Ok(config)
    }

    /// Set the address and port to listen on
    pub fn with_address(mut self, address: &str, port: u16) -> Self {
        self.listen_address = address.to_string();
        self.port = port;
        self
    }

    /// Set the port to listen on
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the number of worker threads
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Set the number of queue slots independently of the worker count
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Write audit records to a file instead of standard error
    pub fn with_log_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Set the directory request paths are resolved against
    pub fn with_document_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.document_root = root.into();
        self
    }

    /// Set how long the acceptor sleeps when no connection is pending
    pub fn with_accept_poll_interval(mut self, interval: Duration) -> Self {
        self.accept_poll_interval = interval;
        self
    }

    /// Effective queue capacity
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.worker_threads)
    }

    /// Get the full address string (address:port)
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.listen_address, self.port)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> ServerResult<()> {
        if self.worker_threads == 0 {
            return Err(ServerError::Config("worker thread count must be at least 1".to_string()));
        }
        if self.queue_capacity() == 0 {
            return Err(ServerError::Config("queue capacity must be at least 1".to_string()));
        }
        if self.transfer_chunk_size == 0 {
            return Err(ServerError::Config("transfer chunk size must be at least 1".to_string()));
        }
        if self.limits.max_header_size < 4 {
            return Err(ServerError::Config(format!(
                "header limit of {} bytes cannot hold a request",
                self.limits.max_header_size
            )));
        }
        Ok(())
    }
}
