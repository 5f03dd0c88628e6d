pub mod acceptor;
pub mod audit;
pub mod buffer;
pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod http;
pub mod locks;
pub mod queue;
pub mod server;
pub mod stats;
pub mod worker;

/// Re-exports of common components for easier access
pub use acceptor::ConnectionAcceptor;
pub use audit::{AuditLog, AuditRecord};
pub use buffer::Buffer;
pub use config::{RequestLimits, ServerConfig};
pub use connection::Connection;
pub use error::{ParseError, ServerError, ServerResult};
pub use handlers::{Outcome, RequestHandler};
pub use http::{Method, Request, RequestParser, Response, Status};
pub use locks::PathLocks;
pub use queue::BoundedQueue;
pub use server::Server;
pub use stats::{Counter, ServerStats};
pub use worker::WorkerPool;
