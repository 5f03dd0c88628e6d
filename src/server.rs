use crate::acceptor::ConnectionAcceptor;
use crate::audit::AuditLog;
use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::ServerResult;
use crate::handlers::RequestHandler;
use crate::queue::BoundedQueue;
use crate::stats::ServerStats;
use crate::worker::WorkerPool;
use log::info;
use std::io;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// The assembled server: one acceptor thread feeding a bounded queue drained
/// by a fixed worker pool.
pub struct Server {
    config: ServerConfig,
    acceptor: ConnectionAcceptor,
    queue: Arc<BoundedQueue<Connection>>,
    handler: Arc<RequestHandler>,
    stats: Arc<ServerStats>,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the configured address and open the configured audit log
    pub fn bind(config: ServerConfig) -> ServerResult<Self> {
        config.validate()?;

        let acceptor = ConnectionAcceptor::new(
            config.socket_address(),
            config.backlog_size,
            config.accept_poll_interval,
        )?;

        let audit = match &config.log_file {
            Some(path) => AuditLog::create(path)?,
            None => AuditLog::stderr(),
        };

        Self::assemble(config, acceptor, audit)
    }

    /// Build a server around a listener and audit log created by the caller
    pub fn with_listener(config: ServerConfig, listener: TcpListener, audit: AuditLog) -> ServerResult<Self> {
        config.validate()?;
        let acceptor = ConnectionAcceptor::from_listener(listener, config.accept_poll_interval)?;
        Self::assemble(config, acceptor, audit)
    }

    fn assemble(config: ServerConfig, acceptor: ConnectionAcceptor, audit: AuditLog) -> ServerResult<Self> {
        let stats = Arc::new(ServerStats::new());
        let handler = Arc::new(RequestHandler::new(&config, Arc::new(audit), stats.clone()));
        let queue = Arc::new(BoundedQueue::new(config.queue_capacity())?);

        Ok(Self {
            config,
            acceptor,
            queue,
            handler,
            stats,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that stops the accept loop once set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Address the server listens on
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.acceptor.local_addr()
    }

    /// Running totals
    pub fn stats(&self) -> Arc<ServerStats> {
        self.stats.clone()
    }

    /// Get the configuration the server was built with
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Start the workers and accept connections on the calling thread until
    /// the shutdown flag is set.
    ///
    /// Workers are left running when this returns; process exit ends them.
    pub fn run(&self) -> ServerResult<()> {
        let pool = WorkerPool::spawn(self.config.worker_threads, self.queue.clone(), self.handler.clone())?;

        info!(
            "Serving {} with {} workers and {} queue slots",
            self.config.document_root.display(),
            pool.size(),
            self.queue.capacity()
        );

        self.acceptor.run(&self.queue, &self.shutdown, &self.stats);

        info!("Shutting down: {}", self.stats.format());
        Ok(())
    }
}
