use crate::connection::Connection;
use crate::error::ServerResult;
use crate::handlers::{Outcome, RequestHandler};
use crate::queue::BoundedQueue;
use log::{debug, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// A fixed set of threads draining the connection queue.
///
/// Workers run for the life of the process: each pops a connection, serves
/// one request on it and closes it, forever. There is no drain or teardown.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `size` workers
    pub fn spawn(
        size: usize,
        queue: Arc<BoundedQueue<Connection>>,
        handler: Arc<RequestHandler>,
    ) -> ServerResult<Self> {
        let mut handles = Vec::with_capacity(size);

        for id in 0..size {
            let queue = queue.clone();
            let handler = handler.clone();
            let handle = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker_loop(id, &queue, &handler))?;
            handles.push(handle);
        }

        Ok(Self { handles })
    }

    /// Number of workers started
    pub fn size(&self) -> usize {
        self.handles.len()
    }
}

fn worker_loop(id: usize, queue: &BoundedQueue<Connection>, handler: &RequestHandler) {
    debug!("Worker {} started", id);

    loop {
        let mut connection = queue.pop();
        let conn_id = connection.id();

        match handler.serve(&mut connection) {
            Ok(Outcome::Responded(status)) => {
                debug!("Worker {}: connection {} answered {}", id, conn_id, status);
            }
            Ok(Outcome::Aborted) => {
                debug!("Worker {}: connection {} aborted", id, conn_id);
            }
            Err(e) => {
                warn!("Worker {}: connection {} from {} failed: {}", id, conn_id, connection.peer_addr(), e);
            }
        }

        if let Err(e) = connection.close() {
            debug!("Worker {}: closing connection {}: {}", id, conn_id, e);
        }
    }
}
