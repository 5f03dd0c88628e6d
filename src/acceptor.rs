use crate::connection::Connection;
use crate::queue::BoundedQueue;
use crate::stats::ServerStats;
use log::{debug, info, warn};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Accepts TCP connections and feeds them into the work queue.
///
/// The listener is non-blocking: when no client is waiting the acceptor sleeps
/// for `poll_interval` and re-checks the shutdown flag, so stopping the server
/// never waits on the next inbound connection.
pub struct ConnectionAcceptor {
    listener: TcpListener,
    address: SocketAddr,
    connection_count: AtomicUsize,
    poll_interval: Duration,
}

impl ConnectionAcceptor {
    /// Create a new connection acceptor bound to the specified address
    pub fn new<A: ToSocketAddrs>(addr: A, backlog: i32, poll_interval: Duration) -> io::Result<Self> {
        let socket_addr = addr.to_socket_addrs()?.next().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "No socket addresses found")
        })?;

        let socket = Self::create_socket(&socket_addr, backlog)?;
        Self::from_listener(socket.into(), poll_interval)
    }

    /// Wrap a listener created elsewhere
    pub fn from_listener(listener: TcpListener, poll_interval: Duration) -> io::Result<Self> {
        listener.set_nonblocking(true)?;
        let address = listener.local_addr()?;

        Ok(Self {
            listener,
            address,
            connection_count: AtomicUsize::new(0),
            poll_interval,
        })
    }

    /// Accept a new connection, or fail with `WouldBlock` if none is pending
    pub fn accept(&self) -> io::Result<Connection> {
        let (stream, addr) = self.listener.accept()?;
        let count = self.connection_count.fetch_add(1, Ordering::Relaxed);
        Connection::new(stream, addr, count)
    }

    /// Accept connections into `queue` until `shutdown` is set.
    ///
    /// Pushing blocks while the queue is full, which stops accepting until a
    /// worker frees a slot. Failed accepts are logged and retried after
    /// `poll_interval`.
    pub fn run(&self, queue: &BoundedQueue<Connection>, shutdown: &AtomicBool, stats: &ServerStats) {
        info!("Accepting connections on {}", self.address);
        accept_loop(|| self.accept(), queue, shutdown, stats, self.poll_interval);
        info!("Stopped accepting connections on {}", self.address);
    }

    /// Get the local address this acceptor is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Create a properly configured socket
    fn create_socket(addr: &SocketAddr, backlog: i32) -> io::Result<Socket> {
        let domain = if addr.is_ipv6() {
            Domain::IPV6
        } else {
            Domain::IPV4
        };

        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;

        socket.set_nonblocking(true)?;
        socket.set_reuse_address(true)?;

        let sock_addr = socket2::SockAddr::from(*addr);
        socket.bind(&sock_addr)?;
        socket.listen(backlog)?;

        Ok(socket)
    }
}

/// Drive `accept` until `shutdown` is set. Every failure, including an empty
/// backlog, waits `poll_interval` before the next attempt.
fn accept_loop<F>(
    mut accept: F,
    queue: &BoundedQueue<Connection>,
    shutdown: &AtomicBool,
    stats: &ServerStats,
    poll_interval: Duration,
) where
    F: FnMut() -> io::Result<Connection>,
{
    while !shutdown.load(Ordering::Acquire) {
        match accept() {
            Ok(connection) => {
                debug!("Accepted connection {} from {}", connection.id(), connection.peer_addr());
                stats.accepted.increment(1);
                queue.push(connection);
            }
            Err(e) => {
                if e.kind() != io::ErrorKind::WouldBlock {
                    warn!("Accept failed, retrying in {:?}: {}", poll_interval, e);
                }
                thread::sleep(poll_interval);
            }
        }
    }
}
