use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};

/// An accepted client connection.
///
/// Owns its socket outright: it moves from the acceptor into the queue and
/// from there to exactly one worker, and the socket closes when it drops.
pub struct Connection {
    stream: TcpStream,
    peer_addr: SocketAddr,
    id: usize,
}

impl Connection {
    /// Create a new connection from a TcpStream
    pub fn new(stream: TcpStream, peer_addr: SocketAddr, id: usize) -> io::Result<Self> {
        // Workers use plain blocking I/O; some platforms hand accepted sockets
        // the listener's non-blocking flag.
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            peer_addr,
            id,
        })
    }

    /// Signal end of response to the peer and close the connection
    pub fn close(self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Write) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }

    /// Get the connection's peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the connection's unique ID
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
