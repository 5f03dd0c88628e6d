mod common;

use common::SharedBuffer;
use concurrent_file_server::{AuditLog, Server, ServerConfig, ServerStats, Status};
use std::fs;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct TestServer {
    addr: SocketAddr,
    audit: SharedBuffer,
    stats: Arc<ServerStats>,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start(root: &Path, workers: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let audit = SharedBuffer::new();
        let config = ServerConfig::new()
            .with_worker_threads(workers)
            .with_document_root(root)
            .with_accept_poll_interval(Duration::from_millis(5));

        let server = Server::with_listener(config, listener, AuditLog::new(audit.clone())).unwrap();
        let addr = server.local_addr().unwrap();
        let stats = server.stats();
        let shutdown = server.shutdown_handle();
        let handle = thread::spawn(move || server.run().unwrap());

        Self {
            addr,
            audit,
            stats,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Send one request and read until the server closes the connection
    fn request(&self, bytes: &[u8]) -> Vec<u8> {
        let mut client = TcpStream::connect(self.addr).unwrap();
        client.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        client.write_all(bytes).unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).unwrap();
        response
    }

    fn request_str(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(&self.request(bytes)).into_owned()
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[test]
fn test_put_get_head_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), 4);

    let response = server.request_str(b"PUT /test.txt HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello");
    assert_eq!(response, "HTTP/1.1 201 Created\r\nContent-Length: 8\r\n\r\nCreated\n");
    assert_eq!(fs::read(dir.path().join("test.txt")).unwrap(), b"hello");

    let response = server.request_str(b"GET /test.txt HTTP/1.1\r\nRequest-Id: 7\r\n\r\n");
    assert_eq!(response, "HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello");

    let response = server.request_str(b"HEAD /test.txt HTTP/1.1\r\n\r\n");
    assert_eq!(response, "HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\n");

    let response = server.request_str(b"GET /missing.txt HTTP/1.1\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));

    assert_eq!(
        server.audit.lines(),
        vec![
            "PUT,/test.txt,201,0",
            "GET,/test.txt,200,7",
            "HEAD,/test.txt,200,0",
            "GET,/missing.txt,404,0",
        ]
    );
}

#[test]
fn test_put_payload_sent_after_head() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), 2);

    let mut client = TcpStream::connect(server.addr).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    client.write_all(b"PUT /late.txt HTTP/1.1\r\nContent-Length: 10\r\n\r\n").unwrap();
    thread::sleep(Duration::from_millis(50));
    client.write_all(b"0123456789").unwrap();

    let mut response = String::new();
    client.read_to_string(&mut response).unwrap();

    assert!(response.starts_with("HTTP/1.1 201 Created\r\n"));
    assert_eq!(fs::read(dir.path().join("late.txt")).unwrap(), b"0123456789");
}

#[test]
fn test_bad_and_unsupported_requests_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("folder")).unwrap();
    let server = TestServer::start(dir.path(), 2);

    assert!(server
        .request_str(b"GET /x HTTP/1.1 extra\r\n\r\n")
        .starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(server
        .request_str(b"POST /x HTTP/1.1\r\n\r\n")
        .starts_with("HTTP/1.1 501 Not Implemented\r\n"));
    assert!(server
        .request_str(b"GET /folder HTTP/1.1\r\n\r\n")
        .starts_with("HTTP/1.1 403 Forbidden\r\n"));

    // A full buffer without a terminator is rejected
    let oversized = vec![b'A'; 4096];
    assert!(server.request_str(&oversized).starts_with("HTTP/1.1 400 Bad Request\r\n"));

    assert!(server.audit.lines().is_empty());
}

#[test]
fn test_client_closing_early_gets_no_response() {
    let dir = tempfile::tempdir().unwrap();
    let server = TestServer::start(dir.path(), 2);

    let mut client = TcpStream::connect(server.addr).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
    client.write_all(b"PUT /cut.txt HTTP/1.1\r\nContent-Length: 100\r\n\r\npartial").unwrap();
    client.shutdown(std::net::Shutdown::Write).unwrap();

    let mut response = Vec::new();
    client.read_to_end(&mut response).unwrap();
    assert!(response.is_empty());
    assert!(server.audit.lines().is_empty());
}

#[test]
fn test_many_concurrent_clients() {
    const CLIENTS: usize = 24;

    let dir = tempfile::tempdir().unwrap();
    let server = Arc::new(TestServer::start(dir.path(), 3));

    let handles: Vec<_> = (0..CLIENTS)
        .map(|i| {
            let server = server.clone();
            thread::spawn(move || {
                let body = format!("client {} payload", i);
                let put = format!(
                    "PUT /file{}.txt HTTP/1.1\r\nContent-Length: {}\r\nRequest-Id: {}\r\n\r\n{}",
                    i,
                    body.len(),
                    i,
                    body
                );
                let response = server.request_str(put.as_bytes());
                assert!(response.starts_with("HTTP/1.1 201 Created\r\n"), "{}", response);

                let get = format!("GET /file{}.txt HTTP/1.1\r\n\r\n", i);
                let response = server.request_str(get.as_bytes());
                assert!(response.ends_with(&body), "{}", response);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(server.stats.status_count(Status::Created), CLIENTS);
    assert_eq!(server.stats.status_count(Status::Ok), CLIENTS);
    assert_eq!(server.audit.lines().len(), CLIENTS * 2);
}

#[test]
fn test_concurrent_puts_to_same_path_stay_whole() {
    const WRITERS: usize = 8;
    const SIZE: usize = 64 * 1024;

    let dir = tempfile::tempdir().unwrap();
    let server = Arc::new(TestServer::start(dir.path(), 4));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let server = server.clone();
            thread::spawn(move || {
                let mut request = format!("PUT /shared.bin HTTP/1.1\r\nContent-Length: {}\r\n\r\n", SIZE).into_bytes();
                request.extend(std::iter::repeat(b'a' + i as u8).take(SIZE));
                let response = server.request_str(&request);
                assert!(response.starts_with("HTTP/1.1 20"), "{}", response);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Writes to one path are serialized, so the file holds one writer's payload
    let contents = fs::read(dir.path().join("shared.bin")).unwrap();
    assert_eq!(contents.len(), SIZE);
    assert!(contents.iter().all(|&b| b == contents[0]));

    let response = server.request_str(b"GET /shared.bin HTTP/1.1\r\n\r\n");
    assert!(response.starts_with(&format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n", SIZE)));
}

#[test]
fn test_shutdown_returns_without_new_connection() {
    let dir = tempfile::tempdir().unwrap();
    let mut server = TestServer::start(dir.path(), 1);

    thread::sleep(Duration::from_millis(20));
    server.stop();

    assert_eq!(server.stats.accepted.value(), 0);
}
