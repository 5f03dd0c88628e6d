use crate::buffer::Buffer;
use crate::config::RequestLimits;
use crate::error::{ParseError, ServerError, ServerResult};
use std::fmt;
use std::io::{self, Read, Write};
use std::str;

/// Marks the end of the request head
pub const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";

const CRLF: &[u8] = b"\r\n";

/// The only protocol version accepted
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// HTTP Status Codes the server produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok = 200,
    Created = 201,

    BadRequest = 400,
    Forbidden = 403,
    NotFound = 404,

    InternalServerError = 500,
    NotImplemented = 501,
}

impl Status {
    /// Numeric status code
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the text description for this status code
    pub fn as_str(&self) -> &'static str {
        match *self {
            Status::Ok => "OK",
            Status::Created => "Created",

            Status::BadRequest => "Bad Request",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",

            Status::InternalServerError => "Internal Server Error",
            Status::NotImplemented => "Not Implemented",
        }
    }

    /// Fixed body sent with a bodiless outcome
    pub fn body(&self) -> &'static str {
        match *self {
            Status::Ok => "OK\n",
            Status::Created => "Created\n",

            Status::BadRequest => "Bad Request\n",
            Status::Forbidden => "Forbidden\n",
            Status::NotFound => "Not Found\n",

            Status::InternalServerError => "Internal Server Error\n",
            Status::NotImplemented => "Not Implemented\n",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// HTTP Methods with a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Put,
}

impl Method {
    /// Exact, case-sensitive match on a method token
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Method::Get),
            "HEAD" => Some(Method::Head),
            "PUT" => Some(Method::Put),
            _ => None,
        }
    }

    /// Convert the method to a string
    pub fn as_str(&self) -> &'static str {
        match *self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request head
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Method token as received; any alphabetic token passes validation
    pub method: String,
    pub uri: String,
    pub version: String,
    /// Payload size announced for PUT
    pub content_length: Option<u64>,
    /// Client-chosen identifier echoed into the audit log
    pub request_id: i64,
}

impl Request {
    /// The handler for this method, if there is one
    pub fn method(&self) -> Option<Method> {
        Method::from_token(&self.method)
    }

    /// The request target without its leading `/`, used as a relative path
    pub fn path(&self) -> &str {
        self.uri.strip_prefix('/').unwrap_or(&self.uri)
    }
}

/// Single-pass reader and validator for request heads
#[derive(Debug, Clone)]
pub struct RequestParser {
    limits: RequestLimits,
}

impl RequestParser {
    /// Create a parser enforcing the given limits
    pub fn new(limits: RequestLimits) -> Self {
        Self { limits }
    }

    /// Limits enforced by this parser
    pub fn limits(&self) -> &RequestLimits {
        &self.limits
    }

    /// Read from `reader` until the head terminator is buffered.
    ///
    /// Returns the head length, terminator included. Bytes past the head stay
    /// in `buffer`; for PUT they are the start of the payload. The buffer's
    /// capacity is the head size limit.
    pub fn read_head<R: Read>(&self, reader: &mut R, buffer: &mut Buffer) -> ServerResult<usize> {
        loop {
            if let Some(pos) = buffer.find(HEAD_TERMINATOR) {
                return Ok(pos + HEAD_TERMINATOR.len());
            }

            if buffer.is_full() {
                return Err(ParseError::TooLarge(buffer.capacity()).into());
            }

            match buffer.read_from(reader) {
                Ok(0) => return Err(ParseError::Incomplete.into()),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(ServerError::Io(e)),
            }
        }
    }

    /// Validate a complete head (terminator included) into a [`Request`].
    ///
    /// Checks run in order and the first failure wins: request line shape,
    /// method, URI, version, then each header line.
    pub fn parse(&self, head: &[u8]) -> Result<Request, ParseError> {
        if head.len() > self.limits.max_header_size {
            return Err(ParseError::TooLarge(self.limits.max_header_size));
        }
        let head = head
            .strip_suffix(HEAD_TERMINATOR)
            .ok_or(ParseError::Incomplete)?;

        let line_end = find(head, CRLF).unwrap_or(head.len());
        let request_line = &head[..line_end];
        let mut header_block = head.get(line_end + CRLF.len()..).unwrap_or_default();

        if request_line.iter().filter(|&&b| b == b' ').count() != 2 {
            return Err(ParseError::RequestLine);
        }

        let mut tokens = request_line.splitn(3, |&b| b == b' ');
        let (method, uri, version) = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(method), Some(uri), Some(version)) => (method, uri, version),
            _ => return Err(ParseError::RequestLine),
        };

        let method = self.validate_method(method)?;
        let uri = self.validate_uri(uri)?;
        if version != HTTP_VERSION.as_bytes() {
            return Err(ParseError::Version);
        }

        let mut request = Request {
            method,
            uri,
            version: HTTP_VERSION.to_string(),
            content_length: None,
            request_id: 0,
        };

        while !header_block.is_empty() {
            let (line, rest) = match find(header_block, CRLF) {
                Some(pos) => (&header_block[..pos], &header_block[pos + CRLF.len()..]),
                None => (header_block, &header_block[header_block.len()..]),
            };
            parse_header(line, &mut request)?;
            header_block = rest;
        }

        Ok(request)
    }

    fn validate_method(&self, token: &[u8]) -> Result<String, ParseError> {
        if token.is_empty()
            || token.len() > self.limits.max_method_len
            || !token.iter().all(u8::is_ascii_alphabetic)
        {
            return Err(ParseError::Method);
        }
        Ok(ascii_string(token))
    }

    fn validate_uri(&self, token: &[u8]) -> Result<String, ParseError> {
        match token.split_first() {
            Some((&b'/', rest))
                if token.len() <= self.limits.max_uri_len
                    && rest
                        .iter()
                        .all(|&b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-') =>
            {
                Ok(ascii_string(token))
            }
            _ => Err(ParseError::Uri),
        }
    }
}

/// Check one `Key: Value` line and apply it if the key is recognised
fn parse_header(line: &[u8], request: &mut Request) -> Result<(), ParseError> {
    let colon = line.iter().position(|&b| b == b':').ok_or(ParseError::Header)?;
    let key = &line[..colon];

    if key.is_empty() || key.contains(&b' ') || line.get(colon + 1) != Some(&b' ') {
        return Err(ParseError::Header);
    }
    let value = &line[colon + 2..];
    if value.first() == Some(&b' ') {
        return Err(ParseError::Header);
    }

    match key {
        b"Content-Length" => {
            request.content_length = Some(parse_number(value, "Content-Length")?);
        }
        b"Request-Id" => {
            request.request_id = parse_number(value, "Request-Id")?;
        }
        _ => {}
    }

    Ok(())
}

/// Plain decimal with an optional leading `-`; `N` decides whether a sign is allowed.
fn parse_number<N: str::FromStr>(value: &[u8], header: &'static str) -> Result<N, ParseError> {
    let digits = value.strip_prefix(b"-").unwrap_or(value);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(ParseError::HeaderValue(header));
    }

    str::from_utf8(value)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(ParseError::HeaderValue(header))
}

/// Callers only pass bytes already checked to be ASCII.
fn ascii_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// A status line, `Content-Length`, and an optional body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub content_length: u64,
    pub body: &'static [u8],
}

impl Response {
    /// The fixed response for an outcome, body included
    pub fn new(status: Status) -> Self {
        let body = status.body().as_bytes();
        Self {
            status,
            content_length: body.len() as u64,
            body,
        }
    }

    /// A status line announcing `content_length` bytes the caller sends itself
    pub fn headers_only(status: Status, content_length: u64) -> Self {
        Self {
            status,
            content_length,
            body: &[],
        }
    }

    /// Serialize the response to a byte vector
    pub fn serialize(&self, writer: &mut Vec<u8>) {
        // Writing into a Vec cannot fail.
        let _ = write!(
            writer,
            "{} {} {}\r\nContent-Length: {}\r\n\r\n",
            HTTP_VERSION,
            self.status.code(),
            self.status.as_str(),
            self.content_length
        );
        writer.extend_from_slice(self.body);
    }

    /// Send the whole response with a single write call
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(64 + self.body.len());
        self.serialize(&mut bytes);
        writer.write_all(&bytes)?;
        writer.flush()
    }
}
