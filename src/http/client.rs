//! Raw-socket HTTP/1.x client used to replay captured requests.
//!
//! # Responsibilities
//! - Own exactly one connection to the replay target (TCP or TLS)
//! - Write verbatim request bytes and read back one response into a fixed buffer
//! - Chase redirects up to a configured limit
//! - Turn every transport failure into a synthetic HTTP response
//!
//! # Design Decisions
//! - `send` never fails; callers always get a response-shaped byte sequence
//! - A response that fills the buffer tears the connection down, since the
//!   unread remainder would otherwise bleed into the next response
//! - Liveness is probed with a 1 ms read; a timeout counts as alive

use std::borrow::Cow;
use std::io;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::{timeout, timeout_at, Instant};
use url::Url;

use crate::http::error_response::{error_response, SyntheticStatus};
use crate::http::proto::{self, Framing};
use crate::net::connection::{dial, ConnectionId, DialError, Transport};
use crate::net::tls;

/// Default overall I/O timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default response buffer capacity (100 KiB).
pub const DEFAULT_RESPONSE_BUFFER_SIZE: usize = 100 * 1024;

/// Once this many bytes are buffered, trailing reads get a short deadline.
const TRAILING_READ_THRESHOLD: usize = 4096;
const TRAILING_READ_TIMEOUT: Duration = Duration::from_millis(100);
const LIVENESS_PROBE_TIMEOUT: Duration = Duration::from_millis(1);

/// Per-client settings.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum redirect hops to follow (0 disables).
    pub follow_redirects: usize,
    /// Log every request and response payload.
    pub debug: bool,
    /// Keep the captured Host header instead of rewriting it to the target.
    pub original_host: bool,
    /// Dial timeout; zero falls back to `timeout`.
    pub connect_timeout: Duration,
    /// Deadline for writing the request and reading the response.
    pub timeout: Duration,
    /// Capacity of the response buffer; larger responses are truncated.
    pub response_buffer_size: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            follow_redirects: 0,
            debug: false,
            original_host: false,
            connect_timeout: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            response_buffer_size: DEFAULT_RESPONSE_BUFFER_SIZE,
        }
    }
}

/// Invalid replay target address.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("invalid target url {url}: {source}")]
    Parse { url: String, source: url::ParseError },

    #[error("target url {0} has no host")]
    MissingHost(String),

    #[error("unsupported scheme {scheme} in {url}")]
    UnsupportedScheme { url: String, scheme: String },
}

/// Resolved replay target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Normalized base URL, for logging.
    pub base_url: String,
    /// `http` or `https`.
    pub scheme: String,
    /// Host name without port (used for SNI).
    pub host: String,
    /// Value written into the Host header.
    pub authority: String,
    /// `host:port` to dial, with the scheme's default port filled in.
    pub dial_addr: String,
}

impl Target {
    /// Parse a target such as `localhost:8080` or `https://staging.example.com`.
    pub fn parse(address: &str) -> Result<Self, TargetError> {
        let with_scheme = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };

        let url = Url::parse(&with_scheme).map_err(|source| TargetError::Parse {
            url: with_scheme.clone(),
            source,
        })?;

        let scheme = url.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(TargetError::UnsupportedScheme {
                url: with_scheme,
                scheme,
            });
        }

        let host = url
            .host_str()
            .ok_or_else(|| TargetError::MissingHost(with_scheme.clone()))?
            .to_string();

        let authority = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.clone(),
        };
        let port = url
            .port_or_known_default()
            .unwrap_or(if scheme == "https" { 443 } else { 80 });

        Ok(Self {
            base_url: format!("{}://{}", scheme, authority),
            dial_addr: format!("{}:{}", host, port),
            scheme,
            host,
            authority,
        })
    }

    /// Whether connections need a TLS handshake.
    pub fn is_secure(&self) -> bool {
        self.scheme == "https"
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

/// Transport failure inside a single round trip.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Dial(#[from] DialError),

    #[error("TLS handshake with {host} failed: {source}")]
    Handshake { host: String, source: io::Error },

    #[error("TLS handshake with {host} timed out")]
    HandshakeTimeout { host: String },

    #[error("write timed out after {0:?}")]
    WriteTimeout(Duration),

    #[error("write failed: {0}")]
    Write(io::Error),

    #[error("no response within {0:?}")]
    ReadTimeout(Duration),

    #[error("read failed: {0}")]
    Read(io::Error),

    #[error("connection closed before any response bytes arrived")]
    Closed,
}

impl ClientError {
    /// Synthetic status reported in place of a real response.
    pub fn synthetic_status(&self) -> SyntheticStatus {
        match self {
            ClientError::Dial(DialError::Resolve { .. }) | ClientError::Dial(DialError::NoAddress(_)) => {
                SyntheticStatus::Unreachable
            }
            ClientError::Dial(DialError::Timeout { .. }) | ClientError::HandshakeTimeout { .. } => {
                SyntheticStatus::ConnectionTimeout
            }
            ClientError::Dial(DialError::Connect { .. }) | ClientError::Handshake { .. } => {
                SyntheticStatus::ConnectionError
            }
            ClientError::WriteTimeout(_) | ClientError::Write(_) | ClientError::ReadTimeout(_) => {
                SyntheticStatus::Timeout
            }
            ClientError::Read(_) | ClientError::Closed => SyntheticStatus::Unknown,
        }
    }
}

/// Why the read loop stopped.
#[derive(Debug)]
enum ReadEnd {
    /// The buffered bytes form a complete message.
    Framed,
    /// Short read on a message without length information.
    Drained,
    BufferFull,
    PeerClosed,
    TimedOut,
    Failed(io::Error),
}

struct LiveConnection {
    id: ConnectionId,
    transport: Transport,
}

/// HTTP client owning a single connection. Not shared between tasks.
pub struct HttpClient {
    target: Target,
    config: HttpClientConfig,
    conn: Option<LiveConnection>,
    resp_buf: Vec<u8>,
    read_buf: Vec<u8>,
    redirects: usize,
}

impl HttpClient {
    /// Create a disconnected client; the first `send` connects.
    pub fn new(target: Target, mut config: HttpClientConfig) -> Self {
        if config.timeout.is_zero() {
            config.timeout = DEFAULT_TIMEOUT;
        }
        if config.response_buffer_size == 0 {
            config.response_buffer_size = DEFAULT_RESPONSE_BUFFER_SIZE;
        }
        let size = config.response_buffer_size;

        Self {
            target,
            config,
            conn: None,
            resp_buf: vec![0; size],
            read_buf: vec![0; size],
            redirects: 0,
        }
    }

    /// The target this client replays to.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Whether a connection is currently held.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Drop any existing connection and dial the target.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.disconnect();

        let connect_timeout = if self.config.connect_timeout.is_zero() {
            self.config.timeout
        } else {
            self.config.connect_timeout
        };

        let (stream, peer) = dial(&self.target.dial_addr, connect_timeout).await?;

        let transport = if self.target.is_secure() {
            match timeout(connect_timeout, tls::handshake(&self.target.host, stream)).await {
                Ok(Ok(tls_stream)) => Transport::Tls(Box::new(tls_stream)),
                Ok(Err(source)) => {
                    return Err(ClientError::Handshake {
                        host: self.target.host.clone(),
                        source,
                    })
                }
                Err(_) => {
                    return Err(ClientError::HandshakeTimeout {
                        host: self.target.host.clone(),
                    })
                }
            }
        } else {
            Transport::Plain(stream)
        };

        let id = ConnectionId::new();
        tracing::debug!(
            connection_id = %id,
            replay_target = %self.target,
            peer_addr = %peer,
            tls = transport.is_tls(),
            "Connected to replay target"
        );
        self.conn = Some(LiveConnection { id, transport });
        Ok(())
    }

    /// Close the connection, if any.
    pub fn disconnect(&mut self) {
        if let Some(conn) = self.conn.take() {
            tracing::debug!(connection_id = %conn.id, replay_target = %self.target, "Disconnected");
        }
    }

    /// Probe the connection with a 1 ms read. Only end-of-stream counts as dead.
    pub async fn is_alive(&mut self) -> bool {
        let Some(conn) = self.conn.as_mut() else {
            return false;
        };

        let mut one = [0u8; 1];
        !matches!(
            timeout(LIVENESS_PROBE_TIMEOUT, conn.transport.read(&mut one)).await,
            Ok(Ok(0))
        )
    }

    /// Replay a bodyless GET for `path`.
    pub async fn get(&mut self, path: &str) -> Bytes {
        let request = format!("GET {} HTTP/1.1\r\n\r\n", path);
        self.send(request.as_bytes()).await
    }

    /// Send raw request bytes and return the raw response.
    ///
    /// Never fails: transport errors come back as a synthetic 52x response.
    pub async fn send(&mut self, data: &[u8]) -> Bytes {
        let mut request: Cow<'_, [u8]> = Cow::Borrowed(data);

        loop {
            let response = match self.round_trip(&request).await {
                Ok(response) => response,
                Err(e) => {
                    self.redirects = 0;
                    let status = e.synthetic_status();
                    match &e {
                        ClientError::Dial(_) | ClientError::Handshake { .. } => tracing::warn!(
                            replay_target = %self.target,
                            error = %e,
                            code = status.code(),
                            "Replay connection failed"
                        ),
                        _ => tracing::debug!(
                            replay_target = %self.target,
                            error = %e,
                            code = status.code(),
                            "Replay failed"
                        ),
                    }
                    return error_response(status);
                }
            };

            if let Some(next) = self.redirect_request(&response) {
                self.redirects += 1;
                request = Cow::Owned(next);
                continue;
            }

            self.redirects = 0;
            return response;
        }
    }

    /// Build the follow-up request if `response` is a redirect we may chase.
    fn redirect_request(&self, response: &[u8]) -> Option<Vec<u8>> {
        if self.config.follow_redirects == 0 || self.redirects >= self.config.follow_redirects {
            return None;
        }
        if proto::status(response)?.first() != Some(&b'3') {
            return None;
        }

        let location = proto::header(response, "Location")?;
        if self.config.debug {
            tracing::debug!(
                location = %String::from_utf8_lossy(location),
                hop = self.redirects + 1,
                "Following redirect"
            );
        }

        let mut next = Vec::with_capacity(location.len() + 20);
        next.extend_from_slice(b"GET ");
        next.extend_from_slice(location);
        next.extend_from_slice(b" HTTP/1.1\r\n\r\n");
        Some(next)
    }

    async fn round_trip(&mut self, data: &[u8]) -> Result<Bytes, ClientError> {
        if self.conn.is_none() || !self.is_alive().await {
            tracing::debug!(replay_target = %self.target, "Connecting");
            self.connect().await?;
        }

        let request: Cow<'_, [u8]> = if self.config.original_host {
            Cow::Borrowed(data)
        } else {
            Cow::Owned(proto::set_host(data, &self.target.authority))
        };

        if self.config.debug {
            tracing::debug!(payload = %String::from_utf8_lossy(&request), "Sending");
        }

        let head_request = proto::is_head_request(&request);
        let deadline = Instant::now() + self.config.timeout;
        let conn = match self.conn.as_mut() {
            Some(conn) => conn,
            None => return Err(ClientError::Closed),
        };

        let written = timeout_at(deadline, conn.transport.write_all(&request)).await;
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.disconnect();
                return Err(ClientError::Write(e));
            }
            Err(_) => {
                self.disconnect();
                return Err(ClientError::WriteTimeout(self.config.timeout));
            }
        }

        let (n, end) = read_response(
            &mut conn.transport,
            &mut self.resp_buf,
            &mut self.read_buf,
            deadline,
            head_request,
        )
        .await;

        let keep = match &end {
            ReadEnd::Framed | ReadEnd::Drained => true,
            ReadEnd::TimedOut => {
                n > 0 && proto::response_framing(&self.resp_buf[..n], head_request) != Framing::Incomplete
            }
            ReadEnd::BufferFull => {
                tracing::debug!(
                    replay_target = %self.target,
                    capacity = self.resp_buf.len(),
                    "Response filled the buffer, dropping connection"
                );
                false
            }
            ReadEnd::PeerClosed | ReadEnd::Failed(_) => false,
        };
        if !keep {
            self.disconnect();
        }

        if n == 0 {
            return Err(match end {
                ReadEnd::TimedOut => ClientError::ReadTimeout(self.config.timeout),
                ReadEnd::Failed(e) => ClientError::Read(e),
                _ => ClientError::Closed,
            });
        }

        let response = Bytes::copy_from_slice(&self.resp_buf[..n]);
        if self.config.debug {
            tracing::debug!(payload = %String::from_utf8_lossy(&response), "Received");
        }
        Ok(response)
    }
}

/// Read one response into `resp_buf`, returning the byte count and why reading stopped.
async fn read_response(
    transport: &mut Transport,
    resp_buf: &mut [u8],
    read_buf: &mut [u8],
    deadline: Instant,
    head_request: bool,
) -> (usize, ReadEnd) {
    let capacity = resp_buf.len();
    let mut n = 0;

    let end = loop {
        let read_deadline = if n >= TRAILING_READ_THRESHOLD {
            (Instant::now() + TRAILING_READ_TIMEOUT).min(deadline)
        } else {
            deadline
        };

        let read = match timeout_at(read_deadline, transport.read(read_buf)).await {
            Err(_) => break ReadEnd::TimedOut,
            Ok(Err(e)) => break ReadEnd::Failed(e),
            Ok(Ok(0)) => break ReadEnd::PeerClosed,
            Ok(Ok(read)) => read,
        };

        let to_copy = read.min(capacity - n);
        resp_buf[n..n + to_copy].copy_from_slice(&read_buf[..to_copy]);
        n += to_copy;

        if n == capacity {
            break ReadEnd::BufferFull;
        }

        match proto::response_framing(&resp_buf[..n], head_request) {
            Framing::Complete => break ReadEnd::Framed,
            Framing::Unframed if read < read_buf.len() => break ReadEnd::Drained,
            _ => {}
        }
    };

    (n, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_defaults_http_port() {
        let t = Target::parse("localhost").unwrap();
        assert_eq!(t.scheme, "http");
        assert_eq!(t.authority, "localhost");
        assert_eq!(t.dial_addr, "localhost:80");
        assert!(!t.is_secure());
    }

    #[test]
    fn target_defaults_https_port() {
        let t = Target::parse("https://staging.example.com").unwrap();
        assert_eq!(t.dial_addr, "staging.example.com:443");
        assert_eq!(t.authority, "staging.example.com");
        assert!(t.is_secure());
    }

    #[test]
    fn target_keeps_explicit_port() {
        let t = Target::parse("127.0.0.1:8080").unwrap();
        assert_eq!(t.authority, "127.0.0.1:8080");
        assert_eq!(t.dial_addr, "127.0.0.1:8080");
        assert_eq!(t.to_string(), "http://127.0.0.1:8080");
    }

    #[test]
    fn target_rejects_garbage() {
        assert!(Target::parse("http://").is_err());
        assert!(matches!(
            Target::parse("ftp://files"),
            Err(TargetError::UnsupportedScheme { .. })
        ));
        assert!(Target::parse("http://exa mple.com").is_err());
    }

    #[test]
    fn errors_map_to_edge_codes() {
        let refused = ClientError::Dial(DialError::Connect {
            addr: "x:1".into(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        });
        assert_eq!(refused.synthetic_status().code(), "521");

        let slow = ClientError::Dial(DialError::Timeout {
            addr: "x:1".into(),
            timeout: Duration::from_secs(1),
        });
        assert_eq!(slow.synthetic_status().code(), "522");
        assert_eq!(ClientError::Dial(DialError::NoAddress("x".into())).synthetic_status().code(), "523");
        assert_eq!(ClientError::ReadTimeout(DEFAULT_TIMEOUT).synthetic_status().code(), "524");
        assert_eq!(ClientError::Closed.synthetic_status().code(), "520");
    }

    #[test]
    fn zero_config_falls_back_to_defaults() {
        let client = HttpClient::new(
            Target::parse("localhost:1").unwrap(),
            HttpClientConfig {
                timeout: Duration::ZERO,
                response_buffer_size: 0,
                ..Default::default()
            },
        );
        assert_eq!(client.resp_buf.len(), DEFAULT_RESPONSE_BUFFER_SIZE);
        assert_eq!(client.config.timeout, DEFAULT_TIMEOUT);
        assert!(!client.is_connected());
    }
}
