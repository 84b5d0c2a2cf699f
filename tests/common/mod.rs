//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_rustls::rustls;
use tokio_rustls::TlsAcceptor;

use traffic_replay::plugins::{Output, PluginError};

/// A running mock target.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockBackend {
    /// Connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Request heads received so far, in arrival order.
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Start a keep-alive backend that answers every request with `respond(request_head)`.
pub async fn start_programmable_backend<F>(respond: F) -> MockBackend
where
    F: Fn(&[u8]) -> Vec<u8> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        connections: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    let respond = Arc::new(respond);

    let state = backend.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    state.connections.fetch_add(1, Ordering::SeqCst);
                    let respond = respond.clone();
                    let requests = state.requests.clone();
                    tokio::spawn(serve_keep_alive(socket, move |head| {
                        requests.lock().unwrap().push(head.to_vec());
                        respond(head)
                    }));
                }
                Err(_) => break,
            }
        }
    });

    backend
}

/// Start a keep-alive backend that always returns the same bytes.
pub async fn start_fixed_backend(response: &'static [u8]) -> MockBackend {
    start_programmable_backend(move |_| response.to_vec()).await
}

/// Start a backend that sends a fixed 200 response and closes each connection.
pub async fn start_mock_backend(body: &'static str) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        connections: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let state = backend.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    state.connections.fetch_add(1, Ordering::SeqCst);
                    let requests = state.requests.clone();
                    tokio::spawn(async move {
                        let Some(head) = read_head(&mut socket, &mut Vec::new()).await else {
                            return;
                        };
                        requests.lock().unwrap().push(head);
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    backend
}

/// Start a backend that reads requests and never answers.
pub async fn start_silent_backend() -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        connections: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let state = backend.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            state.connections.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                }
            });
        }
    });

    backend
}

/// Start a keep-alive TLS backend with a freshly generated self-signed certificate.
pub async fn start_tls_backend(response: &'static [u8]) -> MockBackend {
    let key_pair = rcgen::KeyPair::generate().unwrap();
    let params = rcgen::CertificateParams::new(vec!["localhost".to_string()]).unwrap();
    let cert = params.self_signed(&key_pair).unwrap();
    let key_der = rustls::pki_types::PrivatePkcs8KeyDer::from(key_pair.serialize_der());

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(vec![cert.der().clone()], rustls::pki_types::PrivateKeyDer::Pkcs8(key_der))
    .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        connections: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let state = backend.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            state.connections.fetch_add(1, Ordering::SeqCst);
            let acceptor = acceptor.clone();
            let requests = state.requests.clone();
            tokio::spawn(async move {
                let Ok(stream) = acceptor.accept(socket).await else {
                    return;
                };
                serve_keep_alive(stream, move |head| {
                    requests.lock().unwrap().push(head.to_vec());
                    response.to_vec()
                })
                .await;
            });
        }
    });

    backend
}

/// Start a backend that sends `head`, then `burst` body bytes at once, then one
/// byte every `interval` until `trickle` bytes have gone out.
pub async fn start_trickling_backend(
    head: &'static [u8],
    burst: usize,
    trickle: usize,
    interval: Duration,
) -> MockBackend {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        connections: Arc::new(AtomicUsize::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let state = backend.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            state.connections.fetch_add(1, Ordering::SeqCst);
            let requests = state.requests.clone();
            tokio::spawn(async move {
                let Some(request) = read_head(&mut socket, &mut Vec::new()).await else {
                    return;
                };
                requests.lock().unwrap().push(request);

                let mut first = head.to_vec();
                first.extend(std::iter::repeat(b'x').take(burst));
                if socket.write_all(&first).await.is_err() {
                    return;
                }
                for _ in 0..trickle {
                    tokio::time::sleep(interval).await;
                    if socket.write_all(b"x").await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    backend
}

/// An address with nothing listening on it.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

async fn serve_keep_alive<S, F>(mut socket: S, respond: F)
where
    S: AsyncRead + AsyncWrite + Unpin,
    F: Fn(&[u8]) -> Vec<u8>,
{
    let mut pending = Vec::new();
    while let Some(head) = read_head(&mut socket, &mut pending).await {
        let response = respond(&head);
        if socket.write_all(&response).await.is_err() {
            break;
        }
    }
}

/// Read up to and including the next blank line. Request bodies are not consumed.
async fn read_head<S>(socket: &mut S, pending: &mut Vec<u8>) -> Option<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut buf = [0u8; 4096];
    loop {
        if let Some(pos) = pending.windows(4).position(|w| w == b"\r\n\r\n") {
            let head: Vec<u8> = pending.drain(..pos + 4).collect();
            return Some(head);
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => pending.extend_from_slice(&buf[..n]),
        }
    }
}

/// Path of a request head's start line.
pub fn request_path(head: &[u8]) -> String {
    let line = String::from_utf8_lossy(head);
    line.split(' ').nth(1).unwrap_or("").to_string()
}

/// Output that keeps every payload it is handed.
#[derive(Default)]
pub struct RecordingOutput {
    name: String,
    payloads: Mutex<Vec<Bytes>>,
}

impl RecordingOutput {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            payloads: Mutex::new(Vec::new()),
        })
    }

    pub fn payloads(&self) -> Vec<Bytes> {
        self.payloads.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }
}

impl std::fmt::Display for RecordingOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Recording output {}", self.name)
    }
}

#[async_trait]
impl Output for RecordingOutput {
    async fn write(&self, payload: &[u8]) -> Result<usize, PluginError> {
        self.payloads.lock().unwrap().push(Bytes::copy_from_slice(payload));
        Ok(payload.len())
    }
}

/// Poll `check` every 10ms until it holds or `limit` passes.
pub async fn wait_until<F>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Run `fut` with a test-sized timeout.
pub async fn within<T>(limit: Duration, fut: impl Future<Output = T>) -> T {
    tokio::time::timeout(limit, fut)
        .await
        .expect("operation timed out")
}
