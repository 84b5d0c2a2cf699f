//! Payload header codec.
//!
//! Every payload is a single header line followed by the verbatim protocol bytes:
//!
//! ```text
//! <kind> <correlation-id> <timestamp>[ <latency-nanos>]\n<raw bytes>
//! ```

use bytes::{BufMut, Bytes, BytesMut};

/// Delimits consecutive payloads sharing one stream.
pub const PAYLOAD_SEPARATOR: &str = "\n🐵🙈🙉\n";

/// Minimum number of header tokens for a payload to be recognized.
const MIN_META_TOKENS: usize = 3;

/// Which side of an exchange a payload carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// A captured request.
    Request,
    /// The response the original server gave.
    OriginResponse,
    /// The response the replay target gave.
    ReplayedResponse,
}

impl PayloadKind {
    /// Wire token for this kind.
    pub fn as_byte(self) -> u8 {
        match self {
            PayloadKind::Request => b'1',
            PayloadKind::OriginResponse => b'2',
            PayloadKind::ReplayedResponse => b'3',
        }
    }

    /// Parse a wire token.
    pub fn from_token(token: &[u8]) -> Option<Self> {
        match token {
            b"1" => Some(PayloadKind::Request),
            b"2" => Some(PayloadKind::OriginResponse),
            b"3" => Some(PayloadKind::ReplayedResponse),
            _ => None,
        }
    }
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadKind::Request => write!(f, "request"),
            PayloadKind::OriginResponse => write!(f, "origin-response"),
            PayloadKind::ReplayedResponse => write!(f, "replayed-response"),
        }
    }
}

/// Read-only view over a decoded payload header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadMeta<'a> {
    pub kind: PayloadKind,
    pub id: &'a [u8],
    pub timestamp: i64,
    /// Only present on replayed responses.
    pub latency: Option<i64>,
}

impl PayloadMeta<'_> {
    /// Correlation ID as text (lossy).
    pub fn id_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.id)
    }
}

/// Build the header line for a payload.
pub fn encode_header(kind: PayloadKind, id: &[u8], timestamp: i64, latency: Option<i64>) -> Vec<u8> {
    let mut header = Vec::with_capacity(id.len() + 48);
    header.push(kind.as_byte());
    header.push(b' ');
    header.extend_from_slice(id);
    header.push(b' ');
    header.extend_from_slice(timestamp.to_string().as_bytes());
    if let Some(latency) = latency {
        header.push(b' ');
        header.extend_from_slice(latency.to_string().as_bytes());
    }
    header.push(b'\n');
    header
}

/// Build a complete payload: header line followed by `body`.
pub fn encode_payload(
    kind: PayloadKind,
    id: &[u8],
    timestamp: i64,
    latency: Option<i64>,
    body: &[u8],
) -> Bytes {
    let header = encode_header(kind, id, timestamp, latency);
    let mut buf = BytesMut::with_capacity(header.len() + body.len());
    buf.put_slice(&header);
    buf.put_slice(body);
    buf.freeze()
}

/// Raw space-separated tokens of the header line.
///
/// Returns fewer than three tokens for anything that is not a payload;
/// callers treat that as "skip".
pub fn meta_tokens(payload: &[u8]) -> Vec<&[u8]> {
    let line = match payload.iter().position(|&b| b == b'\n') {
        Some(end) => &payload[..end],
        None => return Vec::new(),
    };
    line.split(|&b| b == b' ').filter(|t| !t.is_empty()).collect()
}

/// Decode the header line without copying the body.
pub fn decode_meta(payload: &[u8]) -> Option<PayloadMeta<'_>> {
    let tokens = meta_tokens(payload);
    if tokens.len() < MIN_META_TOKENS {
        return None;
    }

    let kind = PayloadKind::from_token(tokens[0])?;
    let timestamp = parse_i64(tokens[2])?;
    let latency = match tokens.get(3) {
        Some(token) => Some(parse_i64(token)?),
        None => None,
    };

    Some(PayloadMeta {
        kind,
        id: tokens[1],
        timestamp,
        latency,
    })
}

/// Everything after the header line. Empty if there is no header line.
pub fn payload_body(payload: &[u8]) -> &[u8] {
    match payload.iter().position(|&b| b == b'\n') {
        Some(end) => &payload[end + 1..],
        None => &[],
    }
}

/// True when the header marks a captured request.
pub fn is_request_payload(payload: &[u8]) -> bool {
    payload.first() == Some(&PayloadKind::Request.as_byte())
        && payload.get(1) == Some(&b' ')
}

/// Split a stream of payloads on [`PAYLOAD_SEPARATOR`].
///
/// Empty fragments (leading/trailing separators) are skipped.
pub fn split_payloads(stream: &[u8]) -> Vec<&[u8]> {
    let sep = PAYLOAD_SEPARATOR.as_bytes();
    let mut out = Vec::new();
    let mut rest = stream;

    while let Some(pos) = find(rest, sep) {
        if pos > 0 {
            out.push(&rest[..pos]);
        }
        rest = &rest[pos + sep.len()..];
    }
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// Concatenate payloads into one stream, each followed by the separator.
pub fn frame_payloads<'a, I>(payloads: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut stream = Vec::new();
    for payload in payloads {
        stream.extend_from_slice(payload);
        stream.extend_from_slice(PAYLOAD_SEPARATOR.as_bytes());
    }
    stream
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_i64(token: &[u8]) -> Option<i64> {
    std::str::from_utf8(token).ok()?.parse().ok()
}
