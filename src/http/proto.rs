//! Byte-level HTTP/1.x helpers.
//!
//! Replayed traffic is kept as raw bytes end to end, so these helpers read and
//! splice the header block in place instead of parsing into a typed request.

const METHODS: [&[u8]; 9] = [
    b"GET ",
    b"POST ",
    b"PUT ",
    b"DELETE ",
    b"HEAD ",
    b"OPTIONS ",
    b"PATCH ",
    b"CONNECT ",
    b"TRACE ",
];

/// Whether enough of a response has arrived to stop reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Headers or body still missing.
    Incomplete,
    /// Content-Length satisfied, chunked terminator seen, or no body allowed.
    Complete,
    /// No length information; the message ends when the peer stops sending.
    Unframed,
}

/// Check that `data` starts like an HTTP/1.x request.
pub fn is_http_payload(data: &[u8]) -> bool {
    if !METHODS.iter().any(|m| data.starts_with(m)) {
        return false;
    }

    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut req = httparse::Request::new(&mut headers);
    match req.parse(data) {
        Ok(_) => true,
        // A capture can legitimately carry more headers than we bother to inspect.
        Err(httparse::Error::TooManyHeaders) => true,
        Err(_) => false,
    }
}

/// True for `HEAD` requests, whose responses never carry a body.
pub fn is_head_request(data: &[u8]) -> bool {
    data.starts_with(b"HEAD ")
}

/// Three-digit status code of a response, if the status line is long enough.
pub fn status(data: &[u8]) -> Option<&[u8]> {
    if data.len() >= 12 && data.starts_with(b"HTTP/") {
        Some(&data[9..12])
    } else {
        None
    }
}

/// Request method, the bytes before the first space.
pub fn method(data: &[u8]) -> &[u8] {
    match data.iter().position(|&b| b == b' ') {
        Some(end) => &data[..end],
        None => &[],
    }
}

/// Request target, the bytes between the first and second space of the start line.
pub fn path(data: &[u8]) -> &[u8] {
    let line_end = data.iter().position(|&b| b == b'\r' || b == b'\n').unwrap_or(data.len());
    let line = &data[..line_end];
    let mut parts = line.splitn(3, |&b| b == b' ');
    parts.next();
    parts.next().unwrap_or(&[])
}

/// Entity body: everything after the blank line ending the header block.
pub fn body(data: &[u8]) -> &[u8] {
    match data.windows(4).position(|w| w == b"\r\n\r\n") {
        Some(pos) => &data[pos + 4..],
        None => &[],
    }
}

/// Value of the first header named `name` (case-insensitive), trimmed.
pub fn header<'a>(data: &'a [u8], name: &str) -> Option<&'a [u8]> {
    let line = find_header(data, name)?;
    Some(&data[line.value_start..line.value_end])
}

/// Replace the value of header `name`, or insert it right after the start line.
pub fn set_header(data: &[u8], name: &str, value: &[u8]) -> Vec<u8> {
    if let Some(line) = find_header(data, name) {
        let mut out = Vec::with_capacity(data.len() + value.len());
        out.extend_from_slice(&data[..line.value_start]);
        out.extend_from_slice(value);
        out.extend_from_slice(&data[line.value_end..]);
        return out;
    }

    let insert_at = match data.iter().position(|&b| b == b'\n') {
        Some(pos) => pos + 1,
        None => return data.to_vec(),
    };

    let mut out = Vec::with_capacity(data.len() + name.len() + value.len() + 4);
    out.extend_from_slice(&data[..insert_at]);
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(b": ");
    out.extend_from_slice(value);
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&data[insert_at..]);
    out
}

/// Point a request at `authority`: absolute-form targets are reduced to their
/// path and the Host header is replaced (or added).
pub fn set_host(data: &[u8], authority: &str) -> Vec<u8> {
    let data = strip_absolute_target(data);
    set_header(&data, "Host", authority.as_bytes())
}

/// Decide whether `data` holds a whole response.
pub fn response_framing(data: &[u8], head_request: bool) -> Framing {
    let mut headers = [httparse::EMPTY_HEADER; 64];
    let mut res = httparse::Response::new(&mut headers);

    let header_len = match res.parse(data) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Framing::Incomplete,
        Err(_) => return Framing::Unframed,
    };

    let code = res.code.unwrap_or(0);
    if head_request || (100..200).contains(&code) || code == 204 || code == 304 {
        return Framing::Complete;
    }

    let body = &data[header_len..];
    let mut content_length = None;
    for h in res.headers.iter() {
        if h.name.eq_ignore_ascii_case("transfer-encoding") {
            let chunked = std::str::from_utf8(h.value)
                .map(|v| v.to_ascii_lowercase().contains("chunked"))
                .unwrap_or(false);
            if chunked {
                return if chunked_body_complete(body) {
                    Framing::Complete
                } else {
                    Framing::Incomplete
                };
            }
        } else if h.name.eq_ignore_ascii_case("content-length") {
            content_length = std::str::from_utf8(h.value)
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok());
        }
    }

    match content_length {
        Some(len) if body.len() >= len => Framing::Complete,
        Some(_) => Framing::Incomplete,
        None => Framing::Unframed,
    }
}

/// Walk chunk sizes until the last-chunk and its trailer section are present.
fn chunked_body_complete(mut body: &[u8]) -> bool {
    loop {
        let Some(line_end) = body.windows(2).position(|w| w == b"\r\n") else {
            return false;
        };
        let size_field = body[..line_end].split(|&b| b == b';').next().unwrap_or_default();
        let size = match std::str::from_utf8(size_field)
            .ok()
            .and_then(|s| usize::from_str_radix(s.trim(), 16).ok())
        {
            Some(size) => size,
            None => return false,
        };
        body = &body[line_end + 2..];

        if size == 0 {
            return body.starts_with(b"\r\n") || body.windows(4).any(|w| w == b"\r\n\r\n");
        }
        match size.checked_add(2) {
            Some(skip) if body.len() >= skip => body = &body[skip..],
            _ => return false,
        }
    }
}

struct HeaderLine {
    value_start: usize,
    value_end: usize,
}

fn find_header(data: &[u8], name: &str) -> Option<HeaderLine> {
    let mut pos = data.iter().position(|&b| b == b'\n')? + 1;

    while pos < data.len() {
        let nl = data[pos..].iter().position(|&b| b == b'\n')?;
        let next = pos + nl + 1;
        let mut end = pos + nl;
        if end > pos && data[end - 1] == b'\r' {
            end -= 1;
        }
        if end == pos {
            // blank line: end of header block
            return None;
        }

        let line = &data[pos..end];
        if let Some(colon) = line.iter().position(|&b| b == b':') {
            if line[..colon].eq_ignore_ascii_case(name.as_bytes()) {
                let mut value_start = pos + colon + 1;
                while value_start < end && (data[value_start] == b' ' || data[value_start] == b'\t') {
                    value_start += 1;
                }
                let mut value_end = end;
                while value_end > value_start
                    && (data[value_end - 1] == b' ' || data[value_end - 1] == b'\t')
                {
                    value_end -= 1;
                }
                return Some(HeaderLine {
                    value_start,
                    value_end,
                });
            }
        }
        pos = next;
    }
    None
}

fn strip_absolute_target(data: &[u8]) -> std::borrow::Cow<'_, [u8]> {
    let first_space = match data.iter().position(|&b| b == b' ') {
        Some(p) => p,
        None => return data.into(),
    };
    let target_start = first_space + 1;
    let target_len = match data[target_start..].iter().position(|&b| b == b' ' || b == b'\r' || b == b'\n') {
        Some(len) => len,
        None => return data.into(),
    };
    let target = &data[target_start..target_start + target_len];

    let after_scheme = if target.starts_with(b"http://") {
        7
    } else if target.starts_with(b"https://") {
        8
    } else {
        return data.into();
    };

    let path: &[u8] = match target[after_scheme..].iter().position(|&b| b == b'/') {
        Some(p) => &target[after_scheme + p..],
        None => b"/",
    };

    let mut out = Vec::with_capacity(data.len());
    out.extend_from_slice(&data[..target_start]);
    out.extend_from_slice(path);
    out.extend_from_slice(&data[target_start + target_len..]);
    out.into()
}
