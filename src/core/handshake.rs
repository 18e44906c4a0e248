//! WebSocket upgrade handshake
//!
//! Parses the HTTP request head off a freshly accepted TCP stream,
//! validates the upgrade headers and computes the accept token as
//! base64(SHA-1(key + GUID)) per RFC 6455. The caller owns sending the
//! response and keeping the raw stream for framing afterwards.

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use ring::digest;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::constants::WS_MAGIC_GUID;
use crate::error::{RelayError, Result};

// Caps on the request head so a garbage peer cannot feed us forever
const MAX_HEADER_COUNT: usize = 64;
const MAX_LINE_LEN: usize = 8 * 1024;

/// The parsed head of an HTTP upgrade request
#[derive(Debug)]
pub struct UpgradeRequest {
    pub path: String,
    headers: HashMap<String, String>,
}

impl UpgradeRequest {
    /// Read the request line and headers up to the blank line.
    pub async fn read_from<R>(stream: &mut R) -> Result<Self>
    where
        R: AsyncBufRead + Unpin,
    {
        let request_line = read_head_line(stream).await?;
        let mut parts = request_line.split_whitespace();
        // The method is not checked: any request with valid upgrade
        // headers on the right path is treated as an upgrade attempt
        let path = match (parts.next(), parts.next()) {
            (Some(_method), Some(path)) => path.to_string(),
            _ => {
                return Err(RelayError::Handshake(format!(
                    "malformed request line: {:?}",
                    request_line
                )))
            }
        };

        let mut headers = HashMap::new();
        loop {
            let line = read_head_line(stream).await?;
            if line.is_empty() {
                break;
            }
            if headers.len() >= MAX_HEADER_COUNT {
                return Err(RelayError::Handshake("too many headers".to_string()));
            }
            let (name, value) = line.split_once(':').ok_or_else(|| {
                RelayError::Handshake(format!("malformed header line: {:?}", line))
            })?;
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        Ok(Self { path, headers })
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }
}

// Reads one head line byte-wise off the stream's buffer so a peer
// feeding an endless newline-less line is cut off at the cap instead of
// being accumulated whole.
async fn read_head_line<R>(stream: &mut R) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        let buffered = stream.fill_buf().await?;
        if buffered.is_empty() {
            return Err(RelayError::Handshake(
                "connection closed before the request head ended".to_string(),
            ));
        }

        let (take, done) = match buffered.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (buffered.len(), false),
        };
        line.extend_from_slice(&buffered[..take]);
        stream.consume(take);

        if line.len() > MAX_LINE_LEN {
            return Err(RelayError::Handshake("header line too long".to_string()));
        }
        if done {
            break;
        }
    }

    let line = String::from_utf8(line)
        .map_err(|_| RelayError::Handshake("header line is not valid UTF-8".to_string()))?;
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

/// Compute the Sec-WebSocket-Accept token for a client key.
pub fn accept_token(key: &str) -> String {
    let digest = digest::digest(
        &digest::SHA1_FOR_LEGACY_USE_ONLY,
        format!("{}{}", key, WS_MAGIC_GUID).as_bytes(),
    );
    BASE64.encode(digest.as_ref())
}

/// Validate the upgrade headers and build the 101 response.
pub fn negotiate(request: &UpgradeRequest) -> Result<String> {
    let upgrade_ok = request
        .header("upgrade")
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false);
    if !upgrade_ok {
        return Err(RelayError::Handshake(
            "expected websocket upgrade".to_string(),
        ));
    }

    let key = match request.header("sec-websocket-key") {
        Some(key) if !key.is_empty() => key,
        _ => {
            return Err(RelayError::Handshake(
                "missing Sec-WebSocket-Key".to_string(),
            ))
        }
    };

    Ok(format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        accept_token(key)
    ))
}

/// Plain-text 400 response for rejected handshakes.
pub fn bad_request(reason: &str) -> String {
    error_response("400 Bad Request", reason)
}

/// Plain-text 404 response for requests outside the upgrade path.
pub fn not_found(path: &str) -> String {
    error_response("404 Not Found", &format!("no such path: {}", path))
}

fn error_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    )
}
