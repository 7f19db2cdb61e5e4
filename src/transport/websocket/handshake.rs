//! WebSocket opening handshake (client side)

use std::collections::HashMap;

use base64::prelude::*;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{ClientError, Result};

/// GUID appended to the client key before hashing
pub const WS_MAGIC_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Largest response header block accepted
pub const MAX_RESPONSE_HEADER_BYTES: usize = 64 * 1024;

/// Generate a random base64 `Sec-WebSocket-Key`
#[must_use]
pub fn generate_key() -> String {
    let nonce: [u8; 16] = rand::random();
    BASE64_STANDARD.encode(nonce)
}

/// Compute the `Sec-WebSocket-Accept` value the server must return for `key`
#[must_use]
pub fn accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(WS_MAGIC_GUID.as_bytes());
    BASE64_STANDARD.encode(sha1.finalize())
}

/// Build the Upgrade request for `host:port`
#[must_use]
pub fn upgrade_request(host: &str, port: u16, key: &str) -> String {
    format!(
        "GET / HTTP/1.1\r\n\
         Host: {host}:{port}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Key: {key}\r\n\
         Sec-WebSocket-Version: 13\r\n\
         \r\n"
    )
}

/// Perform the opening handshake over an already connected stream
///
/// Reads the response one byte at a time so that nothing past the header
/// block is consumed; frames the server sends right after the 101 response
/// stay in `reader` for the frame decoder.
///
/// # Errors
/// Returns `ClientError::Handshake` if the status is not 101, the accept digest
/// does not match, or the headers are truncated or larger than 64 KiB.
pub async fn perform<R, W>(host: &str, port: u16, reader: &mut R, writer: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let key = generate_key();
    writer
        .write_all(upgrade_request(host, port, &key).as_bytes())
        .await?;
    writer.flush().await?;

    let raw = read_http_headers(reader).await?;
    let text = String::from_utf8_lossy(&raw);
    let mut lines = text.split("\r\n");
    let status = lines.next().unwrap_or_default();
    if !status.contains(" 101 ") {
        return Err(ClientError::handshake(status.to_string()));
    }

    let headers: HashMap<String, String> = lines
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect();

    let expected = accept_key(&key);
    match headers.get("sec-websocket-accept") {
        Some(actual) if *actual == expected => {
            log::debug!("WebSocket handshake with {host}:{port} accepted");
            Ok(())
        }
        _ => Err(ClientError::handshake("invalid Sec-WebSocket-Accept")),
    }
}

/// Read up to and including the blank line that ends the header block
///
/// # Errors
/// Returns `ClientError::Handshake` on EOF or when the cap is exceeded
pub async fn read_http_headers<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut out = Vec::with_capacity(512);
    let mut state = 0u8;

    while out.len() < MAX_RESPONSE_HEADER_BYTES {
        let byte = match reader.read_u8().await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(ClientError::handshake("unexpected end of stream"));
            }
            Err(e) => return Err(e.into()),
        };
        out.push(byte);

        state = match (state, byte) {
            (0 | 2, b'\r') => state + 1,
            (1 | 3, b'\n') => state + 1,
            (_, b'\r') => 1,
            _ => 0,
        };
        if state == 4 {
            return Ok(out);
        }
    }

    Err(ClientError::handshake("response headers too large"))
}
