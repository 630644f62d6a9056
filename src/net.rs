//! Framed connection used for both the list exchange and file downloads.
//!
//! A connection is opened against a route (`/sync`, `/download`) with a set of
//! string parameters. After the OPEN/OK handshake it carries JSON messages
//! and raw content blocks, each in its own frame.

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::protocol::{frame, HEADER_LEN};
use crate::protocol_core::{build_frame_header, parse_frame_header, validate_frame_size};

pub type Params = BTreeMap<String, String>;

/// Payload of the OPEN frame
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OpenRequest {
    pub route: String,
    #[serde(default)]
    pub params: Params,
}

pub struct Connection<S = TcpStream> {
    stream: S,
}

/// Open a TCP connection to `host` and request `route`.
pub async fn dial(host: &str, route: &str, params: Params) -> Result<Connection> {
    let stream = TcpStream::connect(host)
        .await
        .with_context(|| format!("connect {}", host))?;
    let _ = stream.set_nodelay(true);
    let mut conn = Connection::new(stream);
    conn.open(route, params)
        .await
        .with_context(|| format!("open {} on {}", route, host))?;
    Ok(conn)
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Client side of the handshake: send OPEN, expect OK.
    pub async fn open(&mut self, route: &str, params: Params) -> Result<()> {
        let req = OpenRequest {
            route: route.to_string(),
            params,
        };
        let payload = serde_json::to_vec(&req)?;
        self.write_frame(frame::OPEN, &payload).await?;
        let (typ, resp) = self.read_frame().await?;
        match typ {
            frame::OK => Ok(()),
            frame::ERROR => bail!("server refused: {}", String::from_utf8_lossy(&resp)),
            other => bail!("unexpected frame {} in reply to OPEN", other),
        }
    }

    /// Server side of the handshake: read OPEN, reply OK and return the request.
    #[cfg(test)]
    pub async fn accept(stream: S) -> Result<(Self, OpenRequest)> {
        let mut conn = Self::new(stream);
        let (typ, payload) = conn.read_frame().await?;
        if typ != frame::OPEN {
            bail!("expected OPEN frame, got {}", typ);
        }
        let req: OpenRequest = serde_json::from_slice(&payload).context("decode OPEN request")?;
        conn.write_frame(frame::OK, b"OK").await?;
        Ok((conn, req))
    }

    pub async fn write_message<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let payload = serde_json::to_vec(msg)?;
        self.write_frame(frame::MESSAGE, &payload).await
    }

    pub async fn read_message<T: DeserializeOwned>(&mut self) -> Result<T> {
        let (typ, payload) = self.read_frame().await?;
        match typ {
            frame::MESSAGE => serde_json::from_slice(&payload).context("decode message"),
            frame::ERROR => bail!("server error: {}", String::from_utf8_lossy(&payload)),
            other => bail!("expected MESSAGE frame, got {}", other),
        }
    }

    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        self.write_frame(frame::BLOCK, data).await
    }

    pub async fn read_raw(&mut self) -> Result<Vec<u8>> {
        let (typ, payload) = self.read_frame().await?;
        match typ {
            frame::BLOCK => Ok(payload),
            frame::ERROR => bail!("server error: {}", String::from_utf8_lossy(&payload)),
            other => bail!("expected BLOCK frame, got {}", other),
        }
    }

    #[cfg(test)]
    pub async fn write_error(&mut self, msg: &str) -> Result<()> {
        self.write_frame(frame::ERROR, msg.as_bytes()).await
    }

    /// Flush and shut down the write half. Dropping the connection also
    /// releases the socket; this just makes the close explicit to the peer.
    pub async fn close(mut self) -> Result<()> {
        self.stream.flush().await?;
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn write_frame(&mut self, t: u8, payload: &[u8]) -> Result<()> {
        validate_frame_size(payload.len())?;
        let hdr = build_frame_header(t, payload.len() as u32);
        self.stream.write_all(&hdr).await?;
        if !payload.is_empty() {
            self.stream.write_all(payload).await?;
        }
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<(u8, Vec<u8>)> {
        let mut hdr = [0u8; HEADER_LEN];
        self.stream
            .read_exact(&mut hdr)
            .await
            .context("read frame header")?;
        let (typ, len) = parse_frame_header(&hdr)?;
        let len = len as usize;
        validate_frame_size(len)?;
        let mut payload = vec![0u8; len];
        if len > 0 {
            self.stream
                .read_exact(&mut payload)
                .await
                .context("read frame payload")?;
        }
        Ok((typ, payload))
    }
}
