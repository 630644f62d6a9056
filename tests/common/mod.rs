//! Server side of the framed protocol for the end-to-end tests.

use anyhow::{bail, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use trace_client::net::OpenRequest;
use trace_client::protocol::{frame, HEADER_LEN};
use trace_client::protocol_core::{build_frame_header, parse_frame_header};

pub struct ServerConn {
    stream: TcpStream,
}

impl ServerConn {
    /// Read OPEN, reply OK
    pub async fn accept(stream: TcpStream) -> Result<(Self, OpenRequest)> {
        let mut conn = Self { stream };
        let (typ, payload) = conn.read_frame().await?;
        if typ != frame::OPEN {
            bail!("expected OPEN frame, got {}", typ);
        }
        let req: OpenRequest = serde_json::from_slice(&payload)?;
        conn.write_frame(frame::OK, b"OK").await?;
        Ok((conn, req))
    }

    pub async fn read_message<T: DeserializeOwned>(&mut self) -> Result<T> {
        let (typ, payload) = self.read_frame().await?;
        if typ != frame::MESSAGE {
            bail!("expected MESSAGE frame, got {}", typ);
        }
        Ok(serde_json::from_slice(&payload)?)
    }

    pub async fn write_message<T: Serialize>(&mut self, msg: &T) -> Result<()> {
        let payload = serde_json::to_vec(msg)?;
        self.write_frame(frame::MESSAGE, &payload).await
    }

    pub async fn write_block(&mut self, data: &[u8]) -> Result<()> {
        self.write_frame(frame::BLOCK, data).await
    }

    pub async fn write_error(&mut self, msg: &str) -> Result<()> {
        self.write_frame(frame::ERROR, msg.as_bytes()).await
    }

    /// Wait for the client to hang up
    pub async fn drain(mut self) {
        let mut buf = [0u8; 1024];
        while let Ok(n) = self.stream.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
    }

    async fn write_frame(&mut self, t: u8, payload: &[u8]) -> Result<()> {
        self.stream
            .write_all(&build_frame_header(t, payload.len() as u32))
            .await?;
        self.stream.write_all(payload).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<(u8, Vec<u8>)> {
        let mut hdr = [0u8; HEADER_LEN];
        self.stream.read_exact(&mut hdr).await?;
        let (typ, len) = parse_frame_header(&hdr)?;
        let mut payload = vec![0u8; len as usize];
        self.stream.read_exact(&mut payload).await?;
        Ok((typ, payload))
    }
}
