//! Rebuild one downloaded file from its block stream.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};

use crate::net::Connection;
use crate::protocol_core::ensure_parent_exists;

/// Drop trailing NUL padding from a block
pub fn strip_padding(block: &[u8]) -> &[u8] {
    let end = block.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    &block[..end]
}

/// Read blocks from `conn` into `dest` until the empty end-of-stream block.
///
/// `dest` is created (or truncated) after its parent directories. A read or
/// write error stops the transfer and leaves whatever was already flushed on
/// disk. Returns the number of bytes written.
pub async fn receive_file<S>(
    conn: &mut Connection<S>,
    dest: &Path,
    buffer_size: usize,
) -> Result<u64>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    ensure_parent_exists(dest).await?;
    let file = tokio::fs::File::create(dest)
        .await
        .with_context(|| format!("create {}", dest.display()))?;
    let mut writer = BufWriter::with_capacity(buffer_size.max(1), file);

    let mut written = 0u64;
    loop {
        let block = conn
            .read_raw()
            .await
            .with_context(|| format!("read {} contents from connection", dest.display()))?;
        if block.is_empty() {
            break;
        }
        let data = strip_padding(&block);
        writer
            .write_all(data)
            .await
            .with_context(|| format!("write {} contents to disk", dest.display()))?;
        written += data.len() as u64;
    }

    writer
        .flush()
        .await
        .with_context(|| format!("flush {}", dest.display()))?;
    Ok(written)
}
