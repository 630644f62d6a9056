//! List exchange over the `/sync` control connection.
//!
//! The client streams its inventory one record per message and terminates
//! it with the end-of-list marker. The server answers with the records the
//! client does not have, terminated the same way.

use anyhow::{bail, Context, Result};
use std::path::{Component, Path};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::net::{self, Connection, Params};
use crate::protocol::route;
use crate::record::{normalize_separators, FileRecord, ListItem};

/// Dial the server and run the list exchange. The control connection is
/// closed before returning, and dropped on every error path.
pub async fn fetch_missing(host: &str, inventory: &[FileRecord]) -> Result<Vec<FileRecord>> {
    let mut conn = net::dial(host, route::SYNC, Params::new())
        .await
        .context("dial sync endpoint")?;
    let missing = exchange_lists(&mut conn, inventory).await?;
    // Best effort, the list is already complete
    let _ = conn.close().await;
    Ok(missing)
}

/// Send `inventory` followed by the end-of-list marker, then read the
/// missing list up to and including the server's marker. Nothing past the
/// marker is consumed.
pub async fn exchange_lists<S>(
    conn: &mut Connection<S>,
    inventory: &[FileRecord],
) -> Result<Vec<FileRecord>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    for record in inventory {
        conn.write_message(record)
            .await
            .with_context(|| format!("send record {}", record.path))?;
    }
    conn.write_message(&ListItem::EndOfList.to_wire())
        .await
        .context("send end of list")?;

    let mut missing = Vec::new();
    loop {
        let record: FileRecord = conn
            .read_message()
            .await
            .with_context(|| format!("read missing list after {} record(s)", missing.len()))?;
        match ListItem::from_wire(record).context("malformed record in missing list")? {
            ListItem::EndOfList => break,
            ListItem::Record(mut record) => {
                record.path = normalize_separators(&record.path);
                check_relative(&record.path)?;
                missing.push(record);
            }
        }
    }
    Ok(missing)
}

/// Server-provided paths must stay relative to the sync root
fn check_relative(path: &str) -> Result<()> {
    let p = Path::new(path);
    if path.starts_with('/') || p.is_absolute() {
        bail!("server sent absolute path {:?}", path);
    }
    if p.components().any(|c| matches!(c, Component::ParentDir)) {
        bail!("server sent path escaping the sync root {:?}", path);
    }
    Ok(())
}
