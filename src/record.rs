//! File records exchanged with the server and the end-of-list marker.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// A file relative to the sync root, as listed locally or by the server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Forward-slash separated, no leading slash
    pub path: String,
    pub size: u64,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// One entry of a list crossing the control connection.
///
/// On the wire the end of a list is an empty record; in memory it is a
/// separate variant so an empty path can never be mistaken for a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItem {
    Record(FileRecord),
    EndOfList,
}

impl ListItem {
    /// Record written to the wire for this item
    pub fn to_wire(&self) -> FileRecord {
        match self {
            ListItem::Record(r) => r.clone(),
            ListItem::EndOfList => FileRecord::new("", 0),
        }
    }

    /// The empty record terminates the list. A record with no path but a
    /// size is malformed.
    pub fn from_wire(record: FileRecord) -> Result<Self> {
        match (record.path.is_empty(), record.size) {
            (true, 0) => Ok(ListItem::EndOfList),
            (true, size) => bail!("record without a path has size {}", size),
            (false, _) => Ok(ListItem::Record(record)),
        }
    }
}

/// Convert any backslash separators to forward slashes
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}
