//! Trace sync client library
//!
//! Compares a local directory against a trace server and downloads the
//! files the server has that the directory lacks.

pub mod config;
pub mod confirm;
pub mod download;
pub mod exchange;
pub mod inventory;
pub mod logger;
pub mod net;
pub mod protocol;
pub mod protocol_core;
pub mod reassemble;
pub mod record;
pub mod report;
pub mod sync;

pub use config::Config;
pub use record::{FileRecord, ListItem};
