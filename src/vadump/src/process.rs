//! Process Directory Seam
//!
//! The process list itself comes from outside this crate (whatever
//! parsed the image's kernel structures); the core consumes it through
//! the `ProcessDirectory` trait and the per-process `ProcessEntry`
//! view it hands out.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessListError {
    #[error("failed to enumerate processes: {0}")]
    Enumeration(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One process as seen by the directory for the duration of a run
#[derive(Debug, Clone)]
pub struct ProcessEntry {
    /// Numeric identifier, unique within the snapshot
    pub pid: u64,
    /// Fixed-length raw image name bytes, possibly NUL-padded and not
    /// guaranteed to be valid UTF-8
    pub image_name_raw: Vec<u8>,
    /// Key into the address-space resolver for this process's layer
    pub layer_name: String,
    /// Address of the region-tree root node, 0 when missing
    pub vad_root: u64,
}

impl ProcessEntry {
    /// Decode the image name: truncate at the first NUL, replace any
    /// invalid UTF-8 with the replacement character. Never fails.
    pub fn image_name(&self) -> String {
        let end = self
            .image_name_raw
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.image_name_raw.len());
        String::from_utf8_lossy(&self.image_name_raw[..end]).to_string()
    }
}

/// Trait for enumerating the processes of a memory image
pub trait ProcessDirectory {
    fn list_processes(&self) -> Result<Vec<ProcessEntry>, ProcessListError>;
}
