//! AOF reader

use super::{AofEntry, AofError};
use std::path::Path;
use tracing::{info, warn};

/// Whole-file AOF reader
pub struct AofReader {
    data: Vec<u8>,
}

impl AofReader {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AofError> {
        let data = std::fs::read(path)?;
        Ok(AofReader { data })
    }

    /// Load `path`, treating a missing file as an empty log
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Result<Self, AofError> {
        match std::fs::read(path) {
            Ok(data) => Ok(AofReader { data }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AofReader { data: Vec::new() }),
            Err(e) => Err(e.into()),
        }
    }

    /// Decode entries up to the first corrupt one
    ///
    /// Anything after a corrupt entry is ignored; the caller gets every
    /// entry before it.
    pub fn parse_entries(&self) -> Vec<AofEntry> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < self.data.len() {
            match AofEntry::from_bytes(&self.data[pos..]) {
                Ok((entry, size)) => {
                    entries.push(entry);
                    pos += size;
                }
                Err(e) => {
                    warn!(
                        "AOF corrupt at byte {}: {}. Keeping {} entries, ignoring {} trailing bytes",
                        pos,
                        e,
                        entries.len(),
                        self.data.len() - pos
                    );
                    return entries;
                }
            }
        }

        info!("AOF loaded: {} entries", entries.len());
        entries
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}
