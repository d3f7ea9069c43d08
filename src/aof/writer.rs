//! AOF writer

use super::{AofEntry, AofError, SyncPolicy};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct WriterState {
    file: File,
    last_sync: Instant,
}

/// Appends entries to one AOF file
pub struct AofWriter {
    state: Mutex<WriterState>,
    sync_policy: SyncPolicy,
}

impl AofWriter {
    pub fn new<P: AsRef<Path>>(path: P, sync_policy: SyncPolicy) -> Result<Self, AofError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(AofWriter {
            state: Mutex::new(WriterState {
                file,
                last_sync: Instant::now(),
            }),
            sync_policy,
        })
    }

    pub fn write(&self, entry: &AofEntry) -> Result<(), AofError> {
        let bytes = entry.to_bytes();
        let mut state = self.state.lock().map_err(|_| AofError::Poisoned)?;
        state.file.write_all(&bytes)?;

        match self.sync_policy {
            SyncPolicy::Always => state.file.sync_data()?,
            SyncPolicy::EverySec => {
                if state.last_sync.elapsed() >= Duration::from_secs(1) {
                    state.file.sync_data()?;
                    state.last_sync = Instant::now();
                }
            }
            SyncPolicy::No => {}
        }

        Ok(())
    }

    /// Current length of the file in bytes
    pub fn file_size(&self) -> Result<u64, AofError> {
        let state = self.state.lock().map_err(|_| AofError::Poisoned)?;
        Ok(state.file.metadata()?.len())
    }

    /// Force everything written so far to disk
    pub fn sync(&self) -> Result<(), AofError> {
        let mut state = self.state.lock().map_err(|_| AofError::Poisoned)?;
        state.file.flush()?;
        state.file.sync_all()?;
        state.last_sync = Instant::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aof::AofOperation;
    use bytes::Bytes;

    #[test]
    fn test_write_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("writer.aof");

        let writer = AofWriter::new(&path, SyncPolicy::Always).unwrap();
        let entry = AofEntry::new(
            AofOperation::HSet,
            Bytes::from("user:1"),
            vec![Bytes::from("username"), Bytes::from("alice")],
        );
        writer.write(&entry).unwrap();
        writer.write(&entry).unwrap();
        writer.sync().unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len as usize, entry.to_bytes().len() * 2);
    }
}
