use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::error;

use crate::evidence::{EvidenceEntry, EvidenceError, EvidenceSink};

const GENESIS: &str = "genesis";

#[derive(Serialize, Deserialize, Clone)]
struct ChainedEntry {
    entry_hash: String,
    prev_hash: String,
    #[serde(flatten)]
    entry: EvidenceEntry,
}

fn chain_hash(prev_hash: &str, entry: &EvidenceEntry) -> Result<String, EvidenceError> {
    let entry_json = serde_json::to_string(entry)?;
    let mut hasher = Sha256::new();
    hasher.update(prev_hash);
    hasher.update(&entry_json);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Hash-chained JSONL evidence file. Each line commits to the one before it,
/// so truncation or edits in the middle are detected on open.
pub struct ChainedEvidenceLog {
    log_path: PathBuf,
    file: Mutex<File>,
    last_hash: Mutex<String>,
}

impl ChainedEvidenceLog {
    pub fn open<P: AsRef<Path>>(log_path: P) -> Result<Self, EvidenceError> {
        let log_path = log_path.as_ref().to_path_buf();

        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Verify existing chain and get last hash
        let (last_hash, _) = Self::walk(&log_path)?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            log_path,
            file: Mutex::new(file),
            last_hash: Mutex::new(last_hash),
        })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    pub fn verify_integrity(&self) -> Result<(), EvidenceError> {
        Self::walk(&self.log_path)?;
        Ok(())
    }

    /// All entries currently on disk, after verifying the chain.
    pub fn load_entries(&self) -> Result<Vec<EvidenceEntry>, EvidenceError> {
        let (_, entries) = Self::walk(&self.log_path)?;
        Ok(entries)
    }

    fn walk(log_path: &Path) -> Result<(String, Vec<EvidenceEntry>), EvidenceError> {
        if !log_path.exists() {
            return Ok((GENESIS.to_string(), Vec::new()));
        }

        let reader = BufReader::new(File::open(log_path)?);
        let mut prev_hash = GENESIS.to_string();
        let mut entries = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line_num = index + 1;
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            let chained: ChainedEntry = serde_json::from_str(&line).map_err(|e| {
                EvidenceError::IntegrityViolation(format!("Line {}: Invalid JSON: {}", line_num, e))
            })?;

            if chained.prev_hash != prev_hash {
                return Err(EvidenceError::IntegrityViolation(format!(
                    "Line {}: Hash chain broken. Expected prev_hash '{}', got '{}'",
                    line_num, prev_hash, chained.prev_hash
                )));
            }

            let computed = chain_hash(&prev_hash, &chained.entry)?;
            if computed != chained.entry_hash {
                return Err(EvidenceError::IntegrityViolation(format!(
                    "Line {}: Hash mismatch. Expected '{}', got '{}'",
                    line_num, computed, chained.entry_hash
                )));
            }

            prev_hash = chained.entry_hash;
            entries.push(chained.entry);
        }

        Ok((prev_hash, entries))
    }
}

impl EvidenceSink for ChainedEvidenceLog {
    fn append(&self, entry: &EvidenceEntry) -> Result<(), EvidenceError> {
        let mut last_hash = self.last_hash.lock();
        let entry_hash = chain_hash(&last_hash, entry)?;

        let chained = ChainedEntry {
            entry_hash: entry_hash.clone(),
            prev_hash: last_hash.clone(),
            entry: entry.clone(),
        };

        let mut line = serde_json::to_vec(&chained)?;
        line.push(b'\n');
        append_line(&mut *self.file.lock(), &line)?;

        *last_hash = entry_hash;
        Ok(())
    }
}

/// File operations needed to append a line all-or-nothing.
trait LogFile: Write {
    fn current_len(&self) -> io::Result<u64>;
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
    fn sync(&mut self) -> io::Result<()>;
}

impl LogFile for File {
    fn current_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Write `line` in one call. On failure the file is cut back to its previous
/// length so a torn line never breaks the chain for the next open.
fn append_line<F: LogFile>(file: &mut F, line: &[u8]) -> io::Result<()> {
    let len_before = file.current_len()?;

    let result = file.write_all(line).and_then(|_| file.sync());
    if let Err(e) = result {
        if let Err(truncate_err) = file.truncate_to(len_before) {
            error!(error = %truncate_err, "Failed to roll back partial evidence line");
        }
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts `budget` bytes, then fails like a full disk.
    struct ShortFile {
        data: Vec<u8>,
        budget: usize,
    }

    impl Write for ShortFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.budget == 0 {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
            }
            let n = buf.len().min(self.budget);
            self.data.extend_from_slice(&buf[..n]);
            self.budget -= n;
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogFile for ShortFile {
        fn current_len(&self) -> io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn truncate_to(&mut self, len: u64) -> io::Result<()> {
            self.data.truncate(len as usize);
            Ok(())
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_append_leaves_no_partial_line() {
        let mut file = ShortFile {
            data: b"{\"first\":1}\n".to_vec(),
            budget: 5,
        };

        assert!(append_line(&mut file, b"{\"second\":2}\n").is_err());
        assert_eq!(file.data, b"{\"first\":1}\n");
    }

    #[test]
    fn test_append_writes_whole_line() {
        let mut file = ShortFile {
            data: Vec::new(),
            budget: 1024,
        };

        append_line(&mut file, b"{\"a\":1}\n").unwrap();
        append_line(&mut file, b"{\"b\":2}\n").unwrap();
        assert_eq!(file.data, b"{\"a\":1}\n{\"b\":2}\n");
    }
}
