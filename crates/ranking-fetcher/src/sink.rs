//! Newline-delimited JSON output.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends ranking records to one output file as JSON lines
///
/// The sink exclusively owns its file handle for its lifetime. The
/// buffered writer flushes on drop, so an abandoned sink still reaches
/// the disk; `finish` makes the flush explicit and surfaces its errors.
pub struct RecordSink {
    writer: BufWriter<File>,
    path: PathBuf,
    records: usize,
}

impl RecordSink {
    /// Open `path` for a fresh run, truncating any previous contents
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            records: 0,
        })
    }

    /// Append records as one compact JSON line each
    ///
    /// Records are written verbatim in the order given; non-ASCII text
    /// stays literal UTF-8, not escaped.
    pub fn append(&mut self, records: &[Value]) -> Result<usize> {
        for record in records {
            serde_json::to_writer(&mut self.writer, record).with_context(|| {
                format!("Failed to serialize record for {}", self.path.display())
            })?;
            self.writer
                .write_all(b"\n")
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        self.records += records.len();
        Ok(records.len())
    }

    /// Flush and close, returning the number of lines written
    pub fn finish(mut self) -> Result<usize> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;
        Ok(self.records)
    }
}
