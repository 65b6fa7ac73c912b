//! File path utilities for organizing output files.
//!
//! This module provides a centralized way to manage paths for the ranking
//! archive files and logs under the data root.

use std::path::{Path, PathBuf};

/// File path manager for data files
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    /// Create a new DataPaths with the given root directory
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Get the root data directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the output directory
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    /// Get the single-file ranking archive path
    pub fn ranking_file(&self) -> PathBuf {
        self.output_dir().join("rankings.jsonl")
    }

    /// Get the part-file path for a partitioned run (1-based index)
    pub fn ranking_part_file(&self, part: u32) -> PathBuf {
        self.output_dir().join(format!("ranking_part{}.jsonl", part))
    }

    /// Get the logs directory
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Create all necessary directories
    pub fn create_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.output_dir())?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
