// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch file handles
//!
//! A batch file is written through the `WritableFile` role while it is the
//! active file of its directory, and consumed through the `ReadableFile`
//! role once it is eligible for upload.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

/// Append-only access to a batch file
pub trait WritableFile: Send {
    fn name(&self) -> &str;
    fn size(&self) -> io::Result<u64>;
    /// Append bytes durably; returns once the data is synced to disk
    fn append(&self, data: &[u8]) -> io::Result<()>;
}

/// Streaming read access to a batch file
pub trait ReadableFile: Send {
    fn name(&self) -> &str;
    fn size(&self) -> io::Result<u64>;
    fn stream(&self) -> io::Result<Box<dyn Read + Send>>;
    fn delete(&self) -> io::Result<()>;
}

/// A file inside a batch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFile {
    path: PathBuf,
    name: String,
}

impl BatchFile {
    pub(crate) fn new(path: PathBuf, name: String) -> Self {
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl WritableFile for BatchFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    fn append(&self, data: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        file.write_all(data)?;
        // Critical: sync so an appended event survives a crash
        file.sync_data()
    }
}

impl ReadableFile for BatchFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> io::Result<u64> {
        Ok(fs::metadata(&self.path)?.len())
    }

    fn stream(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(BufReader::new(File::open(&self.path)?)))
    }

    fn delete(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            // Already gone counts as deleted
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
