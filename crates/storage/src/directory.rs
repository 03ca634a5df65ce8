// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory handle for batch files
//!
//! Thin wrapper over a filesystem location. Listing always reflects what is
//! on disk; no state is cached here.

use crate::file::{BatchFile, ReadableFile};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Outcome of moving a directory's files elsewhere
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveSummary {
    pub moved: u64,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    path: PathBuf,
}

impl Directory {
    /// Open a directory, creating it and any missing parents
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// Open (or create) a child directory
    pub fn subdirectory(&self, name: &str) -> io::Result<Directory> {
        Directory::open(self.path.join(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty file; fails if the name is taken
    pub fn create_file(&self, name: &str) -> io::Result<BatchFile> {
        let path = self.path.join(name);
        OpenOptions::new().write(true).create_new(true).open(&path)?;
        Ok(BatchFile::new(path, name.to_string()))
    }

    /// Handle to an existing file
    pub fn file(&self, name: &str) -> Option<BatchFile> {
        let path = self.path.join(name);
        path.is_file().then(|| BatchFile::new(path, name.to_string()))
    }

    /// All regular files in this directory, in no particular order
    pub fn files(&self) -> io::Result<Vec<BatchFile>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            files.push(BatchFile::new(entry.path(), name));
        }
        Ok(files)
    }

    /// Delete every file; returns how many files and bytes were removed
    pub fn delete_all_files(&self) -> io::Result<MoveSummary> {
        let mut summary = MoveSummary::default();
        for file in self.files()? {
            let size = file.size().unwrap_or(0);
            file.delete()?;
            summary.moved += 1;
            summary.bytes += size;
        }
        Ok(summary)
    }

    /// Move every file into `destination`
    ///
    /// Each file is moved with a single rename, so a crash leaves every file
    /// in exactly one of the two directories and re-running the move picks up
    /// where it stopped. A name already taken in `destination` is bumped to
    /// the next free numeric name so nothing is overwritten.
    pub fn move_all_files(&self, destination: &Directory) -> io::Result<MoveSummary> {
        let mut summary = MoveSummary::default();
        for file in self.files()? {
            let size = file.size().unwrap_or(0);
            let target = destination.free_name(file_name(&file));
            fs::rename(file.path(), destination.path.join(&target))?;
            summary.moved += 1;
            summary.bytes += size;
        }
        Ok(summary)
    }

    fn free_name(&self, name: &str) -> String {
        if !self.path.join(name).exists() {
            return name.to_string();
        }
        match name.parse::<u64>() {
            Ok(mut value) => loop {
                value = value.saturating_add(1);
                let candidate = format!("{:0width$}", value, width = name.len());
                if !self.path.join(&candidate).exists() {
                    return candidate;
                }
            },
            Err(_) => {
                let mut suffix = 1u32;
                loop {
                    let candidate = format!("{name}-{suffix}");
                    if !self.path.join(&candidate).exists() {
                        return candidate;
                    }
                    suffix += 1;
                }
            }
        }
    }
}

fn file_name(file: &BatchFile) -> &str {
    ReadableFile::name(file)
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;
