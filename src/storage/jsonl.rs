//! JSONL storage for vessels and batches
//!
//! Records are stored one JSON object per line under `.stillroom/`. Uses
//! file locking for concurrent access safety. Rewrites go through a temp
//! file and an atomic rename, so a transfer touching two vessels lands in
//! `vessels.jsonl` in one shot, never one vessel with the other stale.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::hash::Hash;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::{Batch, BatchId, Vessel, VesselId};

/// A record type persisted in its own JSONL file
pub trait JsonlRecord: Serialize + DeserializeOwned + Clone {
    type Id: Clone + Eq + Hash + Display;

    fn record_id(&self) -> &Self::Id;

    /// Name used in error messages ("vessel", "batch")
    fn record_name() -> &'static str;

    /// File name under the project directory
    fn file_name() -> &'static str;
}

impl JsonlRecord for Vessel {
    type Id = VesselId;

    fn record_id(&self) -> &VesselId {
        &self.id
    }

    fn record_name() -> &'static str {
        "vessel"
    }

    fn file_name() -> &'static str {
        "vessels.jsonl"
    }
}

impl JsonlRecord for Batch {
    type Id = BatchId;

    fn record_id(&self) -> &BatchId {
        &self.id
    }

    fn record_name() -> &'static str {
        "batch"
    }

    fn file_name() -> &'static str {
        "batches.jsonl"
    }
}

/// Store for one record type in JSONL format
pub struct JsonlStore<T: JsonlRecord> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

pub type VesselStore = JsonlStore<Vessel>;
pub type BatchStore = JsonlStore<Batch>;

impl<T: JsonlRecord> JsonlStore<T> {
    /// Creates a new store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".stillroom").join(T::file_name()))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all records from the store
    pub fn read_all(&self) -> Result<HashMap<T::Id, T>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let file = File::open(&self.path).with_context(|| {
            format!(
                "Failed to open {} store: {}",
                T::record_name(),
                self.path.display()
            )
        })?;

        // Acquire shared lock for reading
        file.lock_shared()
            .with_context(|| format!("Failed to acquire read lock on {} store", T::record_name()))?;

        let reader = BufReader::new(&file);
        let mut records = HashMap::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

            if line.trim().is_empty() {
                continue;
            }

            let record: T = serde_json::from_str(&line).with_context(|| {
                format!(
                    "Failed to parse {} at line {}",
                    T::record_name(),
                    line_num + 1
                )
            })?;

            records.insert(record.record_id().clone(), record);
        }

        // Lock is released when file is dropped
        Ok(records)
    }

    /// Writes all records to the store (full rewrite)
    pub fn write_all(&self, records: &HashMap<T::Id, T>) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            // Acquire exclusive lock
            file.lock_exclusive().with_context(|| {
                format!("Failed to acquire write lock on {} store", T::record_name())
            })?;

            let mut writer = BufWriter::new(&file);

            // Sort by ID for consistent output
            let mut sorted: Vec<_> = records.values().collect();
            sorted.sort_by(|a, b| {
                a.record_id()
                    .to_string()
                    .cmp(&b.record_id().to_string())
            });

            for record in sorted {
                let line = serde_json::to_string(record)
                    .with_context(|| format!("Failed to serialize {}", T::record_name()))?;
                writeln!(writer, "{}", line)
                    .with_context(|| format!("Failed to write {}", T::record_name()))?;
            }

            writer
                .flush()
                .with_context(|| format!("Failed to flush {} store", T::record_name()))?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Appends a single record (used for quick adds without full rewrite)
    pub fn append(&self, record: &T) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| {
                format!(
                    "Failed to open {} store: {}",
                    T::record_name(),
                    self.path.display()
                )
            })?;

        // Acquire exclusive lock
        file.lock_exclusive().with_context(|| {
            format!("Failed to acquire write lock on {} store", T::record_name())
        })?;

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(record)
            .with_context(|| format!("Failed to serialize {}", T::record_name()))?;
        writeln!(writer, "{}", line)
            .with_context(|| format!("Failed to write {}", T::record_name()))?;

        writer
            .flush()
            .with_context(|| format!("Failed to flush {} store", T::record_name()))?;

        Ok(())
    }

    /// Updates a single record (reads all, updates, writes all)
    pub fn update(&self, record: &T) -> Result<()> {
        let mut records = self.read_all()?;
        records.insert(record.record_id().clone(), record.clone());
        self.write_all(&records)
    }

    /// Updates several records in one atomic rewrite. Both sides of a
    /// vessel transfer go through here so a crash can never persist one
    /// mutated vessel without the other.
    pub fn update_many<'a, I>(&self, updated: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut records = self.read_all()?;
        for record in updated {
            records.insert(record.record_id().clone(), record.clone());
        }
        self.write_all(&records)
    }

    /// Removes a record by ID
    pub fn remove(&self, id: &T::Id) -> Result<bool> {
        let mut records = self.read_all()?;
        let removed = records.remove(id).is_some();
        if removed {
            self.write_all(&records)?;
        }
        Ok(removed)
    }

    /// Compacts the store (removes duplicates, rewrites clean)
    pub fn compact(&self) -> Result<usize> {
        let records = self.read_all()?;
        let count = records.len();
        self.write_all(&records)?;
        Ok(count)
    }
}
