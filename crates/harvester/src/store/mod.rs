//! Record stores: keyed, overwrite-wins tables of repository records.
//!
//! A [`RecordStore`] accumulates records in memory and can be bound to a CSV
//! file. Flushing re-reads the file, merges its rows *under* the in-memory
//! rows (memory wins on key collision) and rewrites the file wholesale.
//!
//! # Module Structure
//!
//! - [`csv`] - Reading and writing CSV tables
//! - [`normalize`] - Mirror detection, timestamp and ordering normalization
//! - [`errors`] - Error types

pub mod csv;
mod errors;
pub mod normalize;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::record::RepositoryRecord;

pub use errors::{Result, StoreError};

/// How a store derives the key of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityKey {
    /// `owner + "/" + name`.
    OwnerName,
    /// The value of a single column, e.g. `repository`.
    Column(String),
}

impl IdentityKey {
    /// Key column used by the code-search and details datasets.
    #[must_use]
    pub fn repository_column() -> Self {
        Self::Column("repository".to_string())
    }

    /// Compute the key of a record, if it has one.
    #[must_use]
    pub fn key_of(&self, record: &RepositoryRecord) -> Option<String> {
        match self {
            Self::OwnerName => record.identity(),
            Self::Column(column) => {
                let key = record.cell(column);
                (!key.is_empty()).then_some(key)
            }
        }
    }
}

/// How rows are shaped right before they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Mirror flag, naive timestamps, descending stars.
    Normalized,
    /// Rows as stored, ordered by key.
    Plain,
}

/// Keyed collection of repository records, optionally bound to a CSV file.
#[derive(Debug)]
pub struct RecordStore {
    key: IdentityKey,
    layout: Layout,
    records: HashMap<String, RepositoryRecord>,
    path: Option<PathBuf>,
}

impl RecordStore {
    /// An in-memory store.
    #[must_use]
    pub fn new(key: IdentityKey) -> Self {
        Self {
            key,
            layout: Layout::Plain,
            records: HashMap::new(),
            path: None,
        }
    }

    /// The store of starred-search results: keyed by `owner/name`, normalized
    /// on write.
    #[must_use]
    pub fn repositories() -> Self {
        Self::new(IdentityKey::OwnerName).with_layout(Layout::Normalized)
    }

    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Bind the store to `path` and load the rows already there.
    ///
    /// A missing file is fine; the store starts empty. A column-keyed store
    /// refuses a table without its key column.
    pub fn open(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows = csv::read_table(&path)?;
        if let IdentityKey::Column(column) = &self.key
            && rows.first().is_some_and(|row| row.get(column).is_none())
        {
            return Err(StoreError::MissingKeyColumn {
                path,
                column: column.clone(),
            });
        }
        self.absorb(rows);
        self.path = Some(path);
        Ok(self)
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RepositoryRecord> {
        self.records.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RepositoryRecord)> {
        self.records.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert a record, replacing any record with the same key.
    ///
    /// Returns the key the record was stored under.
    pub fn insert(&mut self, record: RepositoryRecord) -> Result<String> {
        let key = self
            .key
            .key_of(&record)
            .ok_or_else(|| StoreError::MissingIdentity(format!("{record:?}")))?;
        self.records.insert(key.clone(), record);
        Ok(key)
    }

    /// Flatten and insert every node of a search page.
    ///
    /// Returns the flattened records in page order. Merging the same page
    /// twice leaves the store unchanged the second time.
    pub fn merge_nodes(&mut self, nodes: &[Map<String, Value>]) -> Result<Vec<RepositoryRecord>> {
        let mut merged = Vec::with_capacity(nodes.len());
        for node in nodes {
            let record = RepositoryRecord::from_node(node);
            self.insert(record.clone())?;
            merged.push(record);
        }
        Ok(merged)
    }

    /// Add rows that are not in the store yet; existing keys win.
    ///
    /// Rows without a key are skipped with a warning.
    pub fn absorb(&mut self, rows: impl IntoIterator<Item = RepositoryRecord>) -> usize {
        let mut added = 0;
        for row in rows {
            match self.key.key_of(&row) {
                Some(key) => {
                    if let std::collections::hash_map::Entry::Vacant(slot) = self.records.entry(key)
                    {
                        slot.insert(row);
                        added += 1;
                    }
                }
                None => tracing::warn!(row = ?row, "Skipping row without identity"),
            }
        }
        added
    }

    /// Records in output order for the store's layout.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RepositoryRecord> {
        match self.layout {
            Layout::Normalized => normalize::finalize(self.records.values().cloned().collect()),
            Layout::Plain => {
                let mut keyed: Vec<(&String, &RepositoryRecord)> = self.records.iter().collect();
                keyed.sort_by(|a, b| a.0.cmp(b.0));
                keyed.into_iter().map(|(_, r)| r.clone()).collect()
            }
        }
    }

    /// Write the store to `path`, without touching the bound path.
    pub fn write_to(&self, path: &Path) -> Result<usize> {
        let rows = self.snapshot();
        let columns = csv::column_order(&rows);
        csv::write_table(path, &rows, &columns)?;
        Ok(rows.len())
    }

    /// Merge the bound file's rows under the in-memory rows and rewrite it.
    ///
    /// Returns the number of rows written. An unbound store is a no-op.
    pub fn flush(&mut self) -> Result<usize> {
        let Some(path) = self.path.clone() else {
            return Ok(0);
        };
        let on_disk = csv::read_table(&path)?;
        let added = self.absorb(on_disk);
        if added > 0 {
            tracing::debug!(path = %path.display(), added, "Merged rows written by someone else");
        }
        let written = self.write_to(&path)?;
        tracing::info!(path = %path.display(), rows = written, "Flushed record store");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use serde_json::json;

    fn node(owner: &str, name: &str, stars: i64) -> Map<String, Value> {
        json!({
            "owner": {"login": owner},
            "name": name,
            "stargazers": {"totalCount": stars},
            "description": "RPA bot",
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn insert_overwrites_same_identity() {
        let mut store = RecordStore::repositories();
        store
            .merge_nodes(&[node("robocorp", "rpaframework", 10)])
            .unwrap();
        store
            .merge_nodes(&[node("robocorp", "rpaframework", 20)])
            .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("robocorp/rpaframework").unwrap().stargazers(),
            Some(20)
        );
    }

    #[test]
    fn merging_a_page_twice_is_idempotent() {
        let page = vec![node("a", "x", 1), node("b", "y", 2)];
        let mut once = RecordStore::repositories();
        once.merge_nodes(&page).unwrap();
        let mut twice = RecordStore::repositories();
        twice.merge_nodes(&page).unwrap();
        twice.merge_nodes(&page).unwrap();
        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn nodes_without_identity_are_rejected() {
        let mut store = RecordStore::repositories();
        let bad = json!({"name": "orphan"}).as_object().cloned().unwrap();
        let err = store.merge_nodes(&[bad]).unwrap_err();
        assert!(matches!(err, StoreError::MissingIdentity(_)));
    }

    #[test]
    fn column_keyed_store_uses_that_column() {
        let mut store = RecordStore::new(IdentityKey::repository_column());
        store
            .insert(RepositoryRecord::from_cells([
                ("repository", "a/b"),
                ("search_string", "extension:robot"),
            ]))
            .unwrap();
        assert!(store.contains("a/b"));
    }

    #[test]
    fn flush_keeps_memory_rows_over_file_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.csv");

        let mut first = RecordStore::repositories().open(&path).unwrap();
        first
            .merge_nodes(&[node("a", "x", 1), node("b", "y", 2)])
            .unwrap();
        first.flush().unwrap();

        // A fresh store with newer data for a/x only.
        let mut second = RecordStore::repositories();
        second.merge_nodes(&[node("a", "x", 100)]).unwrap();
        let mut second = RecordStore {
            path: Some(path.clone()),
            ..second
        };
        assert_eq!(second.flush().unwrap(), 2);

        let reloaded = RecordStore::repositories().open(&path).unwrap();
        assert_eq!(reloaded.get("a/x").unwrap().stargazers(), Some(100));
        assert_eq!(reloaded.get("b/y").unwrap().stargazers(), Some(2));
    }

    #[test]
    fn flush_writes_normalized_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.csv");
        let mut store = RecordStore::repositories().open(&path).unwrap();
        let mut mirror = node("m", "mirror", 5);
        mirror.insert("description".into(), json!("Mirror of upstream"));
        mirror.insert("createdAt".into(), json!("2020-01-02T03:04:05Z"));
        store.merge_nodes(&[node("a", "x", 1), mirror]).unwrap();
        store.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "owner,name,description,stargazers,isMirror,createdAt");
        assert_eq!(lines[1], "m,mirror,Mirror of upstream,5,True,2020-01-02 03:04:05");
        assert_eq!(lines[2], "a,x,RPA bot,1,,");
    }

    #[test]
    fn column_keyed_open_requires_the_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("by_code.csv");
        std::fs::write(&path, "owner,name\na,b\n").unwrap();
        let err = RecordStore::new(IdentityKey::repository_column())
            .open(&path)
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingKeyColumn { column, .. } if column == "repository"));
    }

    #[test]
    fn unbound_flush_is_a_no_op() {
        let mut store = RecordStore::repositories();
        store.merge_nodes(&[node("a", "x", 1)]).unwrap();
        assert_eq!(store.flush().unwrap(), 0);
        assert_eq!(
            store.get("a/x").unwrap().get("name"),
            Some(&FieldValue::from("x"))
        );
    }
}
