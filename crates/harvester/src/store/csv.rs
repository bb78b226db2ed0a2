//! CSV persistence for record tables.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::record::{FieldValue, RepositoryRecord};

use super::errors::{Result, StoreError};

/// Columns written first, in this order, when present.
pub const PREFERRED_COLUMNS: &[&str] = &[
    "repository",
    "owner",
    "name",
    "url",
    "description",
    "primaryLanguage",
    "stargazers",
    "forkCount",
    "watchers",
    "issues",
    "pullRequests",
    "releases",
    "diskUsage",
    "isMirror",
    "createdAt",
    "pushedAt",
    "search_string",
];

/// Read every row of a CSV table.
///
/// A missing file is an empty table. Empty cells become nulls; other cells are
/// type-inferred with [`FieldValue::parse_cell`].
pub fn read_table(path: &Path) -> Result<Vec<RepositoryRecord>> {
    let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            if let csv::ErrorKind::Io(io) = e.kind()
                && io.kind() == ErrorKind::NotFound
            {
                tracing::debug!(path = %path.display(), "No table yet, starting empty");
                return Ok(Vec::new());
            }
            return Err(StoreError::csv(path, e));
        }
    };

    let headers = reader
        .headers()
        .map_err(|e| StoreError::csv(path, e))?
        .clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| StoreError::csv(path, e))?;
        let record = RepositoryRecord::from_cells(
            headers
                .iter()
                .zip(row.iter())
                .map(|(column, cell)| (column, FieldValue::parse_cell(cell))),
        );
        records.push(record);
    }

    tracing::debug!(path = %path.display(), rows = records.len(), "Loaded table");
    Ok(records)
}

/// Column order for a set of records: preferred columns first, then the rest
/// alphabetically.
#[must_use]
pub fn column_order<'a>(
    records: impl IntoIterator<Item = &'a RepositoryRecord>,
) -> Vec<String> {
    let present: BTreeSet<&str> = records
        .into_iter()
        .flat_map(|record| record.field_names())
        .collect();

    let mut columns: Vec<String> = PREFERRED_COLUMNS
        .iter()
        .filter(|c| present.contains(*c))
        .map(|c| (*c).to_string())
        .collect();
    columns.extend(
        present
            .iter()
            .filter(|c| !PREFERRED_COLUMNS.contains(*c))
            .map(|c| (*c).to_string()),
    );
    columns
}

/// Replace the table at `path` with `records`, using the given columns.
///
/// The table is written to a sibling temporary file first and then renamed
/// over the destination so a crash mid-write leaves the previous table intact.
pub fn write_table(
    path: &Path,
    records: &[RepositoryRecord],
    columns: &[String],
) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    {
        let mut writer =
            csv::Writer::from_path(&tmp_path).map_err(|e| StoreError::csv(&tmp_path, e))?;
        writer
            .write_record(columns)
            .map_err(|e| StoreError::csv(&tmp_path, e))?;
        for record in records {
            writer
                .write_record(columns.iter().map(|c| record.cell(c)))
                .map_err(|e| StoreError::csv(&tmp_path, e))?;
        }
        writer.flush().map_err(|e| StoreError::io(&tmp_path, e))?;
    }
    fs::rename(&tmp_path, path).map_err(|e| StoreError::io(path, e))?;

    tracing::debug!(path = %path.display(), rows = records.len(), "Wrote table");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let records = read_table(&dir.path().join("absent.csv")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn write_then_read_preserves_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("table.csv");
        let records = vec![
            RepositoryRecord::from_cells([
                ("owner", FieldValue::from("a")),
                ("name", FieldValue::from("b, with comma")),
                ("stargazers", FieldValue::Int(5)),
                ("isMirror", FieldValue::Bool(false)),
                ("description", FieldValue::Null),
            ]),
            RepositoryRecord::from_cells([("owner", "c"), ("name", "d")]),
        ];
        let columns = column_order(&records);
        write_table(&path, &records, &columns).unwrap();

        let loaded = read_table(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].cell("name"), "b, with comma");
        assert_eq!(loaded[0].get("stargazers"), Some(&FieldValue::Int(5)));
        assert_eq!(loaded[0].get("isMirror"), Some(&FieldValue::Bool(false)));
        assert_eq!(loaded[1].get("stargazers"), Some(&FieldValue::Null));
        assert!(!path.with_extension("csv.tmp").exists());
    }

    #[test]
    fn column_order_puts_preferred_columns_first() {
        let records = vec![RepositoryRecord::from_cells([
            ("zeta", "1"),
            ("stargazers", "2"),
            ("alpha", "3"),
            ("owner", "4"),
            ("name", "5"),
        ])];
        assert_eq!(
            column_order(&records),
            vec!["owner", "name", "stargazers", "alpha", "zeta"]
        );
    }

    #[test]
    fn invalid_utf8_is_a_csv_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, b"owner,name\n\xff\xfe,x\n").unwrap();
        let err = read_table(&path).unwrap_err();
        assert!(matches!(err, StoreError::Csv { .. }));
    }
}
