//! Intersection of the starred dataset with the code-search dataset.

use std::path::Path;

use crate::store::{IdentityKey, RecordStore, Result};

/// Row counts of an intersection run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IntersectSummary {
    /// Rows of the starred dataset.
    pub starred: usize,
    /// Rows of the code-search dataset.
    pub by_code: usize,
    /// Rows present in both and written out.
    pub intersection: usize,
}

/// Repositories present in both stores.
///
/// The result is keyed by `owner/name` and normalized on write. Fields of
/// `by_code` win over fields of `starred` on collision.
pub fn intersect(starred: &RecordStore, by_code: &RecordStore) -> Result<RecordStore> {
    let mut out = RecordStore::repositories();
    for (key, row) in starred.iter() {
        if let Some(other) = by_code.get(key) {
            out.insert(row.merged_with(other))?;
        }
    }
    Ok(out)
}

/// Intersect two CSV datasets and write the result to `out`.
pub fn intersect_files(starred: &Path, by_code: &Path, out: &Path) -> Result<IntersectSummary> {
    let starred = RecordStore::repositories().open(starred)?;
    let by_code = RecordStore::new(IdentityKey::repository_column()).open(by_code)?;

    let merged = intersect(&starred, &by_code)?;
    let intersection = merged.write_to(out)?;
    tracing::info!(
        starred = starred.len(),
        by_code = by_code.len(),
        intersection,
        path = %out.display(),
        "Wrote intersection"
    );

    Ok(IntersectSummary {
        starred: starred.len(),
        by_code: by_code.len(),
        intersection,
    })
}
