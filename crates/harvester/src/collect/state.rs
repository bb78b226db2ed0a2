//! Per-bracket pagination state.

use crate::query::SearchFilter;

use super::aimd::PageSizeController;

/// Everything the controller tracks while paging through one bracket.
#[derive(Debug, Clone)]
pub struct PaginationState {
    /// Filter currently being paged; replaced on cap restarts.
    pub filter: SearchFilter,
    /// Opaque position in the current result set.
    pub cursor: Option<String>,
    pub sizing: PageSizeController,
    /// Repositories merged during this bracket.
    pub collected: usize,
    /// Result count reported by the first successful page.
    pub total: Option<u64>,
    /// Star count of the last repository seen.
    pub high_water: u64,
    /// Lower bound of the latest cap restart.
    pub last_restart_min: Option<u64>,
    /// Pages merged during this bracket.
    pub pages: u32,
    /// Cap restarts during this bracket.
    pub restarts: u32,
}

impl PaginationState {
    /// Fresh state for a bracket starting at `filter`'s lower bound.
    #[must_use]
    pub fn new(filter: SearchFilter, sizing: PageSizeController) -> Self {
        let high_water = filter.min_stars();
        Self {
            filter,
            cursor: None,
            sizing,
            collected: 0,
            total: None,
            high_water,
            last_restart_min: None,
            pages: 0,
            restarts: 0,
        }
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.sizing.page_size()
    }
}
