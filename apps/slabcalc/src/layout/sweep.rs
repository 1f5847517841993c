//! Size-class × page-count sweep, plus a page-count recommendation per class.
//!
//! Slab page counts must be powers of two: freeing an object aligns its address
//! down to the slab size to find the owning slab. Recommendations therefore only
//! consider power-of-two page counts.

use serde::Serialize;
use tracing::{debug, info};

use crate::errors::{LayoutError, LayoutResult};
use crate::layout::calculator::{compute_layout, LayoutReport};
use crate::layout::constants::LayoutConstants;

/// All layouts for one object size across page counts `1..=max_pages`.
#[derive(Debug, Clone, Serialize)]
pub struct SizeClassSweep {
    pub object_size: u64,
    /// Power-of-two page count with the best payload utilization, if any row qualifies.
    pub recommended_pages: Option<u64>,
    pub rows: Vec<LayoutReport>,
}

/// Running best page count, fed one row at a time.
///
/// Only power-of-two page counts with at least one slot qualify. Ties go to
/// the earlier (smaller) page count. Ratios are compared exactly by
/// cross-multiplication so equal utilizations never differ by float noise.
#[derive(Debug, Default, Clone, Copy)]
pub struct PageCountRecommender {
    best: Option<(u64, u64, u64)>, // (page_count, payload_bytes, total_bytes)
}

impl PageCountRecommender {
    pub fn observe(&mut self, row: &LayoutReport) {
        if !row.page_count.is_power_of_two() || row.entries == 0 {
            return;
        }
        let better = match self.best {
            None => true,
            Some((_, payload, total)) => {
                let lhs = row.payload_bytes as u128 * total as u128;
                let rhs = payload as u128 * row.total_bytes as u128;
                lhs > rhs
            }
        };
        if better {
            self.best = Some((row.page_count, row.payload_bytes, row.total_bytes));
        }
    }

    pub fn recommended(&self) -> Option<u64> {
        self.best.map(|(pages, _, _)| pages)
    }
}

/// Computes layouts for page counts `1..=max_pages` one at a time, handing each
/// row to `sink` before the next is computed. Returns the recommended page count.
///
/// Nothing is retained between rows, so memory stays constant in `max_pages`.
/// Stops at the first calculator or sink error.
pub fn stream_size_class<F, E>(
    object_size: u64,
    max_pages: u64,
    constants: &LayoutConstants,
    mut sink: F,
) -> Result<Option<u64>, E>
where
    F: FnMut(&LayoutReport) -> Result<(), E>,
    E: From<LayoutError>,
{
    if max_pages < 1 {
        return Err(
            LayoutError::InvalidInput("maximum page count must be >= 1".to_string()).into(),
        );
    }

    let mut recommender = PageCountRecommender::default();
    for pages in 1..=max_pages {
        let row = compute_layout(object_size, pages, constants)?;
        recommender.observe(&row);
        sink(&row)?;
    }

    let recommended = recommender.recommended();
    debug!(object_size, max_pages, "swept size class");
    if let Some(pages) = recommended {
        info!(object_size, pages, "recommended slab page count");
    }
    Ok(recommended)
}

/// Computes and keeps every layout for `object_size` (used for the JSON document).
pub fn sweep_size_class(
    object_size: u64,
    max_pages: u64,
    constants: &LayoutConstants,
) -> LayoutResult<SizeClassSweep> {
    let mut rows = Vec::new();
    let recommended_pages = stream_size_class(object_size, max_pages, constants, |row| {
        rows.push(row.clone());
        Ok::<(), LayoutError>(())
    })?;

    Ok(SizeClassSweep {
        object_size,
        recommended_pages,
        rows,
    })
}

/// Sweeps every size class in order. Stops at the first failing layout.
pub fn sweep_all(
    size_classes: &[u64],
    max_pages: u64,
    constants: &LayoutConstants,
) -> LayoutResult<Vec<SizeClassSweep>> {
    size_classes
        .iter()
        .map(|&size| sweep_size_class(size, max_pages, constants))
        .collect()
}
