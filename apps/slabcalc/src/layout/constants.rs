//! Structural constants for slab layouts and the default size-class sweep.
//!
//! A slab is `page_count * page_size` bytes holding, in order: the object
//! buffer, an occupancy bitmap (one bit per slot), and a two-pointer header
//! linking it into the per-class slab list.

use serde::Serialize;

use crate::errors::{LayoutError, LayoutResult};

// ────────────────────────────────────────────────────────────────────────────
// Defaults
// ────────────────────────────────────────────────────────────────────────────

pub const DEFAULT_PAGE_SIZE: u64 = 4096;

/// Size of a machine word on the target (64-bit).
pub const UINT64_SIZE: u64 = 8;

/// `prev` + `next` list pointers.
pub const DEFAULT_HEADER_SIZE: u64 = 2 * UINT64_SIZE;

pub const DEFAULT_BITMAP_WORD_SIZE: u64 = 8;

/// Object sizes swept by default, ascending.
pub const SIZE_CLASSES: [u64; 8] = [8, 16, 32, 64, 128, 256, 512, 1024];

// ────────────────────────────────────────────────────────────────────────────
// Layout constants
// ────────────────────────────────────────────────────────────────────────────

/// Fixed parameters shared by every layout computed in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutConstants {
    pub page_size: u64,
    /// Fixed per-slab header in bytes.
    pub header_size: u64,
    /// Bytes per bitmap word; each word tracks `bitmap_word_size * 8` slots.
    pub bitmap_word_size: u64,
}

impl Default for LayoutConstants {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            header_size: DEFAULT_HEADER_SIZE,
            bitmap_word_size: DEFAULT_BITMAP_WORD_SIZE,
        }
    }
}

impl LayoutConstants {
    /// Number of slots one bitmap word covers.
    pub fn bits_per_word(&self) -> LayoutResult<u64> {
        self.bitmap_word_size.checked_mul(8).ok_or_else(|| {
            LayoutError::InvalidInput(format!(
                "bitmap_word_size {} has more bits than fit in u64",
                self.bitmap_word_size
            ))
        })
    }

    /// Rejects zero-valued or oversized constants before any arithmetic uses them.
    pub fn validate(&self) -> LayoutResult<()> {
        if self.page_size == 0 {
            return Err(LayoutError::InvalidInput(
                "page_size must be > 0".to_string(),
            ));
        }
        if self.header_size == 0 {
            return Err(LayoutError::InvalidInput(
                "header_size must be > 0".to_string(),
            ));
        }
        if self.bitmap_word_size == 0 {
            return Err(LayoutError::InvalidInput(
                "bitmap_word_size must be > 0".to_string(),
            ));
        }
        self.bits_per_word()?;
        Ok(())
    }
}
