//! Slab layout calculator — packs objects, an occupancy bitmap and a header into N pages.
//!
//! # Two-pass accounting
//! 1. Estimate the slot count ignoring the bitmap: `max_entries = usable / object_size`.
//! 2. Size the bitmap against that estimate, subtract it, and floor-divide again.
//!
//! The bitmap is sized from the first-pass estimate and never re-derived from the
//! final slot count, so it may carry more bits than there are slots. Reported
//! numbers depend on this ordering; it is not iterated to a fixed point.

use serde::Serialize;
use tracing::trace;

use crate::errors::{LayoutError, LayoutResult};
use crate::layout::constants::{LayoutConstants, UINT64_SIZE};

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Computed layout for one (object size, page count) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutReport {
    pub object_size: u64,
    pub page_count: u64,
    /// `page_count * page_size`.
    pub total_bytes: u64,
    /// Bitmap-free slot estimate used only to size the bitmap.
    pub estimated_entries: u64,
    /// Real slot count after the bitmap is subtracted.
    pub entries: u64,
    pub bitmap_words: u64,
    pub bitmap_bytes: u64,
    /// Bytes holding objects (`entries * object_size`).
    pub payload_bytes: u64,
    /// Payload + bitmap + header.
    pub used_bytes: u64,
    /// Unaccounted remainder (`total_bytes - used_bytes`).
    pub slack_bytes: u64,
    /// Informational: objects per machine word for sub-word sizes, min 1.
    pub entries_per_word: u64,
    /// Percent of the slab holding objects.
    pub payload_utilization: f64,
    /// Percent of the slab accounted for by the layout.
    pub used_utilization: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Core functions
// ────────────────────────────────────────────────────────────────────────────

/// Computes the layout of a slab of `page_count` pages holding `object_size`-byte slots.
///
/// Fails with `InvalidInput` for a zero object size, zero page count or zero
/// constants, and with `InvalidLayout` when the header or the bitmap does not fit.
pub fn compute_layout(
    object_size: u64,
    page_count: u64,
    constants: &LayoutConstants,
) -> LayoutResult<LayoutReport> {
    if object_size < 1 {
        return Err(LayoutError::InvalidInput(
            "object_size must be >= 1".to_string(),
        ));
    }
    if page_count < 1 {
        return Err(LayoutError::InvalidInput(
            "page_count must be >= 1".to_string(),
        ));
    }
    constants.validate()?;

    let total_bytes = page_count.checked_mul(constants.page_size).ok_or_else(|| {
        LayoutError::InvalidLayout(format!(
            "{page_count} pages of {} bytes overflows u64",
            constants.page_size
        ))
    })?;

    let usable_bytes = total_bytes.checked_sub(constants.header_size).ok_or_else(|| {
        LayoutError::InvalidLayout(format!(
            "header of {} bytes does not fit in a {total_bytes}-byte slab",
            constants.header_size
        ))
    })?;

    // First pass: ignore the bitmap.
    let estimated_entries = usable_bytes / object_size;

    let bitmap_words = bitmap_words_for(estimated_entries, constants.bits_per_word()?);
    let bitmap_bytes = bitmap_bytes_for(bitmap_words, constants)?;

    // Second pass: real slot count once the bitmap is carved out.
    let usable_after_bitmap = usable_bytes.checked_sub(bitmap_bytes).ok_or_else(|| {
        LayoutError::InvalidLayout(format!(
            "bitmap of {bitmap_bytes} bytes exceeds {usable_bytes} usable bytes"
        ))
    })?;
    let entries = usable_after_bitmap / object_size;

    let payload_bytes = entries * object_size;
    let used_bytes = payload_bytes + bitmap_bytes + constants.header_size;

    trace!(
        object_size,
        page_count,
        estimated_entries,
        entries,
        bitmap_words,
        "computed slab layout"
    );

    Ok(LayoutReport {
        object_size,
        page_count,
        total_bytes,
        estimated_entries,
        entries,
        bitmap_words,
        bitmap_bytes,
        payload_bytes,
        used_bytes,
        slack_bytes: total_bytes - used_bytes,
        entries_per_word: entries_per_word(object_size)?,
        payload_utilization: percent_of(payload_bytes, total_bytes),
        used_utilization: percent_of(used_bytes, total_bytes),
    })
}

/// Number of bitmap words needed to track `entries` slots (ceiling division).
pub fn bitmap_words_for(entries: u64, bits_per_word: u64) -> u64 {
    entries.div_ceil(bits_per_word)
}

/// Bytes occupied by `words` bitmap words.
pub fn bitmap_bytes_for(words: u64, constants: &LayoutConstants) -> LayoutResult<u64> {
    words.checked_mul(constants.bitmap_word_size).ok_or_else(|| {
        LayoutError::InvalidLayout(format!(
            "{words} bitmap words of {} bytes overflows u64",
            constants.bitmap_word_size
        ))
    })
}

/// How many objects of `object_size` bytes share one machine word, clamped to at least 1.
pub fn entries_per_word(object_size: u64) -> LayoutResult<u64> {
    if object_size == 0 {
        return Err(LayoutError::InvalidInput(
            "object_size must be >= 1".to_string(),
        ));
    }
    Ok((UINT64_SIZE / object_size).max(1))
}

fn percent_of(part: u64, whole: u64) -> f64 {
    (part as f64 / whole as f64) * 100.0
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::constants::SIZE_CLASSES;
    use proptest::prelude::*;

    fn defaults() -> LayoutConstants {
        LayoutConstants::default()
    }

    // ── concrete scenarios ──────────────────────────────────────────────────

    #[test]
    fn test_1024_byte_objects_in_one_page() {
        let r = compute_layout(1024, 1, &defaults()).unwrap();
        assert_eq!(r.total_bytes, 4096);
        assert_eq!(r.estimated_entries, 3);
        assert_eq!(r.bitmap_words, 1);
        assert_eq!(r.bitmap_bytes, 8);
        assert_eq!(r.entries, 3);
        assert_eq!(r.payload_bytes, 3072);
        assert_eq!(r.used_bytes, 3096);
        assert_eq!(r.slack_bytes, 1000);
        assert_eq!(format!("{:.2}", r.payload_utilization), "75.00");
        assert_eq!(format!("{:.2}", r.used_utilization), "75.59");
    }

    #[test]
    fn test_8_byte_objects_in_one_page() {
        let r = compute_layout(8, 1, &defaults()).unwrap();
        assert_eq!(r.estimated_entries, 510);
        assert_eq!(r.bitmap_words, 8);
        assert_eq!(r.bitmap_bytes, 64);
        assert_eq!(r.entries, 502);
        assert_eq!(r.payload_bytes, 4016);
        assert_eq!(r.used_bytes, 4096);
        assert_eq!(r.slack_bytes, 0);
        assert_eq!(format!("{:.2}", r.payload_utilization), "98.05");
        assert_eq!(format!("{:.2}", r.used_utilization), "100.00");
    }

    #[test]
    fn test_bitmap_sized_from_first_pass_not_final_count() {
        // 1-byte slots, 1 page: estimate 4080 → 64 words (512 B) → 3568 real slots.
        let r = compute_layout(1, 1, &defaults()).unwrap();
        assert_eq!(r.estimated_entries, 4080);
        assert_eq!(r.bitmap_words, 64);
        assert_eq!(r.entries, 3568);
        // 3568 slots alone would need only 56 words.
        assert_eq!(bitmap_words_for(r.entries, 64), 56);
    }

    #[test]
    fn test_16_byte_objects_in_four_pages() {
        let r = compute_layout(16, 4, &defaults()).unwrap();
        assert_eq!(r.estimated_entries, 1023);
        assert_eq!(r.bitmap_words, 16);
        assert_eq!(r.entries, 1015);
    }

    #[test]
    fn test_non_power_of_two_object_size_accepted() {
        let r = compute_layout(24, 1, &defaults()).unwrap();
        // 4080 / 24 = 170 → 3 words → 4056 / 24 = 169
        assert_eq!(r.estimated_entries, 170);
        assert_eq!(r.bitmap_words, 3);
        assert_eq!(r.entries, 169);
    }

    // ── invalid input ───────────────────────────────────────────────────────

    #[test]
    fn test_zero_page_count_rejected() {
        let err = compute_layout(64, 0, &defaults()).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput(_)));
    }

    #[test]
    fn test_zero_object_size_rejected() {
        let err = compute_layout(0, 1, &defaults()).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput(_)));
    }

    #[test]
    fn test_header_larger_than_slab_is_invalid_layout() {
        let c = LayoutConstants {
            page_size: 8,
            header_size: 16,
            bitmap_word_size: 8,
        };
        let err = compute_layout(8, 1, &c).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidLayout(_)));
    }

    #[test]
    fn test_bitmap_exceeding_usable_bytes_is_invalid_layout() {
        // usable = 4 bytes → 4 one-byte slots → 1 word of 8 bytes > 4.
        let c = LayoutConstants {
            page_size: 20,
            header_size: 16,
            bitmap_word_size: 8,
        };
        let err = compute_layout(1, 1, &c).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidLayout(_)));
    }

    #[test]
    fn test_bitmap_exactly_filling_usable_bytes_gives_zero_entries() {
        // usable = 8 bytes → 1 slot of 8 bytes → 1 word of 8 bytes, nothing left.
        let c = LayoutConstants {
            page_size: 24,
            header_size: 16,
            bitmap_word_size: 8,
        };
        let r = compute_layout(8, 1, &c).unwrap();
        assert_eq!(r.estimated_entries, 1);
        assert_eq!(r.entries, 0);
        assert_eq!(r.payload_bytes, 0);
        assert_eq!(r.used_bytes, 24);
    }

    #[test]
    fn test_page_size_overflow_is_invalid_layout() {
        let err = compute_layout(8, u64::MAX, &defaults()).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidLayout(_)));
    }

    #[test]
    fn test_oversized_bitmap_word_is_error_not_panic() {
        let c = LayoutConstants {
            bitmap_word_size: 1 << 61,
            ..defaults()
        };
        let err = compute_layout(8, 1, &c).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidInput(_)));
    }

    #[test]
    fn test_largest_bitmap_word_overflows_slab() {
        // One word of u64::MAX / 8 bytes can never fit in a page.
        let c = LayoutConstants {
            bitmap_word_size: u64::MAX / 8,
            ..defaults()
        };
        let err = compute_layout(8, 1, &c).unwrap_err();
        assert!(matches!(err, LayoutError::InvalidLayout(_)));
    }

    #[test]
    fn test_bitmap_bytes_overflow_is_invalid_layout() {
        let c = LayoutConstants {
            bitmap_word_size: u64::MAX / 8,
            ..defaults()
        };
        assert!(matches!(
            bitmap_bytes_for(9, &c),
            Err(LayoutError::InvalidLayout(_))
        ));
        assert_eq!(bitmap_bytes_for(3, &defaults()).unwrap(), 24);
    }

    // ── entries_per_word ────────────────────────────────────────────────────

    #[test]
    fn test_entries_per_word_sub_word_sizes() {
        assert_eq!(entries_per_word(1).unwrap(), 8);
        assert_eq!(entries_per_word(2).unwrap(), 4);
        assert_eq!(entries_per_word(8).unwrap(), 1);
    }

    #[test]
    fn test_entries_per_word_clamped_for_large_objects() {
        for size in SIZE_CLASSES {
            assert_eq!(entries_per_word(size).unwrap(), 1);
        }
        assert_eq!(entries_per_word(9).unwrap(), 1);
        assert!(entries_per_word(0).is_err());
    }

    // ── properties ──────────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn test_entries_monotonic_in_page_count(object_size in 1u64..=4096, pages in 1u64..256) {
            let c = defaults();
            let a = compute_layout(object_size, pages, &c).unwrap();
            let b = compute_layout(object_size, pages + 1, &c).unwrap();
            prop_assert!(b.entries >= a.entries);
        }

        #[test]
        fn test_used_bytes_conserved(object_size in 1u64..=8192, pages in 1u64..512) {
            let r = compute_layout(object_size, pages, &defaults()).unwrap();
            prop_assert_eq!(r.used_bytes, r.payload_bytes + r.bitmap_bytes + 16);
            prop_assert!(r.payload_bytes <= r.total_bytes);
            prop_assert!(r.used_bytes <= r.total_bytes);
            prop_assert_eq!(r.slack_bytes, r.total_bytes - r.used_bytes);
        }

        #[test]
        fn test_bitmap_covers_estimate(object_size in 1u64..=8192, pages in 1u64..512) {
            let r = compute_layout(object_size, pages, &defaults()).unwrap();
            prop_assert!(r.bitmap_words * 64 >= r.estimated_entries);
            prop_assert!(r.entries <= r.estimated_entries);
        }

        #[test]
        fn test_utilization_bounded(object_size in 1u64..=8192, pages in 1u64..512) {
            let r = compute_layout(object_size, pages, &defaults()).unwrap();
            prop_assert!(0.0 <= r.payload_utilization);
            prop_assert!(r.payload_utilization <= r.used_utilization);
            prop_assert!(r.used_utilization <= 100.0);
        }

        #[test]
        fn test_small_constants_conserve_or_fail_cleanly(
            object_size in 1u64..=64,
            pages in 1u64..=8,
            page_size in 1u64..=256,
            header_size in 1u64..=64,
            bitmap_word_size in 1u64..=4,
        ) {
            let c = LayoutConstants { page_size, header_size, bitmap_word_size };
            let total = pages * page_size;
            let bits = bitmap_word_size * 8;
            let fits = total >= header_size && {
                let usable = total - header_size;
                (usable / object_size).div_ceil(bits) * bitmap_word_size <= usable
            };

            match compute_layout(object_size, pages, &c) {
                Ok(r) => {
                    prop_assert!(fits);
                    prop_assert_eq!(r.used_bytes, r.payload_bytes + r.bitmap_bytes + header_size);
                    prop_assert!(r.used_bytes <= r.total_bytes);
                    prop_assert!(r.bitmap_words * bits >= r.estimated_entries);
                    prop_assert!(r.payload_utilization <= r.used_utilization);
                    prop_assert!(r.used_utilization <= 100.0);
                }
                Err(err) => {
                    prop_assert!(!fits);
                    prop_assert!(matches!(err, LayoutError::InvalidLayout(_)));
                }
            }
        }

        #[test]
        fn test_entries_per_word_never_zero(object_size in 1u64..=u64::MAX) {
            prop_assert!(entries_per_word(object_size).unwrap() >= 1);
        }
    }
}
