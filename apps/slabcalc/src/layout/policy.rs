//! Audit of the shipped per-class slab policy (pages and entry counts per size class).
//!
//! # Audit rules
//! - Page count must be a power of two (objects find their slab by aligning down).
//! - The configured struct must fit: `entries*size + bitmap + header <= pages*page_size`.
//!   The struct's bitmap is sized from the configured entry count itself.
//! - Configured entries below the calculator's count waste slots → `Underfilled`.

use serde::Serialize;
use tracing::warn;

use crate::errors::LayoutResult;
use crate::layout::calculator::{bitmap_bytes_for, bitmap_words_for, compute_layout};
use crate::layout::constants::LayoutConstants;

/// One row of the slab policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CachePolicy {
    pub object_size: u64,
    pub pages: u64,
    pub entries: u64,
}

/// Shipped policy: 4 pages per class, 8 for the 1 KiB class.
#[rustfmt::skip]
pub const SHIPPED_POLICY: [CachePolicy; 8] = [
    CachePolicy { object_size: 8, pages: 4, entries: 2014 },
    CachePolicy { object_size: 16, pages: 4, entries: 1015 },
    CachePolicy { object_size: 32, pages: 4, entries: 509 },
    CachePolicy { object_size: 64, pages: 4, entries: 255 },
    CachePolicy { object_size: 128, pages: 4, entries: 127 },
    CachePolicy { object_size: 256, pages: 4, entries: 63 },
    CachePolicy { object_size: 512, pages: 4, entries: 31 },
    CachePolicy { object_size: 1024, pages: 8, entries: 31 },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyVerdict {
    Fits,
    PageCountNotPowerOfTwo,
    ExceedsSlab { struct_bytes: u64, slab_bytes: u64 },
    Underfilled { configured: u64, achievable: u64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct PolicyAudit {
    pub policy: CachePolicy,
    /// Size of the configured struct in bytes.
    pub struct_bytes: u64,
    /// Entry count the calculator derives for the same size and page count.
    pub achievable_entries: u64,
    pub verdict: PolicyVerdict,
}

impl PolicyAudit {
    pub fn is_ok(&self) -> bool {
        self.verdict == PolicyVerdict::Fits
    }
}

/// Audits a single policy row against the calculator.
pub fn audit_policy(
    policy: &CachePolicy,
    constants: &LayoutConstants,
) -> LayoutResult<PolicyAudit> {
    let report = compute_layout(policy.object_size, policy.pages, constants)?;

    let bitmap_words = bitmap_words_for(policy.entries, constants.bits_per_word()?);
    let bitmap_bytes = bitmap_bytes_for(bitmap_words, constants)?;
    let struct_bytes = policy
        .entries
        .saturating_mul(policy.object_size)
        .saturating_add(bitmap_bytes)
        .saturating_add(constants.header_size);

    let verdict = if !policy.pages.is_power_of_two() {
        PolicyVerdict::PageCountNotPowerOfTwo
    } else if struct_bytes > report.total_bytes {
        PolicyVerdict::ExceedsSlab {
            struct_bytes,
            slab_bytes: report.total_bytes,
        }
    } else if policy.entries < report.entries {
        PolicyVerdict::Underfilled {
            configured: policy.entries,
            achievable: report.entries,
        }
    } else {
        PolicyVerdict::Fits
    };

    Ok(PolicyAudit {
        policy: *policy,
        struct_bytes,
        achievable_entries: report.entries,
        verdict,
    })
}

/// Audits every row and logs the ones that fail.
pub fn audit_all(
    table: &[CachePolicy],
    constants: &LayoutConstants,
) -> LayoutResult<Vec<PolicyAudit>> {
    let audits = table
        .iter()
        .map(|p| audit_policy(p, constants))
        .collect::<LayoutResult<Vec<_>>>()?;

    for audit in audits.iter().filter(|a| !a.is_ok()) {
        warn!(
            object_size = audit.policy.object_size,
            pages = audit.policy.pages,
            verdict = ?audit.verdict,
            "slab policy row failed audit"
        );
    }

    Ok(audits)
}
