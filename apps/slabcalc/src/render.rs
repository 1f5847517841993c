//! Text and JSON rendering of sweep results. Presentation only; no arithmetic here.

use std::io::Write;

use anyhow::Result;
use serde_json::json;

use crate::errors::LayoutError;
use crate::layout::sweep::stream_size_class;
use crate::layout::{LayoutConstants, LayoutReport, PolicyAudit, SizeClassSweep};

pub fn section_header(object_size: u64) -> String {
    format!("=== CACHE_MALLOC_{object_size} ===")
}

/// One fixed-width table row.
pub fn format_row(r: &LayoutReport) -> String {
    format!(
        "Pages: {:2} | Entries: {:6} | Bitfields: {:5} | Struct bytes: {:6} | \
         Buffer bytes: {:6} | Buffer util: {:6.2}% | Struct util: {:6.2}%",
        r.page_count,
        r.entries,
        r.bitmap_words,
        r.total_bytes,
        r.payload_bytes,
        r.payload_utilization,
        r.used_utilization,
    )
}

/// Writes each size class as a blank line, a section header, and one row per page count.
///
/// Rows are computed and written one at a time; nothing is buffered per class.
pub fn render_text<W: Write>(
    size_classes: &[u64],
    max_pages: u64,
    constants: &LayoutConstants,
    out: &mut W,
) -> Result<()> {
    if max_pages < 1 {
        return Err(
            LayoutError::InvalidInput("maximum page count must be >= 1".to_string()).into(),
        );
    }

    for &size in size_classes {
        writeln!(out)?;
        writeln!(out, "{}", section_header(size))?;
        stream_size_class(size, max_pages, constants, |row| -> Result<()> {
            writeln!(out, "{}", format_row(row))?;
            Ok(())
        })?;
    }
    Ok(())
}

pub fn render_json<W: Write>(
    constants: &LayoutConstants,
    sweeps: &[SizeClassSweep],
    audits: &[PolicyAudit],
    out: &mut W,
) -> Result<()> {
    let doc = json!({
        "constants": constants,
        "sweeps": sweeps,
        "policy_audit": audits,
    });
    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)?;
    Ok(())
}
