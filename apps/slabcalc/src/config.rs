use anyhow::{bail, Context, Result};

use crate::layout::constants::{
    LayoutConstants, DEFAULT_BITMAP_WORD_SIZE, DEFAULT_HEADER_SIZE, DEFAULT_PAGE_SIZE,
};

/// How the sweep is written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Runtime configuration loaded from environment variables.
/// Every variable is optional; the defaults reproduce the interactive text report.
#[derive(Debug, Clone)]
pub struct Config {
    pub format: OutputFormat,
    /// When set, the interactive prompt is skipped.
    pub max_pages: Option<u64>,
    pub constants: LayoutConstants,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = match lookup("SLABCALC_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => OutputFormat::Text,
            Some("json") => OutputFormat::Json,
            Some(other) => bail!("SLABCALC_FORMAT must be 'text' or 'json', got '{other}'"),
        };

        let max_pages = match lookup("SLABCALC_MAX_PAGES") {
            Some(raw) => Some(parse_positive(&raw, "SLABCALC_MAX_PAGES")?),
            None => None,
        };

        let constants = LayoutConstants {
            page_size: optional_positive(&lookup, "SLABCALC_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            header_size: optional_positive(&lookup, "SLABCALC_HEADER_SIZE", DEFAULT_HEADER_SIZE)?,
            bitmap_word_size: optional_positive(
                &lookup,
                "SLABCALC_BITMAP_WORD_SIZE",
                DEFAULT_BITMAP_WORD_SIZE,
            )?,
        };

        constants
            .validate()
            .context("invalid slab layout constants")?;

        Ok(Config {
            format,
            max_pages,
            constants,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn optional_positive<F>(lookup: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_positive(&raw, key),
        None => Ok(default),
    }
}

fn parse_positive(raw: &str, key: &str) -> Result<u64> {
    let value = raw
        .trim()
        .parse::<u64>()
        .with_context(|| format!("{key} must be a positive integer, got '{raw}'"))?;
    if value == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(value)
}
