mod config;
mod errors;
mod input;
mod layout;
mod render;

use anyhow::{Context, Result};
use std::io::{self, Write};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, OutputFormat};
use crate::input::prompt_max_pages;
use crate::layout::{audit_all, sweep_all, SHIPPED_POLICY, SIZE_CLASSES};
use crate::render::{render_json, render_text};

fn main() -> Result<()> {
    // Load configuration first
    let config = Config::from_env()?;

    // Initialize structured logging (stderr; stdout carries the report)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    info!("Starting slabcalc v{}", env!("CARGO_PKG_VERSION"));
    info!(
        page_size = config.constants.page_size,
        header_size = config.constants.header_size,
        bitmap_word_size = config.constants.bitmap_word_size,
        "Layout constants"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let max_pages = match config.max_pages {
        Some(n) => n,
        None => {
            let stdin = io::stdin();
            prompt_max_pages(&mut stdin.lock(), &mut out)
                .context("failed to read maximum page count")?
        }
    };

    let audits = audit_all(&SHIPPED_POLICY, &config.constants)
        .context("slab policy audit failed")?;
    info!(
        passed = audits.iter().filter(|a| a.is_ok()).count(),
        total = audits.len(),
        "Slab policy audited"
    );

    match config.format {
        OutputFormat::Text => render_text(&SIZE_CLASSES, max_pages, &config.constants, &mut out)
            .context("layout sweep failed")?,
        OutputFormat::Json => {
            // The JSON document needs every row before it can be written.
            let sweeps = sweep_all(&SIZE_CLASSES, max_pages, &config.constants)
                .context("layout sweep failed")?;
            render_json(&config.constants, &sweeps, &audits, &mut out)?
        }
    }
    out.flush()?;

    Ok(())
}
