//! Interactive prompt for the maximum page count.

use std::io::{BufRead, Write};

use crate::errors::{LayoutError, LayoutResult};

pub const MAX_PAGES_PROMPT: &str = "Maximum number of pages N: ";

/// Writes the prompt, reads one line and parses it as the maximum page count.
pub fn prompt_max_pages<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> LayoutResult<u64> {
    write!(output, "{MAX_PAGES_PROMPT}")
        .and_then(|_| output.flush())
        .map_err(|e| LayoutError::InvalidInput(format!("could not write prompt: {e}")))?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .map_err(|e| LayoutError::InvalidInput(format!("could not read page count: {e}")))?;
    if read == 0 {
        return Err(LayoutError::InvalidInput(
            "no page count given (end of input)".to_string(),
        ));
    }

    parse_max_pages(&line)
}

/// Parses a positive page count. Surrounding whitespace and a leading `+` are accepted.
pub fn parse_max_pages(raw: &str) -> LayoutResult<u64> {
    let trimmed = raw.trim();
    let value: i128 = trimmed
        .parse()
        .map_err(|_| LayoutError::InvalidInput(format!("'{trimmed}' is not an integer")))?;

    if value < 1 {
        return Err(LayoutError::InvalidInput(format!(
            "page count must be >= 1, got {value}"
        )));
    }
    u64::try_from(value)
        .map_err(|_| LayoutError::InvalidInput(format!("page count {value} is too large")))
}
