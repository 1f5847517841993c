use thiserror::Error;

/// Errors produced while validating inputs or computing a slab layout.
///
/// Every failure is terminal for the call that raised it: no partial report is
/// ever returned alongside an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
}

pub type LayoutResult<T> = Result<T, LayoutError>;
