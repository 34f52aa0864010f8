use thiserror::Error;

/// Errors surfaced by the numeric pipeline.
///
/// Incomplete observations, series with fewer than two known points and
/// all-missing input are not errors: they are handled where they occur by
/// exclusion, passthrough or an empty result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Total pixel count is zero at index {index}")]
    DivisionByZero { index: usize },

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Fail with `LengthMismatch` unless both slices have the same length.
pub(crate) fn ensure_same_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(PipelineError::LengthMismatch { expected, actual });
    }
    Ok(())
}
