//! Result type alias for rule extraction and model realization

use crate::error::TesseraError;

/// Standard Result type for tessera operations
pub type Result<T> = std::result::Result<T, TesseraError>;
