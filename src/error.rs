//! Domain errors callers can match on.
//!
//! Everything else travels as `anyhow::Error` with context attached.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiplomaError {
    /// The requested level has no configured background
    #[error("unknown diploma level '{0}'")]
    UnknownLevel(String),

    /// Export was requested without a name
    #[error("the student name is empty")]
    EmptyName,

    /// No font could be located through the path or any family
    #[error("no usable font found (tried: {0})")]
    NoFont(String),

    /// The typeface cannot draw some characters of the name
    #[error("font '{family}' has no glyphs for: {missing}")]
    MissingGlyphs { family: String, missing: String },

    #[error("invalid colour '{0}', expected #rrggbb")]
    InvalidColor(String),
}
