//! Caller-contract violations.
//!
//! Only violations of the caller contract are surfaced as typed errors.
//! Data-level anomalies — unpaired surrogates, missing glyphs, oversize
//! words, cache races — are recovered locally and never reach this type.

/// Errors raised when a caller violates the contract of a public entry point.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("range [{start}, {limit}) is invalid for buffer of length {len}")]
    InvalidRange {
        start: usize,
        limit: usize,
        len: usize,
    },

    #[error(
        "layout range [{start}, {limit}) is not contained in context range [{context_start}, {context_limit})"
    )]
    RangeNotInContext {
        start: usize,
        limit: usize,
        context_start: usize,
        context_limit: usize,
    },

    #[error(
        "font paint style {requested:?} does not match the font variant {available:?} selected from the family"
    )]
    StyleMismatch {
        requested: crate::paint::FontStyle,
        available: crate::paint::FontStyle,
    },

    #[error("MeasuredTextBuilder::build() called a second time on the same builder")]
    BuilderAlreadyBuilt,

    #[error(
        "MeasuredTextBuilder::build() called with cursor at {cursor} but buffer length is {len}"
    )]
    BuilderIncomplete { cursor: usize, len: usize },

    #[error("FontCollection must contain at least one FontFamily")]
    EmptyFontCollection,
}

pub type ShapeResult<T> = Result<T, ShapeError>;
