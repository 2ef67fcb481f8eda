use alloc::boxed::Box;
use core::fmt;

use rj_json::{SyntaxError, Token, TokenSet};
use rj_spec::{BuildError, CallError};
use thiserror::Error;

/// Well-formed JSON that does not fit the spec, or a value that cannot be
/// written with it.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("expected {expected}, found {found} at offset {offset}")]
    UnexpectedToken {
        offset: usize,
        found: Token,
        expected: TokenSet,
    },

    #[error("unknown member `{name}` at offset {offset}")]
    UnknownMember { offset: usize, name: Box<str> },

    #[error("duplicate member `{name}` at offset {offset}")]
    DuplicateMember { offset: usize, name: Box<str> },

    #[error("missing member `{name}` in object ending at offset {offset}")]
    MissingMember { offset: usize, name: Box<str> },

    /// A token of the right kind whose content is not acceptable: a number
    /// out of range, an unknown enum constant, a string of the wrong length.
    #[error("{message} at offset {offset}")]
    InvalidValue { offset: usize, message: Box<str> },

    /// A node function refused a parsed value.
    #[error("rejected at offset {offset}: {source}")]
    Rejected { offset: usize, source: CallError },

    /// A node function failed during generation.
    #[error("generation failed: {0}")]
    Failed(CallError),

    #[error("cannot write {found} as {expected}")]
    ValueMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{0} cannot be represented in JSON")]
    Unrepresentable(Box<str>),
}

/// Any failure of a parse or generate call.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum CodecError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Content(#[from] ContentError),

    /// A reference that was never resolved, met while parsing or generating.
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("the output refused the generated text")]
    Write(#[from] fmt::Error),
}

impl CodecError {
    /// The input offset for syntax and parse errors.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::Syntax(err) => Some(err.offset),
            Self::Content(
                ContentError::UnexpectedToken { offset, .. }
                | ContentError::UnknownMember { offset, .. }
                | ContentError::DuplicateMember { offset, .. }
                | ContentError::MissingMember { offset, .. }
                | ContentError::InvalidValue { offset, .. }
                | ContentError::Rejected { offset, .. },
            ) => Some(*offset),
            _ => None,
        }
    }
}
