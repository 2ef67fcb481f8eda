use alloc::boxed::Box;

use thiserror::Error;

/// What went wrong while lexing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SyntaxErrorKind {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected character `{0}`")]
    UnexpectedCharacter(char),

    #[error("missing `{0}`")]
    MissingSeparator(char),

    #[error("misplaced `{0}`")]
    MisplacedSeparator(char),

    #[error("unterminated string")]
    UnterminatedString,

    #[error("invalid escape sequence")]
    InvalidEscape,

    #[error("invalid literal")]
    InvalidLiteral,

    #[error("invalid number")]
    InvalidNumber,

    #[error("invalid UTF-8")]
    InvalidUtf8,

    #[error("unescaped control character U+{0:04X} in string")]
    ControlCharacter(u32),

    #[error("unpaired surrogate U+{0:04X}")]
    UnpairedSurrogate(u32),

    #[error("trailing content after the top-level value")]
    TrailingContent,

    #[error("I/O failure: {0}")]
    Io(Box<str>),
}

/// Malformed input, with the offset (in code units) where it was detected and
/// a short preview of the input around it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} at offset {offset}, near `{preview}`")]
pub struct SyntaxError {
    pub offset: usize,
    pub kind: SyntaxErrorKind,
    pub preview: Box<str>,
}
