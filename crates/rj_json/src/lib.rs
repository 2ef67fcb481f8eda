//! Streaming JSON tokens for the reflection-driven codec.
//!
//! # Reading
//!
//! [`JsonReader`] is the contract every parser is written against: peek a
//! [`Token`], then consume it the one way that token permits. No
//! intermediate values are materialized; numbers come back as their source
//! text and strings character by character.
//!
//! [`TextReader`] implements the contract over UTF-8 bytes or UTF-16 code
//! units, pulled from a [`Source`]:
//!
//! - [`SliceSource`]: the whole input at once,
//! - [`ChunkedSource`]: a slice delivered in fixed-size chunks,
//! - [`IoSource`]: any [`std::io::Read`].
//!
//! # Writing
//!
//! [`JsonWriter`] produces compact JSON and places separators itself.

// -----------------------------------------------------------------------------
// Extern crates

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod reader;
mod source;
mod token;
mod writer;

#[cfg(test)]
mod tests;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use error::{SyntaxError, SyntaxErrorKind};
pub use reader::{JsonReader, TextReader, Utf8Reader, Utf16Reader, read_string, read_string_chars};
pub use source::{ChunkedSource, CodeUnit, IoSource, SliceSource, Source};
pub use token::{Token, TokenSet};
pub use writer::{JsonWriter, write_escaped, write_escaped_content};
