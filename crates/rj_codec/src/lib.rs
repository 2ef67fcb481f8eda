//! Parsers and generators driven by spec trees.
//!
//! Two backends implement [`Codec`] over a frozen [`TypeMap`]:
//!
//! - [`Interpreter`] walks the spec tree on every call, recursively or with
//!   an explicit stack.
//! - [`CompiledCodec`] turns every spec into closures once, up front.
//!
//! Both accept and produce exactly the same JSON for the same specs.
//! [`build_codec`] picks one from a [`CodecConfig`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use rj_codec::{Codec, build_codec};
//! use rj_spec::{CodecConfig, TypeScanner};
//! use rj_types::{DataType, Value, builtin};
//!
//! let list = DataType::known(builtin::list(), [DataType::class(builtin::integer())]);
//! let mut scanner = TypeScanner::new(CodecConfig::new());
//! scanner.scan(&list).unwrap();
//! let map = Arc::new(scanner.build().unwrap());
//!
//! let codec = build_codec(map, &CodecConfig::new().compiled(true)).unwrap();
//! let parser = codec.parser_for_type(&list).unwrap();
//! let value = parser.parse_str("[1, 2, 3]").unwrap();
//! assert_eq!(value, Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
//!
//! let generator = codec.generator_for_type(&list).unwrap();
//! assert_eq!(generator.generate_string(&value).unwrap(), "[1,2,3]");
//! ```

// -----------------------------------------------------------------------------
// Extern crates

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod api;
mod compile;
mod error;
mod interpret;
mod scalar;

#[cfg(test)]
mod tests;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use api::{Codec, Generator, Parser};
pub use compile::{CompiledCodec, Compiler};
pub use error::{CodecError, ContentError};
pub use interpret::Interpreter;

use alloc::sync::Arc;

use rj_spec::{BuildError, CodecConfig, TypeMap};

/// Builds the backend selected by `config`.
///
/// # Errors
///
/// Both backends refuse uniform maps whose keys are not written as strings.
/// A compiled backend also fails when a reference in `map` cannot be
/// resolved; the interpreter reports those when a call reaches them.
pub fn build_codec(
    map: Arc<TypeMap>,
    config: &CodecConfig,
) -> Result<Arc<dyn Codec>, BuildError> {
    if !map.unresolved().is_empty() {
        log::warn!("building a codec over {} unresolved types", map.unresolved().len());
    }
    if config.compiled {
        log::debug!("compiling codec for {} types", map.len());
        Ok(Arc::new(Compiler::new(config).compile(map, &[])?))
    } else {
        map.check_all_keys()?;
        log::debug!(
            "interpreting codec for {} types (iterative: {})",
            map.len(),
            config.iterative
        );
        Ok(Arc::new(Interpreter::new(map, config.iterative)))
    }
}
