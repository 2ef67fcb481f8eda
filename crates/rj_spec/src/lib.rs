//! Declarative serialization rules and the scanner that derives them.
//!
//! # Overview
//!
//! - [`SpecNode`]: one node of a rule tree, describing how values of one
//!   type correspond to JSON. Nodes are shared through [`Spec`] and checked
//!   for type agreement when they are built.
//! - [`TypedFn`]: the closures a node carries (accumulators, conversions,
//!   accessors), each with its declared [`Signature`].
//! - [`TypeMap`]: the registry from types to specs. [`NodeKind::TypeRef`]
//!   nodes are resolved through it, which is how recursive types are
//!   represented.
//! - [`TypeScanner`]: fills a type map by matching types against the
//!   [`Directive`]s of registered [`Bundle`]s, then the [`builtin`] bundle.
//! - [`CodecConfig`]: the options shared by scanning and the codec backends.

// -----------------------------------------------------------------------------
// Extern crates

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod accumulator;
mod config;
mod directive;
mod error;
mod function;
mod node;
mod optimize;
mod scanner;
mod transform;
mod type_map;

pub mod builtin;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use accumulator::{Accumulator, Cursor, Emitter, EntryCursor, ListCursor};
pub use accumulator::{MapAccumulator, MapEmitter};
pub use config::CodecConfig;
pub use directive::{Bundle, Directive, GuardFn, RuleContext, RuleFn};
pub use error::BuildError;
pub use function::Predicate;
pub use function::{BiFunction, CallError, CallResult, Constructor, Emit, Function, Getter};
pub use function::{BiFunctionFn, ConstructorFn, EmitFn, FunctionFn, GetterFn, PredicateFn};
pub use function::{Signature, Supplier, SupplierFn, TriFunction, TriFunctionFn, TypedFn};
pub use node::{ArrayNode, CallbackNode, ConvertedNode, MapNode, MaybeAbsentNode, Member};
pub use node::{NodeKind, ObjectNode, Spec, SpecNode};
pub use optimize::optimize;
pub use scanner::TypeScanner;
pub use transform::{for_each_reference, has_variables, substitute};
pub use type_map::TypeMap;
