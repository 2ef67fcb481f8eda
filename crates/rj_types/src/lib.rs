//! Type algebra and value model for the reflection-driven JSON codec.
//!
//! # Overview
//!
//! - [`ClassInfo`]: the reflected description of a class, created once by a
//!   [`ClassBuilder`] and then referenced through the copyable [`ClassRef`].
//!   Classes carry type parameters, supertypes and a [`ClassShape`]
//!   (record, enum or opaque).
//! - [`DataType`]: an immutable type description. *Known* variants
//!   (primitives, arrays, classes with arguments, erased generics, the null
//!   type) can be instantiated; *unknown* variants (type variables, wildcards,
//!   captured bounds) only take part in matching.
//! - [`DataType::is_bindable_from`]: the structural matching relation used to
//!   select serialization rules, recording variable bindings in
//!   [`TypeBindings`].
//! - [`Value`]: the dynamic in-memory value every codec operation produces
//!   and consumes.
//!
//! The built-in class universe (`String`, `List<E>`, `Map<K, V>`, boxed
//! primitives, ...) lives in [`builtin`].

// -----------------------------------------------------------------------------
// Extern crates

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod bindings;
mod class;
mod data_type;
mod matching;
mod value;

pub mod builtin;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use bindings::TypeBindings;
pub use class::{ClassBuilder, ClassInfo, ClassRef, ClassShape, FieldInfo, TypeError, Visibility};
pub use data_type::{CapturedBound, DataType, KnownType, PrimitiveKind, RawType, TypeVar, Wildcard};
pub use value::{CustomRef, CustomValue, EnumValue, Record, Value};
