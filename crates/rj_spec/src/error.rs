use alloc::boxed::Box;

use rj_types::{ClassRef, DataType, TypeError};
use thiserror::Error;

/// Errors raised while building spec nodes, scanning types or compiling.
///
/// Build errors are fatal to the operation that raised them.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum BuildError {
    /// Two neighbouring types of a node do not fit together.
    #[error("{context}: expected `{expected}`, found `{found}`")]
    TypeMismatch {
        context: &'static str,
        expected: DataType,
        found: DataType,
    },

    #[error("{context}: expected {expected} arguments, found {found}")]
    ArityMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("object `{ty}` declares member `{name}` more than once")]
    DuplicateMember { ty: DataType, name: Box<str> },

    #[error("map keys of `{0}` cannot be written as member names")]
    InvalidKey(DataType),

    #[error("the absent alternative of `{0}` must be computed without input")]
    InvalidAbsent(DataType),

    #[error("the type map is frozen")]
    Frozen,

    #[error("type `{0}` already has a spec")]
    AlreadySpecified(DataType),

    #[error("no spec for type `{0}`")]
    MissingType(DataType),

    #[error("reference to `{0}` cannot be resolved")]
    UnresolvedReference(DataType),

    #[error("no bundle grants access to restricted class `{0}`")]
    AccessDenied(ClassRef),

    #[error("class `{class}` has no field `{field}`")]
    UnknownField { class: ClassRef, field: Box<str> },

    #[error("a spec for `{spec}` cannot stand for type `{ty}`")]
    SpecMismatch { ty: DataType, spec: DataType },

    #[error("rule `{rule}` failed for `{ty}`: {message}")]
    RuleFailed {
        rule: Box<str>,
        ty: DataType,
        message: Box<str>,
    },

    #[error(transparent)]
    Type(#[from] TypeError),
}
