//! The structural "is-bindable-from" relation.
//!
//! A pattern accepts a candidate when a value of the candidate type could be
//! used where the pattern is expected. Outer matches may allow subtypes, but
//! type arguments are always compared invariantly; only wildcard bounds use
//! subtyping inside arguments.

use crate::{CapturedBound, ClassRef, DataType, KnownType, TypeBindings, TypeVar, builtin};

impl DataType {
    /// Whether `candidate` can be bound to this pattern.
    ///
    /// Variables of the pattern are bound greedily to the first type they
    /// meet; later occurrences must be equal to that binding. Bindings made
    /// by a failed match are left in `bindings`, so callers should start each
    /// attempt from a fresh (or cloned) set.
    ///
    /// # Examples
    ///
    /// ```
    /// use rj_types::{builtin, DataType, TypeBindings};
    ///
    /// let pattern = DataType::known(builtin::list(), [DataType::var("E")]);
    /// let candidate = DataType::known(builtin::array_list(), [DataType::string()]);
    ///
    /// let mut bindings = TypeBindings::new();
    /// assert!(pattern.is_bindable_from(&candidate, true, &mut bindings));
    /// assert_eq!(bindings.get("E"), Some(&DataType::string()));
    ///
    /// let mut bindings = TypeBindings::new();
    /// assert!(!pattern.is_bindable_from(&candidate, false, &mut bindings));
    /// ```
    pub fn is_bindable_from(
        &self,
        candidate: &DataType,
        allow_subtypes: bool,
        bindings: &mut TypeBindings,
    ) -> bool {
        match self {
            Self::Primitive(kind) => matches!(candidate, Self::Primitive(other) if other == kind),
            Self::Null => matches!(candidate, Self::Null),
            Self::Array(element) => bind_array(element, candidate, allow_subtypes, bindings),
            Self::Known(known) => bind_known(known, candidate, allow_subtypes, bindings),
            Self::Erased(class) => bind_erased(*class, candidate, allow_subtypes),
            Self::Variable(var) => bind_variable(var, candidate, bindings),
            Self::Wildcard(wildcard) => bind_captured(&wildcard.capture(), candidate, bindings),
            Self::Captured(bound) => bind_captured(bound, candidate, bindings),
        }
    }

    /// Shorthand for a match whose bindings are not needed.
    #[inline]
    pub fn accepts(&self, candidate: &DataType, allow_subtypes: bool) -> bool {
        self.is_bindable_from(candidate, allow_subtypes, &mut TypeBindings::new())
    }
}

/// The type a non-class candidate is compared as when it meets a class pattern.
fn upper_view(candidate: &DataType) -> Option<DataType> {
    match candidate {
        DataType::Captured(bound) => Some(bound.upper().clone()),
        DataType::Wildcard(wildcard) => Some(wildcard.capture().upper().clone()),
        DataType::Variable(var) => Some(match var.bounds().first() {
            Some(bound) => bound.clone(),
            None => DataType::object(),
        }),
        _ => None,
    }
}

fn bind_array(
    element: &DataType,
    candidate: &DataType,
    allow_subtypes: bool,
    bindings: &mut TypeBindings,
) -> bool {
    match candidate {
        DataType::Array(other) => {
            if element.is_primitive() || other.is_primitive() {
                match element {
                    DataType::Variable(var) => bind_variable(var, other, bindings),
                    _ => element == &**other,
                }
            } else {
                element.is_bindable_from(other, allow_subtypes, bindings)
            }
        }
        DataType::Null => allow_subtypes,
        _ => false,
    }
}

fn bind_known(
    pattern: &KnownType,
    candidate: &DataType,
    allow_subtypes: bool,
    bindings: &mut TypeBindings,
) -> bool {
    match candidate {
        DataType::Known(other) => {
            let view = if other.class() == pattern.class() {
                Some(other.args().into())
            } else if allow_subtypes {
                other.class().supertype_args(other.args(), pattern.class())
            } else {
                None
            };
            let Some(args) = view else {
                return false;
            };
            if pattern.args().is_empty() {
                return true;
            }
            if args.len() != pattern.args().len() {
                // Reached an erased use of the pattern class through a supertype.
                return bind_erased_args(pattern, bindings);
            }
            pattern
                .args()
                .iter()
                .zip(args.iter())
                .all(|(p, c)| p.is_bindable_from(c, false, bindings))
        }
        DataType::Erased(class) => {
            let raw_match = *class == pattern.class()
                || (allow_subtypes && class.is_subclass_of(pattern.class()));
            raw_match && bind_erased_args(pattern, bindings)
        }
        DataType::Array(_) => {
            allow_subtypes && pattern.class() == builtin::object() && pattern.args().is_empty()
        }
        DataType::Null => allow_subtypes,
        DataType::Primitive(_) => false,
        DataType::Variable(_) | DataType::Wildcard(_) | DataType::Captured(_) => {
            allow_subtypes
                && upper_view(candidate)
                    .is_some_and(|upper| bind_known(pattern, &upper, true, bindings))
        }
    }
}

/// Unchecked conversion from an erased type: pattern variables take their
/// erasure, concrete arguments cannot be verified and are rejected.
fn bind_erased_args(pattern: &KnownType, bindings: &mut TypeBindings) -> bool {
    pattern.args().iter().all(|arg| match arg {
        DataType::Variable(var) => match bindings.get(var.name()) {
            Some(bound) => *bound == var.erasure(),
            None => {
                bindings.insert(var.name_arc(), var.erasure());
                true
            }
        },
        DataType::Wildcard(_) => true,
        _ => false,
    })
}

fn bind_erased(class: ClassRef, candidate: &DataType, allow_subtypes: bool) -> bool {
    match candidate {
        DataType::Known(other) => {
            other.class() == class || (allow_subtypes && other.class().is_subclass_of(class))
        }
        DataType::Erased(other) => {
            *other == class || (allow_subtypes && other.is_subclass_of(class))
        }
        DataType::Array(_) => allow_subtypes && class == builtin::object(),
        DataType::Null => allow_subtypes,
        DataType::Primitive(_) => false,
        DataType::Variable(_) | DataType::Wildcard(_) | DataType::Captured(_) => {
            allow_subtypes
                && upper_view(candidate).is_some_and(|upper| bind_erased(class, &upper, true))
        }
    }
}

fn bind_variable(var: &TypeVar, candidate: &DataType, bindings: &mut TypeBindings) -> bool {
    if let Some(bound) = bindings.get(var.name()) {
        return bound == candidate;
    }
    for bound in var.bounds() {
        // Bounds may refer to other variables of the same pattern.
        let bound = if bound.has_variables() {
            let names = bound.variables();
            if !names.iter().all(|name| bindings.contains(name)) {
                continue;
            }
            bound.substitute(bindings)
        } else {
            bound.clone()
        };
        if !bound.is_bindable_from(candidate, true, &mut TypeBindings::new()) {
            return false;
        }
    }
    bindings.insert(var.name_arc(), candidate.clone());
    true
}

fn bind_captured(bound: &CapturedBound, candidate: &DataType, bindings: &mut TypeBindings) -> bool {
    if !bound.upper().is_bindable_from(candidate, true, bindings) {
        return false;
    }
    match bound.lower() {
        Some(lower) => {
            let lower = if lower.has_variables() {
                lower.substitute(bindings)
            } else {
                lower.clone()
            };
            candidate.is_bindable_from(&lower, true, &mut TypeBindings::new())
        }
        None => true,
    }
}
