//! Pattern-matched rules and the bundles that group them.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use rj_types::{ClassRef, DataType, TypeBindings};
use rj_utils::hash::{HashMap, HashSet};

use crate::{BuildError, CodecConfig, Spec};

pub type RuleFn = dyn Fn(&RuleContext<'_>, &DataType) -> Result<Spec, BuildError> + Send + Sync;
pub type GuardFn = dyn Fn(&DataType, &TypeBindings) -> bool + Send + Sync;

// -----------------------------------------------------------------------------
// RuleContext

/// What a rule can see besides the type it is applied to.
pub struct RuleContext<'a> {
    pub(crate) bindings: &'a TypeBindings,
    pub(crate) config: &'a CodecConfig,
    pub(crate) overrides: &'a HashMap<(ClassRef, Box<str>), Spec>,
    pub(crate) grants: &'a HashSet<ClassRef>,
}

impl<'a> RuleContext<'a> {
    /// Bindings the directive's pattern made against the type.
    #[inline]
    pub fn bindings(&self) -> &'a TypeBindings {
        self.bindings
    }

    #[inline]
    pub fn config(&self) -> &'a CodecConfig {
        self.config
    }

    /// A spec registered for one field of a record class.
    #[inline]
    pub fn field_override(&self, class: ClassRef, field: &str) -> Option<&'a Spec> {
        self.overrides.get(&(class, Box::from(field)))
    }

    /// Whether a registered bundle grants access to a restricted class.
    #[inline]
    pub fn is_granted(&self, class: ClassRef) -> bool {
        self.grants.contains(&class)
    }
}

// -----------------------------------------------------------------------------
// Directive

/// A rule together with the types it applies to.
///
/// The directive matches a type when its pattern is bindable from it and
/// the guard, if any, accepts the type and the bindings.
///
/// # Examples
///
/// ```
/// use rj_spec::{Directive, SpecNode};
/// use rj_types::DataType;
///
/// let any_text = Directive::new("text", DataType::string(), |_, _| Ok(SpecNode::string()));
/// assert!(any_text.matches(&DataType::string()).is_some());
/// assert!(any_text.matches(&DataType::object()).is_none());
/// ```
#[derive(Clone)]
pub struct Directive {
    name: Box<str>,
    pattern: DataType,
    subtypes: bool,
    guard: Option<Arc<GuardFn>>,
    rule: Arc<RuleFn>,
}

impl Directive {
    pub fn new(
        name: &str,
        pattern: DataType,
        rule: impl Fn(&RuleContext<'_>, &DataType) -> Result<Spec, BuildError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            pattern,
            subtypes: false,
            guard: None,
            rule: Arc::new(rule),
        }
    }

    /// Also match subtypes of the pattern.
    #[inline]
    pub fn subtypes(mut self) -> Self {
        self.subtypes = true;
        self
    }

    #[inline]
    pub fn guard(
        mut self,
        guard: impl Fn(&DataType, &TypeBindings) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn pattern(&self) -> &DataType {
        &self.pattern
    }

    /// The bindings of a successful match.
    pub fn matches(&self, ty: &DataType) -> Option<TypeBindings> {
        let mut bindings = TypeBindings::new();
        if !self
            .pattern
            .is_bindable_from(ty, self.subtypes, &mut bindings)
        {
            return None;
        }
        match &self.guard {
            Some(guard) if !guard(ty, &bindings) => None,
            _ => Some(bindings),
        }
    }

    #[inline]
    pub fn apply(&self, cx: &RuleContext<'_>, ty: &DataType) -> Result<Spec, BuildError> {
        (self.rule)(cx, ty)
    }
}

impl fmt::Debug for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directive")
            .field("name", &self.name)
            .field("pattern", &format_args!("{}", self.pattern))
            .field("subtypes", &self.subtypes)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Bundle

/// A named, ordered group of directives.
///
/// A bundle also lists types to scan as soon as it is registered, and the
/// restricted classes its rules may instantiate.
#[derive(Clone, Debug)]
pub struct Bundle {
    name: Box<str>,
    directives: Vec<Directive>,
    prescan: Vec<DataType>,
    grants: Vec<ClassRef>,
}

impl Bundle {
    #[inline]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            directives: Vec::new(),
            prescan: Vec::new(),
            grants: Vec::new(),
        }
    }

    #[inline]
    pub fn directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    #[inline]
    pub fn prescan(mut self, ty: DataType) -> Self {
        self.prescan.push(ty);
        self
    }

    #[inline]
    pub fn grant(mut self, class: ClassRef) -> Self {
        self.grants.push(class);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    #[inline]
    pub fn prescan_types(&self) -> &[DataType] {
        &self.prescan
    }

    #[inline]
    pub fn grants(&self) -> &[ClassRef] {
        &self.grants
    }

    /// The first directive matching `ty`, with its bindings.
    pub fn find(&self, ty: &DataType) -> Option<(&Directive, TypeBindings)> {
        self.directives
            .iter()
            .find_map(|directive| directive.matches(ty).map(|bindings| (directive, bindings)))
    }
}

#[cfg(test)]
mod tests {
    use rj_types::{DataType, PrimitiveKind, builtin};

    use super::{Bundle, Directive};
    use crate::SpecNode;

    #[test]
    fn first_matching_directive_wins() {
        let bundle = Bundle::new("numbers")
            .directive(
                Directive::new("small", DataType::var("T"), |_, _| {
                    Ok(SpecNode::number(PrimitiveKind::I8))
                })
                .guard(|ty, _| *ty == DataType::from(PrimitiveKind::I8)),
            )
            .directive(Directive::new("any", DataType::var("T"), |_, _| {
                Ok(SpecNode::string())
            }));

        let (directive, bindings) = bundle.find(&PrimitiveKind::I8.into()).unwrap();
        assert_eq!(directive.name(), "small");
        assert_eq!(bindings.get("T"), Some(&DataType::from(PrimitiveKind::I8)));

        let (directive, _) = bundle.find(&PrimitiveKind::I32.into()).unwrap();
        assert_eq!(directive.name(), "any");
    }

    #[test]
    fn subtypes_are_opt_in() {
        let list = DataType::known(builtin::list(), [DataType::var("E")]);
        let array_list = DataType::known(builtin::array_list(), [DataType::string()]);
        let exact = Directive::new("list", list, |_, _| Ok(SpecNode::string()));
        assert!(exact.matches(&array_list).is_none());
        let bindings = exact.subtypes().matches(&array_list).unwrap();
        assert_eq!(bindings.get("E"), Some(&DataType::string()));
    }
}
