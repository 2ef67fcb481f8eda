use serde::{Deserialize, Serialize};

/// Options for scanning and for building a codec.
///
/// Every option defaults to `false`. The struct can be loaded from any serde
/// format; unknown keys are rejected and missing ones take their default.
///
/// # Examples
///
/// ```
/// use rj_spec::CodecConfig;
///
/// let config = CodecConfig::new().compiled(true).fewer_switches(true);
/// assert!(config.compiled && config.fewer_switches);
/// assert!(!config.iterative);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    /// Use compiled routines instead of walking the spec tree.
    pub compiled: bool,
    /// Interpret with an explicit frame stack instead of recursion.
    pub iterative: bool,
    /// Rewrite the type map after scanning.
    pub optimize: bool,
    /// Compile unambiguous runs of member-name characters as one comparison.
    pub fewer_switches: bool,
    /// Only scan the requested types, not the types they refer to.
    pub shallow_scan: bool,
}

impl CodecConfig {
    #[inline]
    pub const fn new() -> Self {
        Self {
            compiled: false,
            iterative: false,
            optimize: false,
            fewer_switches: false,
            shallow_scan: false,
        }
    }

    #[inline]
    pub const fn compiled(mut self, value: bool) -> Self {
        self.compiled = value;
        self
    }

    #[inline]
    pub const fn iterative(mut self, value: bool) -> Self {
        self.iterative = value;
        self
    }

    #[inline]
    pub const fn optimize(mut self, value: bool) -> Self {
        self.optimize = value;
        self
    }

    #[inline]
    pub const fn fewer_switches(mut self, value: bool) -> Self {
        self.fewer_switches = value;
        self
    }

    #[inline]
    pub const fn shallow_scan(mut self, value: bool) -> Self {
        self.shallow_scan = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::CodecConfig;

    #[test]
    fn loads_from_json() {
        let config: CodecConfig = serde_json::from_str(r#"{"iterative": true}"#).unwrap();
        assert_eq!(config, CodecConfig::new().iterative(true));

        let text = serde_json::to_string(&CodecConfig::new().optimize(true)).unwrap();
        assert_eq!(
            text,
            r#"{"compiled":false,"iterative":false,"optimize":true,"fewer_switches":false,"shallow_scan":false}"#
        );
    }

    #[test]
    fn unknown_options_are_rejected() {
        let err = serde_json::from_str::<CodecConfig>(r#"{"fewerSwitches": true}"#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }
}
