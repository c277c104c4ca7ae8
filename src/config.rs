//! Resolver configuration.
//!
//! `ResolverConfig` controls how strictly writer and reader names are matched
//! and how unknown enum symbols are treated. It is shared by `Resolver` and
//! `ResolutionCache`.

/// Options for building resolution plans.
///
/// # Example
/// ```
/// use avro_resolver::ResolverConfig;
///
/// let config = ResolverConfig {
///     apply_aliases: false,
///     ..Default::default()
/// };
/// assert!(config.use_enum_default);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Match names through reader aliases (default: true).
    ///
    /// When off, record, enum and fixed names and record field names must
    /// match exactly.
    pub apply_aliases: bool,

    /// Map writer enum symbols missing from the reader to the reader's
    /// default symbol, if it declares one (default: true).
    pub use_enum_default: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            apply_aliases: true,
            use_enum_default: true,
        }
    }
}

impl ResolverConfig {
    /// Create a new `ResolverConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable alias matching.
    pub fn with_apply_aliases(mut self, apply_aliases: bool) -> Self {
        self.apply_aliases = apply_aliases;
        self
    }

    /// Enable or disable the reader enum default symbol.
    pub fn with_use_enum_default(mut self, use_enum_default: bool) -> Self {
        self.use_enum_default = use_enum_default;
        self
    }
}
