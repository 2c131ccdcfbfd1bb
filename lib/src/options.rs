//! Option types that replace boolean flag parameters in the Rust API.

/// Controls how IRIs in query results are rendered.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum UriRendering {
    /// Return every IRI exactly as stored.
    Full,
    /// Rewrite IRIs in a registered namespace to `prefix:local`.
    #[default]
    Short,
}

impl UriRendering {
    pub fn is_full(self) -> bool {
        matches!(self, UriRendering::Full)
    }
}

impl From<bool> for UriRendering {
    /// `true` means full URIs.
    fn from(value: bool) -> Self {
        if value {
            UriRendering::Full
        } else {
            UriRendering::Short
        }
    }
}

impl From<UriRendering> for bool {
    fn from(value: UriRendering) -> Self {
        value.is_full()
    }
}

/// What query expansion does with a `prefix:local` token whose prefix is not registered.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum PrefixPolicy {
    /// Leave the token alone; the SPARQL parser reports it.
    #[default]
    PassThrough,
    /// Fail before the query reaches the engine.
    Strict,
}

impl PrefixPolicy {
    pub fn is_strict(self) -> bool {
        matches!(self, PrefixPolicy::Strict)
    }
}

impl From<bool> for PrefixPolicy {
    fn from(value: bool) -> Self {
        if value {
            PrefixPolicy::Strict
        } else {
            PrefixPolicy::PassThrough
        }
    }
}
