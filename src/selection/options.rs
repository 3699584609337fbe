//! Scalar selection settings and their selection-text spelling.

use std::fmt;

/// How conditions are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LinkMode {
    /// All conditions must hold.
    #[default]
    And,
    /// Any condition may hold.
    Or,
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::And => "(And)",
            Self::Or => "(Or)",
        })
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderDirection {
    /// Ascending.
    Ascending,
    /// Descending.
    Descending,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ascending => "forwards",
            Self::Descending => "backwards",
        })
    }
}

/// Server-side record lifecycle filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilingMode {
    /// Active records only.
    #[default]
    Active,
    /// Filed records only.
    Filed,
    /// Active and filed records.
    Both,
    /// Versioned records.
    Versioned,
}

impl fmt::Display for FilingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the server spells the versioned mode this way
        f.write_str(match self {
            Self::Active => "(Active)",
            Self::Filed => "(Filed)",
            Self::Both => "(Both)",
            Self::Versioned => "(Versionied)",
        })
    }
}

/// Language of field names in field lists and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    /// German names.
    German,
    /// English names.
    #[default]
    English,
}

impl Language {
    /// Wire code.
    pub fn code(self) -> &'static str {
        match self {
            Self::German => "DE",
            Self::English => "EN",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
