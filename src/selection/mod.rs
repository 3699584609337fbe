//! Selection module - compiles query criteria into selection text.
//!
//! A [`Selection`] targets one database (optionally restricted to groups) and
//! carries conditions plus scalar settings. Its `Display` output is the
//! selection text sent as the first field of a query command.
//!
//! # Example
//!
//! ```
//! use epi_client::selection::{Condition, Selection};
//!
//! let selection = Selection::new(0, [1, 2]).with_condition(Condition::eq("swd", "VAAG"));
//! assert_eq!(
//!     selection.to_string(),
//!     "0:1.2,swd==VAAG;@link=(And);@rows=(No);@filingmode=(Active);@lang=EN"
//! );
//! ```

mod condition;
mod filter;
mod options;

use std::fmt;

pub use condition::{Condition, Operator};
pub use filter::{CompareOp, FieldFilter, Filter, FilterValue, RECORD_FILED_FIELD};
pub use options::{FilingMode, Language, LinkMode, OrderDirection};

use crate::model::FieldList;

/// Separator between selection criteria.
pub const CRITERIA_SEPARATOR: char = ';';

/// Structured query criteria for one database.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    database: u32,
    groups: Vec<u32>,
    conditions: Vec<Condition>,
    link_mode: LinkMode,
    key: Option<String>,
    order_field: Option<String>,
    direction: Option<OrderDirection>,
    include_rows: bool,
    filing_mode: FilingMode,
    limit: u32,
    paging: bool,
    page_size: u32,
    offset: u32,
    language: Language,
    fields: FieldList,
}

impl Selection {
    /// Create a selection on a database, restricted to the given groups.
    pub fn new(database: u32, groups: impl IntoIterator<Item = u32>) -> Self {
        Self {
            database,
            groups: groups.into_iter().collect(),
            conditions: Vec::new(),
            link_mode: LinkMode::default(),
            key: None,
            order_field: None,
            direction: None,
            include_rows: false,
            filing_mode: FilingMode::default(),
            limit: 0,
            paging: false,
            page_size: 0,
            offset: 0,
            language: Language::default(),
            fields: FieldList::new(),
        }
    }

    // Builder-style setters

    /// Add a condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Combine conditions with `And` or `Or`.
    pub fn with_link_mode(mut self, link_mode: LinkMode) -> Self {
        self.link_mode = link_mode;
        self
    }

    /// Use a specific sort key instead of the server's choice.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Order by a field.
    pub fn with_order_field(mut self, field: impl Into<String>) -> Self {
        self.order_field = Some(field.into());
        self
    }

    /// Sort direction.
    pub fn with_direction(mut self, direction: OrderDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Include table rows.
    pub fn with_include_rows(mut self, include_rows: bool) -> Self {
        self.include_rows = include_rows;
        self
    }

    /// Filter by filing state.
    pub fn with_filing_mode(mut self, filing_mode: FilingMode) -> Self {
        self.filing_mode = filing_mode;
        self
    }

    /// Stop after `limit` hits (0 = unlimited).
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Fetch the result in pages of `page_size` records.
    pub fn with_paging(mut self, page_size: u32) -> Self {
        self.paging = true;
        self.page_size = page_size;
        self
    }

    /// Skip the first `offset` records.
    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Language of field names.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Select only these fields (empty = all fields).
    pub fn with_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.fields.add(name);
        }
        self
    }

    // In-place mutators

    /// Add a condition.
    pub fn add_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    /// Set the link mode.
    pub fn set_link_mode(&mut self, link_mode: LinkMode) {
        self.link_mode = link_mode;
    }

    /// Set the filing mode.
    pub fn set_filing_mode(&mut self, filing_mode: FilingMode) {
        self.filing_mode = filing_mode;
    }

    /// Mutable access to the field list.
    pub fn fields_mut(&mut self) -> &mut FieldList {
        &mut self.fields
    }

    // Getters

    /// Database number.
    pub fn database(&self) -> u32 {
        self.database
    }

    /// Group numbers.
    pub fn groups(&self) -> &[u32] {
        &self.groups
    }

    /// Conditions in order.
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Link mode.
    pub fn link_mode(&self) -> LinkMode {
        self.link_mode
    }

    /// Sort key.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Order field.
    pub fn order_field(&self) -> Option<&str> {
        self.order_field.as_deref()
    }

    /// Sort direction.
    pub fn direction(&self) -> Option<OrderDirection> {
        self.direction
    }

    /// Whether table rows are included.
    pub fn include_rows(&self) -> bool {
        self.include_rows
    }

    /// Filing mode.
    pub fn filing_mode(&self) -> FilingMode {
        self.filing_mode
    }

    /// Hit limit (0 = unlimited).
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Whether paging is enabled.
    pub fn paging(&self) -> bool {
        self.paging
    }

    /// Page size when paging.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Records skipped at the start.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Field name language.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Selected fields.
    pub fn fields(&self) -> &FieldList {
        &self.fields
    }

    /// Combine with another selection.
    ///
    /// The result has this selection's conditions followed by `other`'s and
    /// every other setting (including the field list) copied from `self`.
    /// Neither input changes.
    pub fn merge(&self, other: &Selection) -> Selection {
        let mut merged = self.clone();
        merged.conditions.extend(other.conditions.iter().cloned());
        merged
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = CRITERIA_SEPARATOR;

        if !self.groups.is_empty() {
            write!(f, "{}:", self.database)?;
            for (i, group) in self.groups.iter().enumerate() {
                if i > 0 {
                    f.write_str(".")?;
                }
                write!(f, "{group}")?;
            }
        }
        f.write_str(",")?;

        // "<db>:," without groups is rejected by the server
        if self.groups.is_empty() {
            write!(f, "@database={}{sep}", self.database)?;
        }

        for condition in &self.conditions {
            write!(f, "{condition}{sep}")?;
        }

        write!(f, "@link={}{sep}", self.link_mode)?;

        if let Some(key) = self.key.as_deref().filter(|k| !k.is_empty()) {
            write!(f, "@sort={key}{sep}")?;
        }

        match self.order_field.as_deref().filter(|o| !o.is_empty()) {
            Some(order) => {
                write!(f, "@order={order}")?;
                if let Some(direction) = self.direction {
                    write!(f, ".{direction}")?;
                }
                write!(f, "{sep}")?;
            }
            None => {
                if let Some(direction) = self.direction {
                    write!(f, "@direction={direction}{sep}")?;
                }
            }
        }

        let rows = if self.include_rows { "(Yes)" } else { "(No)" };
        write!(f, "@rows={rows}{sep}")?;
        write!(f, "@filingmode={}{sep}", self.filing_mode)?;

        if self.limit > 0 {
            write!(f, "@maxhit={}{sep}", self.limit)?;
        }

        write!(f, "@lang={}", self.language)
    }
}
