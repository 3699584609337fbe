//! Predicate builder lowered into selection conditions.
//!
//! The selection language only knows a flat list of conditions combined by
//! one link mode, so lowering is lossy in the same way for every filter:
//! - any `or` switches the whole selection to [`LinkMode::Or`]
//! - `not` flips each comparison below it (`<` to `>=`, `==` to `<>`, ...)
//! - comparing with an empty value tests for empty/filled fields
//! - the pseudo-field `recordFiled` sets the filing mode instead
//!
//! # Example
//!
//! ```
//! use epi_client::selection::Filter;
//!
//! let filter = Filter::field("swd").eq("VAAG").and(Filter::field("idno").ge(100));
//! let selection = filter.to_selection(0, [1]);
//!
//! assert_eq!(
//!     selection.to_string(),
//!     "0:1,swd==VAAG;idno=100!;@link=(And);@rows=(No);@filingmode=(Active);@lang=EN"
//! );
//! assert_eq!(selection.fields().to_string(), "swd,idno");
//! ```

use super::{Condition, FilingMode, LinkMode, Selection};

/// Pseudo-field selecting filed instead of active records.
pub const RECORD_FILED_FIELD: &str = "recordFiled";

/// A literal compared against a field.
///
/// Text has `;` and `@` removed, booleans become `(Yes)` / `(No)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterValue(String);

impl FilterValue {
    /// Rendered value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self(value.replace([';', '@'], ""))
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self(if value { "(Yes)" } else { "(No)" }.to_string())
    }
}

macro_rules! numeric_filter_value {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

numeric_filter_value!(i32, i64, u32, u64, f64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Neq,
    Lt,
    Gt,
    Le,
    Ge,
}

/// Predicate over record fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field compared with a value.
    Compare {
        /// Field name.
        field: String,
        /// Comparison.
        op: CompareOp,
        /// Literal.
        value: FilterValue,
    },
    /// Boolean field is set.
    Flag {
        /// Field name.
        field: String,
    },
    /// Negation.
    Not(Box<Filter>),
    /// Both hold.
    And(Box<Filter>, Box<Filter>),
    /// Either holds.
    Or(Box<Filter>, Box<Filter>),
}

/// Comparison of a [`Filter::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareOp(Comparison);

/// Field reference returned by [`Filter::field`].
#[derive(Debug, Clone)]
pub struct FieldFilter {
    name: String,
}

impl FieldFilter {
    fn compare(self, op: Comparison, value: impl Into<FilterValue>) -> Filter {
        Filter::Compare {
            field: self.name,
            op: CompareOp(op),
            value: value.into(),
        }
    }

    /// `field == value`
    pub fn eq(self, value: impl Into<FilterValue>) -> Filter {
        self.compare(Comparison::Eq, value)
    }

    /// `field != value`
    pub fn neq(self, value: impl Into<FilterValue>) -> Filter {
        self.compare(Comparison::Neq, value)
    }

    /// `field < value`
    pub fn lt(self, value: impl Into<FilterValue>) -> Filter {
        self.compare(Comparison::Lt, value)
    }

    /// `field > value`
    pub fn gt(self, value: impl Into<FilterValue>) -> Filter {
        self.compare(Comparison::Gt, value)
    }

    /// `field <= value`
    pub fn le(self, value: impl Into<FilterValue>) -> Filter {
        self.compare(Comparison::Le, value)
    }

    /// `field >= value`
    pub fn ge(self, value: impl Into<FilterValue>) -> Filter {
        self.compare(Comparison::Ge, value)
    }

    /// Boolean field is set.
    pub fn is_true(self) -> Filter {
        Filter::Flag { field: self.name }
    }

    /// Boolean field is not set.
    pub fn is_false(self) -> Filter {
        self.is_true().not()
    }
}

impl Filter {
    /// Start a predicate on a field.
    pub fn field(name: impl Into<String>) -> FieldFilter {
        FieldFilter { name: name.into() }
    }

    /// Both predicates hold.
    pub fn and(self, other: Filter) -> Filter {
        Filter::And(Box::new(self), Box::new(other))
    }

    /// Either predicate holds.
    pub fn or(self, other: Filter) -> Filter {
        Filter::Or(Box::new(self), Box::new(other))
    }

    /// Negate the predicate.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }

    /// Lower into a new selection on a database and groups.
    pub fn to_selection(&self, database: u32, groups: impl IntoIterator<Item = u32>) -> Selection {
        let mut selection = Selection::new(database, groups);
        self.apply_to(&mut selection);
        selection
    }

    /// Lower into an existing selection, appending conditions.
    pub fn apply_to(&self, selection: &mut Selection) {
        self.lower(selection, false);
    }

    fn lower(&self, selection: &mut Selection, negate: bool) {
        match self {
            Filter::Compare { field, op, value } => {
                selection.fields_mut().add(field.as_str());
                selection.add_condition(comparison(field, op.0, value.as_str(), negate));
            }
            Filter::Flag { field } => {
                if field == RECORD_FILED_FIELD {
                    let mode = if negate {
                        FilingMode::Active
                    } else {
                        FilingMode::Filed
                    };
                    selection.set_filing_mode(mode);
                } else {
                    selection.fields_mut().add(field.as_str());
                    selection.add_condition(Condition::eq(
                        field.as_str(),
                        FilterValue::from(!negate).as_str(),
                    ));
                }
            }
            Filter::Not(inner) => inner.lower(selection, !negate),
            Filter::And(left, right) => {
                left.lower(selection, negate);
                right.lower(selection, negate);
            }
            Filter::Or(left, right) => {
                left.lower(selection, negate);
                right.lower(selection, negate);
                selection.set_link_mode(LinkMode::Or);
            }
        }
    }
}

fn comparison(field: &str, op: Comparison, value: &str, negate: bool) -> Condition {
    let op = if negate { negated(op) } else { op };

    match op {
        Comparison::Eq if value.is_empty() => Condition::empty(field),
        Comparison::Neq if value.is_empty() => Condition::not_empty(field),
        Comparison::Eq => Condition::eq(field, value),
        Comparison::Neq => Condition::neq(field, value),
        Comparison::Lt => Condition::lt(field, value),
        Comparison::Gt => Condition::gt(field, value),
        Comparison::Le => Condition::leqt(field, value),
        Comparison::Ge => Condition::geqt(field, value),
    }
}

fn negated(op: Comparison) -> Comparison {
    match op {
        Comparison::Eq => Comparison::Neq,
        Comparison::Neq => Comparison::Eq,
        Comparison::Lt => Comparison::Ge,
        Comparison::Ge => Comparison::Lt,
        Comparison::Gt => Comparison::Le,
        Comparison::Le => Comparison::Gt,
    }
}
