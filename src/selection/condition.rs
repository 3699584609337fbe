//! Selection conditions and their operators.
//!
//! # Example
//!
//! ```
//! use epi_client::selection::Condition;
//!
//! assert_eq!(Condition::eq("swd", "VAAG").to_string(), "swd==VAAG");
//! assert_eq!(Condition::between("idno", "1", "9").to_string(), "idno=1!9");
//! assert_eq!(Condition::not_empty("descr").to_string(), "descr<>`");
//! ```

use std::fmt;

use crate::error::{EpiError, Result};

/// Comparison operator of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `{f}=={v}`
    Eq,
    /// `{f}~{v}`
    EqIgnoreCase,
    /// `{f}<>{v}`
    Neq,
    /// `{f}~<>{v}`
    NeqIgnoreCase,
    /// `{f}={v}!{v2}`
    Between,
    /// ``{f}==` ``
    Empty,
    /// ``{f}<>` ``
    NotEmpty,
    /// `{f}/{v}`
    Contains,
    /// `{f}~/{v}`
    ContainsIgnoreCase,
    /// `{f}//{v}`
    ContainsWord,
    /// `{f}~//{v}`
    ContainsWordIgnoreCase,
    /// `{f}={v}!!`
    Gt,
    /// `{f}={v}!`
    Geqt,
    /// `{f}=!!{v}`
    Lt,
    /// `{f}=!{v}`
    Leqt,
    /// ``{f}=`{v}``
    Matchcode,
    /// ``{f}~`{v}``
    MatchcodeIgnoreCase,
    /// ``{f}<>`{v}``
    NotMatchcode,
    /// ``{f}~<>`{v}``
    NotMatchcodeIgnoreCase,
    /// `{f}/=={v}`
    Expression,
    /// `{f}~/=={v}`
    ExpressionIgnoreCase,
    /// `{f}/<>{v}`
    NotExpression,
    /// `{f}~/<>{v}`
    NotExpressionIgnoreCase,
}

impl Operator {
    /// Number of values the operator takes.
    pub fn arity(self) -> usize {
        match self {
            Self::Empty | Self::NotEmpty => 0,
            Self::Between => 2,
            _ => 1,
        }
    }

    /// Text after the field, between the values, and after the last value.
    fn parts(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Eq => ("==", "", ""),
            Self::EqIgnoreCase => ("~", "", ""),
            Self::Neq => ("<>", "", ""),
            Self::NeqIgnoreCase => ("~<>", "", ""),
            Self::Between => ("=", "!", ""),
            Self::Empty => ("==`", "", ""),
            Self::NotEmpty => ("<>`", "", ""),
            Self::Contains => ("/", "", ""),
            Self::ContainsIgnoreCase => ("~/", "", ""),
            Self::ContainsWord => ("//", "", ""),
            Self::ContainsWordIgnoreCase => ("~//", "", ""),
            Self::Gt => ("=", "", "!!"),
            Self::Geqt => ("=", "", "!"),
            Self::Lt => ("=!!", "", ""),
            Self::Leqt => ("=!", "", ""),
            Self::Matchcode => ("=`", "", ""),
            Self::MatchcodeIgnoreCase => ("~`", "", ""),
            Self::NotMatchcode => ("<>`", "", ""),
            Self::NotMatchcodeIgnoreCase => ("~<>`", "", ""),
            Self::Expression => ("/==", "", ""),
            Self::ExpressionIgnoreCase => ("~/==", "", ""),
            Self::NotExpression => ("/<>", "", ""),
            Self::NotExpressionIgnoreCase => ("~/<>", "", ""),
        }
    }

    /// Format template with `{f}`, `{v}` and `{v2}` placeholders.
    pub fn template(self) -> String {
        let (infix, mid, suffix) = self.parts();
        match self.arity() {
            0 => format!("{{f}}{infix}{suffix}"),
            1 => format!("{{f}}{infix}{{v}}{suffix}"),
            _ => format!("{{f}}{infix}{{v}}{mid}{{v2}}{suffix}"),
        }
    }

    /// Render the operator for a field and its values.
    fn render(self, out: &mut fmt::Formatter<'_>, field: &str, values: &[String]) -> fmt::Result {
        let (infix, mid, suffix) = self.parts();
        out.write_str(field)?;
        out.write_str(infix)?;
        for (i, value) in values.iter().take(self.arity()).enumerate() {
            if i > 0 {
                out.write_str(mid)?;
            }
            out.write_str(value)?;
        }
        out.write_str(suffix)
    }
}

/// One selection criterion: field, operator and values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    field: String,
    operator: Operator,
    values: Vec<String>,
}

impl Condition {
    /// Create a condition, checking the operator arity.
    ///
    /// # Errors
    ///
    /// Returns a usage error if the number of values does not match.
    pub fn new<I, S>(field: impl Into<String>, operator: Operator, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.len() != operator.arity() {
            return Err(EpiError::Usage(format!(
                "operator {operator:?} takes {} value(s), got {}",
                operator.arity(),
                values.len()
            )));
        }
        Ok(Self {
            field: field.into(),
            operator,
            values,
        })
    }

    fn unary(field: impl Into<String>, operator: Operator) -> Self {
        Self {
            field: field.into(),
            operator,
            values: Vec::new(),
        }
    }

    fn binary(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            values: vec![value.into()],
        }
    }

    /// Field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Values, as many as the operator's arity.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Equal.
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::Eq, value)
    }

    /// Equal, ignoring case.
    pub fn eq_ignore_case(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::EqIgnoreCase, value)
    }

    /// Not equal.
    pub fn neq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::Neq, value)
    }

    /// Not equal, ignoring case.
    pub fn neq_ignore_case(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::NeqIgnoreCase, value)
    }

    /// Value within `from..=to`.
    pub fn between(
        field: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: Operator::Between,
            values: vec![from.into(), to.into()],
        }
    }

    /// Field is empty.
    pub fn empty(field: impl Into<String>) -> Self {
        Self::unary(field, Operator::Empty)
    }

    /// Field is filled.
    pub fn not_empty(field: impl Into<String>) -> Self {
        Self::unary(field, Operator::NotEmpty)
    }

    /// Contains a substring.
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::Contains, value)
    }

    /// Contains a substring, ignoring case.
    pub fn contains_ignore_case(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::ContainsIgnoreCase, value)
    }

    /// Contains a whole word.
    pub fn contains_word(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::ContainsWord, value)
    }

    /// Contains a whole word, ignoring case.
    pub fn contains_word_ignore_case(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::ContainsWordIgnoreCase, value)
    }

    /// Greater than.
    pub fn gt(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::Gt, value)
    }

    /// Greater than or equal.
    pub fn geqt(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::Geqt, value)
    }

    /// Less than.
    pub fn lt(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::Lt, value)
    }

    /// Less than or equal.
    pub fn leqt(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::Leqt, value)
    }

    /// Matches a matchcode.
    pub fn matchcode(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::Matchcode, value)
    }

    /// Matches a matchcode, ignoring case.
    pub fn matchcode_ignore_case(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::MatchcodeIgnoreCase, value)
    }

    /// Does not match a matchcode.
    pub fn not_matchcode(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::NotMatchcode, value)
    }

    /// Does not match a matchcode, ignoring case.
    pub fn not_matchcode_ignore_case(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::NotMatchcodeIgnoreCase, value)
    }

    /// Matches a regular expression.
    pub fn expression(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::Expression, value)
    }

    /// Matches a regular expression, ignoring case.
    pub fn expression_ignore_case(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::ExpressionIgnoreCase, value)
    }

    /// Does not match a regular expression.
    pub fn not_expression(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::NotExpression, value)
    }

    /// Does not match a regular expression, ignoring case.
    pub fn not_expression_ignore_case(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::binary(field, Operator::NotExpressionIgnoreCase, value)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.operator.render(f, &self.field, &self.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_operator_renders_its_template() {
        let cases = [
            (Condition::eq("f", "v"), "f==v"),
            (Condition::eq_ignore_case("f", "v"), "f~v"),
            (Condition::neq("f", "v"), "f<>v"),
            (Condition::neq_ignore_case("f", "v"), "f~<>v"),
            (Condition::between("f", "a", "b"), "f=a!b"),
            (Condition::empty("f"), "f==`"),
            (Condition::not_empty("f"), "f<>`"),
            (Condition::contains("f", "v"), "f/v"),
            (Condition::contains_ignore_case("f", "v"), "f~/v"),
            (Condition::contains_word("f", "v"), "f//v"),
            (Condition::contains_word_ignore_case("f", "v"), "f~//v"),
            (Condition::gt("f", "v"), "f=v!!"),
            (Condition::geqt("f", "v"), "f=v!"),
            (Condition::lt("f", "v"), "f=!!v"),
            (Condition::leqt("f", "v"), "f=!v"),
            (Condition::matchcode("f", "v"), "f=`v"),
            (Condition::matchcode_ignore_case("f", "v"), "f~`v"),
            (Condition::not_matchcode("f", "v"), "f<>`v"),
            (Condition::not_matchcode_ignore_case("f", "v"), "f~<>`v"),
            (Condition::expression("f", "v"), "f/==v"),
            (Condition::expression_ignore_case("f", "v"), "f~/==v"),
            (Condition::not_expression("f", "v"), "f/<>v"),
            (Condition::not_expression_ignore_case("f", "v"), "f~/<>v"),
        ];

        for (condition, expected) in cases {
            assert_eq!(condition.to_string(), expected);
            let template = condition.operator().template();
            let filled = template
                .replace("{f}", "f")
                .replace("{v2}", "b")
                .replace("{v}", if condition.operator() == Operator::Between { "a" } else { "v" });
            assert_eq!(filled, expected, "{:?}", condition.operator());
        }
    }

    #[test]
    fn test_arity_checked() {
        assert!(Condition::new("f", Operator::Between, ["a"]).is_err());
        assert!(Condition::new("f", Operator::Empty, ["a"]).is_err());
        let c = Condition::new("f", Operator::Gt, ["3"]).unwrap();
        assert_eq!(c.to_string(), "f=3!!");
        assert_eq!(c.values(), &["3"]);
    }
}
