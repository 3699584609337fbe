//! Fields, field metadata and field lists.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::error::{EpiError, Result};
use crate::protocol::parse_flag;

/// Attribute set by a metadata (`DM`) frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    /// `NAME`
    Name,
    /// `OUTNAME`
    OutName,
    /// `ORIGNAME`
    OriginalName,
    /// `DESC`
    Description,
    /// `TABLEFLAG`
    TableFlag,
    /// `LENGTH`
    Length,
    /// `TYPE`
    Type,
    /// `ORIGTYPE`
    OriginalType,
}

impl MetadataKind {
    /// Parse a wire keyword, ignoring case. Unknown keywords yield `None`.
    pub fn parse(keyword: &str) -> Option<Self> {
        let kind = match keyword.trim().to_ascii_uppercase().as_str() {
            "NAME" => Self::Name,
            "OUTNAME" => Self::OutName,
            "ORIGNAME" => Self::OriginalName,
            "DESC" => Self::Description,
            "TABLEFLAG" => Self::TableFlag,
            "LENGTH" => Self::Length,
            "TYPE" => Self::Type,
            "ORIGTYPE" => Self::OriginalType,
            _ => return None,
        };
        Some(kind)
    }

    /// Wire keyword.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::OutName => "OUTNAME",
            Self::OriginalName => "ORIGNAME",
            Self::Description => "DESC",
            Self::TableFlag => "TABLEFLAG",
            Self::Length => "LENGTH",
            Self::Type => "TYPE",
            Self::OriginalType => "ORIGTYPE",
        }
    }

    /// Validate a raw value for this attribute.
    pub(crate) fn parse_value(self, raw: &str) -> Result<MetadataValue> {
        match self {
            Self::TableFlag => Ok(MetadataValue::Flag(parse_flag(raw)?)),
            Self::Length => raw.trim().parse::<u32>().map(MetadataValue::Length).map_err(|_| {
                EpiError::Protocol(format!("field length {raw:?} is not a number"))
            }),
            _ => Ok(MetadataValue::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Parsed metadata value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MetadataValue {
    Text(String),
    Flag(bool),
    Length(u32),
}

/// A result column with its server-provided metadata.
///
/// Two fields are equal when their names are equal.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Field {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    out_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    table_field: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_type: Option<String>,
}

impl Field {
    /// Create a field without metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Field name as used in field lists and record lookups.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output name.
    pub fn out_name(&self) -> Option<&str> {
        self.out_name.as_deref()
    }

    /// Name before any renaming.
    pub fn original_name(&self) -> Option<&str> {
        self.original_name.as_deref()
    }

    /// Human readable description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the field belongs to a table row.
    pub fn is_table_field(&self) -> bool {
        self.table_field
    }

    /// Declared length.
    pub fn length(&self) -> Option<u32> {
        self.length
    }

    /// Current type.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    /// Original type.
    pub fn original_type(&self) -> Option<&str> {
        self.original_type.as_deref()
    }

    pub(crate) fn apply(&mut self, kind: MetadataKind, value: MetadataValue) {
        match (kind, value) {
            (MetadataKind::Name, MetadataValue::Text(v)) => self.name = v,
            (MetadataKind::OutName, MetadataValue::Text(v)) => self.out_name = Some(v),
            (MetadataKind::OriginalName, MetadataValue::Text(v)) => self.original_name = Some(v),
            (MetadataKind::Description, MetadataValue::Text(v)) => self.description = Some(v),
            (MetadataKind::Type, MetadataValue::Text(v)) => self.type_name = Some(v),
            (MetadataKind::OriginalType, MetadataValue::Text(v)) => self.original_type = Some(v),
            (MetadataKind::TableFlag, MetadataValue::Flag(v)) => self.table_field = v,
            (MetadataKind::Length, MetadataValue::Length(v)) => self.length = Some(v),
            (kind, value) => {
                tracing::warn!("Ignoring metadata {:?} for kind {}", value, kind);
            }
        }
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Field {}

impl Hash for Field {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Field {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Field {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Ordered collection of fields, unique by name.
///
/// `Display` renders the wire field list (`name,name,...`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldList {
    fields: Vec<Field>,
}

impl FieldList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from names, dropping duplicates.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::new();
        for name in names {
            list.add(name);
        }
        list
    }

    /// Add a field by name unless one with that name exists.
    ///
    /// Returns `false` if the name was already present.
    pub fn add(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.fields.push(Field::new(name));
        true
    }

    /// Append a field.
    ///
    /// # Errors
    ///
    /// Returns a usage error if a field with the same name exists.
    pub fn push(&mut self, field: Field) -> Result<()> {
        if self.contains(field.name()) {
            return Err(EpiError::Usage(format!(
                "field {} is already part of the field list",
                field.name()
            )));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Remove a field by name.
    pub fn remove(&mut self, name: &str) -> Option<Field> {
        let pos = self.position(name)?;
        Some(self.fields.remove(pos))
    }

    /// Remove all fields.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Check if a field with the name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Position of a field by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Field at a position.
    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.fields.iter()
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::name)
    }

    /// Apply one metadata group; value `i` updates field `i`.
    ///
    /// Values are validated before any field is touched. Values beyond the
    /// end of the list are ignored.
    pub(crate) fn apply_metadata(&mut self, kind: MetadataKind, values: &[String]) -> Result<()> {
        let parsed = values
            .iter()
            .take(self.fields.len())
            .map(|raw| kind.parse_value(raw))
            .collect::<Result<Vec<_>>>()?;

        if kind == MetadataKind::Name {
            let mut names: Vec<&str> = self.names().collect();
            for (slot, value) in names.iter_mut().zip(&parsed) {
                if let MetadataValue::Text(name) = value {
                    *slot = name.as_str();
                }
            }
            let unique: HashSet<&str> = names.iter().copied().collect();
            if unique.len() != names.len() {
                return Err(EpiError::Protocol(
                    "metadata renames fields to duplicate names".to_string(),
                ));
            }
        }

        for (field, value) in self.fields.iter_mut().zip(parsed) {
            field.apply(kind, value);
        }
        Ok(())
    }

    /// Append names announced by the server.
    ///
    /// # Errors
    ///
    /// Returns a protocol error, without modifying the list, if a name is
    /// announced twice.
    pub(crate) fn extend_discovered(&mut self, names: &[String]) -> Result<()> {
        let mut seen: HashSet<&str> = self.names().collect();
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(EpiError::Protocol(format!(
                    "server announced field {name} more than once"
                )));
            }
        }
        self.fields.extend(names.iter().map(|n| Field::new(n.as_str())));
        Ok(())
    }
}

impl fmt::Display for FieldList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(field.name())?;
        }
        Ok(())
    }
}

impl std::ops::Index<usize> for FieldList {
    type Output = Field;

    fn index(&self, index: usize) -> &Field {
        &self.fields[index]
    }
}

impl<'a> IntoIterator for &'a FieldList {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_names(iter)
    }
}
