//! Result records.
//!
//! A record keeps its values in field order together with a name index, so
//! lookups by name and ordered iteration read from the same storage.
//!
//! # Example
//!
//! ```
//! use epi_client::Record;
//!
//! let mut record = Record::new();
//! record.insert("idno", "70001");
//! record.insert("swd", "VAAG");
//!
//! assert_eq!(record.get("swd").unwrap(), "VAAG");
//! assert_eq!(record.get_as::<u32>("idno").unwrap(), 70001);
//! assert!(record.get("nope").is_err());
//! ```

use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::Field;
use crate::error::{EpiError, Result};

/// One result row: ordered field/value pairs addressable by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<Field>,
    values: Vec<String>,
    index: HashMap<String, usize>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing an existing value for the same field.
    ///
    /// Returns the position of the field within the record.
    pub fn insert(&mut self, field: impl Into<Field>, value: impl Into<String>) -> usize {
        let field = field.into();
        let value = value.into();

        if let Some(&pos) = self.index.get(field.name()) {
            self.values[pos] = value;
            return pos;
        }

        let pos = self.fields.len();
        self.index.insert(field.name().to_string(), pos);
        self.fields.push(field);
        self.values.push(value);
        pos
    }

    /// Append a fragment to the value at a position.
    pub(crate) fn append(&mut self, pos: usize, fragment: &str) {
        if let Some(value) = self.values.get_mut(pos) {
            value.push_str(fragment);
        }
    }

    /// Position of a field by name.
    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Value of a field.
    ///
    /// # Errors
    ///
    /// Returns [`EpiError::UnknownField`] if the record has no such field.
    pub fn get(&self, name: &str) -> Result<&str> {
        self.try_get(name)
            .ok_or_else(|| EpiError::UnknownField(name.to_string()))
    }

    /// Value of a field, or `None`.
    pub fn try_get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|pos| self.values[pos].as_str())
    }

    /// Value of a field parsed with [`FromStr`].
    pub fn get_as<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get_with(name, |raw| raw.trim().parse::<T>())
    }

    /// Value of a field converted by a caller-supplied function.
    pub fn get_with<T, E, F>(&self, name: &str, convert: F) -> Result<T>
    where
        E: Display,
        F: FnOnce(&str) -> std::result::Result<T, E>,
    {
        let raw = self.get(name)?;
        convert(raw).map_err(|e| EpiError::Conversion {
            field: name.to_string(),
            value: raw.to_string(),
            message: e.to_string(),
        })
    }

    /// Field definition by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.position(name).map(|pos| &self.fields[pos])
    }

    /// Check if the record has a value for the field.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Field/value pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&Field, &str)> {
        self.fields
            .iter()
            .zip(self.values.iter().map(String::as_str))
    }

    /// Field names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::name)
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record holds no values.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize as a JSON object of name to value.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field.name(), value)?;
        }
        map.end()
    }
}
