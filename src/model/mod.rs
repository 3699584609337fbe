//! Model module - fields, field lists and records.

mod field;
mod record;

pub use field::{Field, FieldList, MetadataKind};
pub use record::Record;
