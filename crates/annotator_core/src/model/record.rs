//! Annotation record model.
//!
//! # Responsibility
//! - Define the canonical row of the `annotation` table.
//! - Decode delete/export kinds from their wire integers.
//!
//! # Invariants
//! - `unique_id` is assigned at load time and never reused or changed.
//! - `fields` keeps table column order.
//! - Annotation fields hold serialized JSON text, independently nullable.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque identifier generated for each source row at load time.
pub type UniqueId = String;

/// One source column value copied verbatim from the spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceField {
    pub name: String,
    pub value: Option<String>,
}

/// One row of the `annotation` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationRecord {
    /// Insertion ordinal; rows are listed and exported in this order.
    pub index: i64,
    pub unique_id: UniqueId,
    pub fields: Vec<SourceField>,
    /// Serialized BILUO document.
    pub biluo_annotation: Option<String>,
    /// Serialized span-tuple payload.
    pub non_biluo_annotation: Option<String>,
}

impl AnnotationRecord {
    /// Returns the value of a source column, `None` for unknown or empty.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .and_then(|field| field.value.as_deref())
    }

    /// Returns whether neither annotation representation is stored.
    pub fn is_unannotated(&self) -> bool {
        self.biluo_annotation.is_none() && self.non_biluo_annotation.is_none()
    }
}

/// Serialized as one flat object: `index`, `unique_id`, each source column,
/// then both annotation fields.
impl Serialize for AnnotationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 4))?;
        map.serialize_entry("index", &self.index)?;
        map.serialize_entry("unique_id", &self.unique_id)?;
        for field in &self.fields {
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.serialize_entry("biluo_annotation", &self.biluo_annotation)?;
        map.serialize_entry("non_biluo_annotation", &self.non_biluo_annotation)?;
        map.end()
    }
}

/// Delete operation variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteKind {
    /// Wire value `1`: remove the whole record.
    Record,
    /// Wire value `2`: clear both annotation fields, keep source data.
    Annotations,
}

impl TryFrom<i64> for DeleteKind {
    type Error = KindError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Record),
            2 => Ok(Self::Annotations),
            other => Err(KindError {
                kind: "delete",
                value: other,
            }),
        }
    }
}

/// Export dataset variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportKind {
    /// Wire value `1`: BILUO documents, renumbered and converted.
    #[default]
    Biluo,
    /// Wire value `2`: span-tuple payloads as stored.
    SpanTuple,
}

impl TryFrom<i64> for ExportKind {
    type Error = KindError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Biluo),
            2 => Ok(Self::SpanTuple),
            other => Err(KindError {
                kind: "export",
                value: other,
            }),
        }
    }
}

/// Unsupported wire value for an operation kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindError {
    pub kind: &'static str,
    pub value: i64,
}

impl Display for KindError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported {} type `{}`; expected 1 or 2",
            self.kind, self.value
        )
    }
}

impl Error for KindError {}
