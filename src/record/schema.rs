use serde::{Deserialize, Serialize};

use super::error::{RecordError, RecordResult};
use super::value::{FieldType, Value};

/// One column of a tuple. The size is derived from the type when the field
/// is built and cannot change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FieldDef", into = "FieldDef")]
pub struct Field {
    name: String,
    size: usize,
    field_type: FieldType,
}

/// On-disk/JSON form of a field; `size` is implied by the type
#[derive(Serialize, Deserialize)]
struct FieldDef {
    name: String,
    #[serde(rename = "type")]
    field_type: FieldType,
}

impl From<FieldDef> for Field {
    fn from(def: FieldDef) -> Self {
        Field::new(def.name, def.field_type)
    }
}

impl From<Field> for FieldDef {
    fn from(field: Field) -> Self {
        FieldDef {
            name: field.name,
            field_type: field.field_type,
        }
    }
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            size: field_type.size(),
            field_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width of the field in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

/// Ordered field list describing a tuple layout.
///
/// A record is the concatenation of its fields in schema order, so the
/// schema is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Field>", into = "Vec<Field>")]
pub struct RecordSchema {
    fields: Vec<Field>,
    offsets: Vec<usize>,
    record_size: usize,
}

impl From<Vec<Field>> for RecordSchema {
    fn from(fields: Vec<Field>) -> Self {
        RecordSchema::new(fields)
    }
}

impl From<RecordSchema> for Vec<Field> {
    fn from(schema: RecordSchema) -> Self {
        schema.fields
    }
}

impl RecordSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        let mut offsets = Vec::with_capacity(fields.len());
        let mut record_size = 0;
        for field in &fields {
            offsets.push(record_size);
            record_size += field.size();
        }

        Self {
            fields,
            offsets,
            record_size,
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    /// Find field index by name
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Total tuple width in bytes
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Byte offset of a field within a record
    pub fn field_offset(&self, idx: usize) -> Option<usize> {
        self.offsets.get(idx).copied()
    }

    /// Check arity and per-field types of `values`
    pub fn validate(&self, values: &[Value]) -> RecordResult<()> {
        if values.len() != self.fields.len() {
            return Err(RecordError::SchemaMismatch(format!(
                "Expected {} fields, got {}",
                self.fields.len(),
                values.len()
            )));
        }

        for (value, field) in values.iter().zip(&self.fields) {
            let matches = matches!(
                (field.field_type, value),
                (FieldType::Int, Value::Int(_))
                    | (FieldType::Float, Value::Float(_))
                    | (FieldType::Char(_), Value::String(_))
            );
            if !matches {
                return Err(RecordError::TypeMismatch {
                    field: field.name.clone(),
                    expected: field.field_type.to_string(),
                    actual: value.field_type_name().to_string(),
                });
            }
        }

        Ok(())
    }
}
