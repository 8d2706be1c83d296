use std::fmt;

use super::error::{RecordError, RecordResult};
use super::schema::RecordSchema;
use super::value::Value;
use crate::file::PageId;

/// Slot identifier within a page
pub type SlotId = usize;

/// Physical identifier for a record (page + slot)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_id: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_id: SlotId) -> Self {
        Self { page_id, slot_id }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id, self.slot_id)
    }
}

/// A tuple of values. Records read from a table remember where they came
/// from; synthetic records (e.g. a delete count) have no id.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    rid: Option<RecordId>,
    values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { rid: None, values }
    }

    /// Tag the record with the slot it was read from
    pub fn at(mut self, rid: RecordId) -> Self {
        self.rid = Some(rid);
        self
    }

    pub fn rid(&self) -> Option<RecordId> {
        self.rid
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Encode according to `schema`: fields back to back, in schema order
    pub fn serialize(&self, schema: &RecordSchema) -> RecordResult<Vec<u8>> {
        schema.validate(&self.values)?;

        let mut result = vec![0u8; schema.record_size()];
        let mut offset = 0;
        for (value, field) in self.values.iter().zip(schema.fields()) {
            let end = offset + field.size();
            value.write_to(field.field_type(), &mut result[offset..end])?;
            offset = end;
        }

        Ok(result)
    }

    pub fn deserialize(data: &[u8], schema: &RecordSchema) -> RecordResult<Self> {
        if data.len() != schema.record_size() {
            return Err(RecordError::Deserialization(format!(
                "Expected {} bytes, got {}",
                schema.record_size(),
                data.len()
            )));
        }

        let mut values = Vec::with_capacity(schema.field_count());
        let mut offset = 0;
        for field in schema.fields() {
            let end = offset + field.size();
            values.push(Value::read_from(&data[offset..end], field.field_type())?);
            offset = end;
        }

        Ok(Record::new(values))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in &self.values {
            if !first {
                write!(f, " | ")?;
            }
            write!(f, "{}", value)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, FieldType};

    fn create_test_schema() -> RecordSchema {
        RecordSchema::new(vec![
            Field::new("id", FieldType::Int),
            Field::new("name", FieldType::Char(10)),
            Field::new("score", FieldType::Float),
        ])
    }

    #[test]
    fn test_record_layout() {
        let schema = create_test_schema();
        let record = Record::new(vec![
            Value::Int(42),
            Value::String("test".to_string()),
            Value::Float(2.5),
        ]);

        let bytes = record.serialize(&schema).unwrap();
        assert_eq!(bytes.len(), schema.record_size());
        assert_eq!(&bytes[0..4], &42i32.to_le_bytes());
        assert_eq!(&bytes[4..8], b"test");
        assert_eq!(&bytes[14..22], &2.5f64.to_le_bytes());

        let restored = Record::deserialize(&bytes, &schema).unwrap();
        assert_eq!(restored, record);
        assert_eq!(restored.rid(), None);
    }

    #[test]
    fn test_record_validation_error() {
        let schema = create_test_schema();
        let record = Record::new(vec![Value::Int(1)]);
        assert!(matches!(
            record.serialize(&schema),
            Err(RecordError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_serialize_rejects_nul_in_string() {
        let schema = create_test_schema();
        let record = Record::new(vec![
            Value::Int(1),
            Value::String("a\0b".to_string()),
            Value::Float(0.0),
        ]);
        assert!(matches!(
            record.serialize(&schema),
            Err(RecordError::Serialization(_))
        ));
    }

    #[test]
    fn test_deserialize_wrong_length() {
        let schema = create_test_schema();
        let result = Record::deserialize(&[0u8; 5], &schema);
        assert!(matches!(result, Err(RecordError::Deserialization(_))));
    }

    #[test]
    fn test_display() {
        let record = Record::new(vec![Value::Int(7), Value::String("bob".to_string())]);
        assert_eq!(record.to_string(), "7 | bob");
    }
}
