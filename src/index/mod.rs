//! Secondary index handles kept consistent by DML operators

mod error;

pub use error::{IndexError, IndexResult};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::record::{Record, RecordId, RecordSchema, TableHandle, Value};

/// Index handle shared between the operators of one query
pub type IndexRef = Arc<Mutex<IndexHandle>>;

/// Ordered multimap from key bytes to the records carrying that key.
///
/// Keys are the indexed fields of a record encoded so that byte order
/// matches value order (see [`encode_key_value`]).
pub struct IndexHandle {
    name: String,
    key_fields: Vec<usize>,
    entries: BTreeMap<Vec<u8>, Vec<RecordId>>,
    entry_count: usize,
}

impl IndexHandle {
    /// Create an empty index over `columns` of `schema`
    pub fn new(name: &str, schema: &RecordSchema, columns: &[&str]) -> IndexResult<Self> {
        if columns.is_empty() {
            return Err(IndexError::EmptyKey(name.to_string()));
        }

        let key_fields = columns
            .iter()
            .map(|&column| {
                schema
                    .find_field(column)
                    .ok_or_else(|| IndexError::ColumnNotFound {
                        index: name.to_string(),
                        column: column.to_string(),
                    })
            })
            .collect::<IndexResult<Vec<_>>>()?;

        Ok(Self {
            name: name.to_string(),
            key_fields,
            entries: BTreeMap::new(),
            entry_count: 0,
        })
    }

    /// Create an index and load it with every record already in `table`
    pub fn build(name: &str, table: &TableHandle, columns: &[&str]) -> IndexResult<Self> {
        let mut index = Self::new(name, table.schema(), columns)?;
        for record in table.scan()? {
            if let Some(rid) = record.rid() {
                let key = index.key_of(&record);
                index.insert_entry(key, rid);
            }
        }
        log::debug!("built index {} with {} entries", name, index.len());
        Ok(index)
    }

    pub fn into_shared(self) -> IndexRef {
        Arc::new(Mutex::new(self))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Positions of the key columns in the table schema
    pub fn key_fields(&self) -> &[usize] {
        &self.key_fields
    }

    /// Extract this index's key from a table record
    pub fn key_of(&self, record: &Record) -> Vec<u8> {
        let mut key = Vec::new();
        for &idx in &self.key_fields {
            if let Some(value) = record.get(idx) {
                encode_key_value(value, &mut key);
            }
        }
        key
    }

    pub fn insert_entry(&mut self, key: Vec<u8>, rid: RecordId) {
        self.entries.entry(key).or_default().push(rid);
        self.entry_count += 1;
    }

    /// Remove the entry `(key, rid)`; fails if the index does not hold it
    pub fn delete_entry(&mut self, key: &[u8], rid: RecordId) -> IndexResult<()> {
        let not_found = || IndexError::EntryNotFound {
            index: self.name.clone(),
            rid,
        };

        let rids = self.entries.get_mut(key).ok_or_else(not_found)?;
        let pos = rids.iter().position(|&r| r == rid).ok_or_else(not_found)?;
        rids.swap_remove(pos);
        if rids.is_empty() {
            self.entries.remove(key);
        }
        self.entry_count -= 1;
        Ok(())
    }

    /// Records stored under `key`
    pub fn lookup(&self, key: &[u8]) -> &[RecordId] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entry_count
    }

    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }
}

/// Append an order-preserving encoding of `value` to `out`.
///
/// Integers are big-endian with the sign bit flipped, floats use the IEEE
/// total order trick, strings are their raw bytes followed by a 0 terminator.
pub fn encode_key_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Int(i) => out.extend_from_slice(&((*i as u32) ^ 0x8000_0000).to_be_bytes()),
        Value::Float(f) => {
            let bits = f.to_bits();
            let ordered = if bits >> 63 == 1 { !bits } else { bits | (1 << 63) };
            out.extend_from_slice(&ordered.to_be_bytes());
        }
        Value::String(s) => {
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, FieldType};

    fn schema() -> RecordSchema {
        RecordSchema::new(vec![
            Field::new("id", FieldType::Int),
            Field::new("name", FieldType::Char(8)),
        ])
    }

    fn row(id: i32, name: &str) -> Record {
        Record::new(vec![Value::Int(id), Value::String(name.to_string())])
    }

    #[test]
    fn test_unknown_column() {
        let result = IndexHandle::new("idx", &schema(), &["missing"]);
        assert!(matches!(result, Err(IndexError::ColumnNotFound { .. })));
        assert!(matches!(
            IndexHandle::new("idx", &schema(), &[]),
            Err(IndexError::EmptyKey(_))
        ));
    }

    #[test]
    fn test_insert_lookup_delete() {
        let mut index = IndexHandle::new("idx_name", &schema(), &["name"]).unwrap();
        let a = RecordId::new(0, 0);
        let b = RecordId::new(0, 1);

        let key = index.key_of(&row(1, "bob"));
        index.insert_entry(key.clone(), a);
        index.insert_entry(index.key_of(&row(2, "bob")), b);
        assert_eq!(index.len(), 2);
        assert_eq!(index.lookup(&key), &[a, b]);

        index.delete_entry(&key, a).unwrap();
        assert_eq!(index.lookup(&key), &[b]);

        let err = index.delete_entry(&key, a).unwrap_err();
        assert!(matches!(err, IndexError::EntryNotFound { rid, .. } if rid == a));

        index.delete_entry(&key, b).unwrap();
        assert!(index.is_empty());
        assert!(index.lookup(&key).is_empty());
    }

    #[test]
    fn test_composite_key() {
        let index = IndexHandle::new("idx", &schema(), &["name", "id"]).unwrap();
        assert_eq!(index.key_fields(), &[1, 0]);
        assert_ne!(index.key_of(&row(1, "a")), index.key_of(&row(2, "a")));
    }

    #[test]
    fn test_key_encoding_preserves_order() {
        let encode = |v: Value| {
            let mut out = Vec::new();
            encode_key_value(&v, &mut out);
            out
        };

        assert!(encode(Value::Int(-5)) < encode(Value::Int(-1)));
        assert!(encode(Value::Int(-1)) < encode(Value::Int(0)));
        assert!(encode(Value::Int(0)) < encode(Value::Int(7)));
        assert!(encode(Value::Float(-2.5)) < encode(Value::Float(-0.5)));
        assert!(encode(Value::Float(-0.5)) < encode(Value::Float(1.0)));
        assert!(encode(Value::String("ab".into())) < encode(Value::String("abc".into())));
    }
}
