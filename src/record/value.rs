use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{RecordError, RecordResult};

/// Storage type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,         // 4 bytes
    Float,       // 8 bytes
    Char(usize), // n bytes, zero padded
}

impl FieldType {
    /// Get the size in bytes for this type
    pub fn size(&self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::Float => 8,
            FieldType::Char(n) => *n,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "INT"),
            FieldType::Float => write!(f, "FLOAT"),
            FieldType::Char(n) => write!(f, "CHAR({})", n),
        }
    }
}

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f64),
    String(String),
}

impl Value {
    pub fn field_type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "INT",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "CHAR",
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Encode into `out`, which must be exactly `field_type.size()` bytes
    pub fn write_to(&self, field_type: FieldType, out: &mut [u8]) -> RecordResult<()> {
        debug_assert_eq!(out.len(), field_type.size());
        match (self, field_type) {
            (Value::Int(i), FieldType::Int) => out.copy_from_slice(&i.to_le_bytes()),
            (Value::Float(f), FieldType::Float) => out.copy_from_slice(&f.to_le_bytes()),
            (Value::String(s), FieldType::Char(max_len)) => {
                let bytes = s.as_bytes();
                // NUL terminates a stored string
                if bytes.contains(&0) {
                    return Err(RecordError::Serialization(format!(
                        "String {:?} contains a NUL byte",
                        s
                    )));
                }
                if bytes.len() > max_len {
                    return Err(RecordError::Serialization(format!(
                        "String length {} exceeds max length {}",
                        bytes.len(),
                        max_len
                    )));
                }
                out[..bytes.len()].copy_from_slice(bytes);
                out[bytes.len()..].fill(0);
            }
            (value, field_type) => {
                return Err(RecordError::Serialization(format!(
                    "cannot store {} as {}",
                    value.field_type_name(),
                    field_type
                )));
            }
        }
        Ok(())
    }

    /// Decode a value of `field_type` from exactly `field_type.size()` bytes
    pub fn read_from(bytes: &[u8], field_type: FieldType) -> RecordResult<Self> {
        if bytes.len() != field_type.size() {
            return Err(RecordError::Deserialization(format!(
                "Expected {} bytes for {}, got {}",
                field_type.size(),
                field_type,
                bytes.len()
            )));
        }

        match field_type {
            FieldType::Int => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                Ok(Value::Int(i32::from_le_bytes(buf)))
            }
            FieldType::Float => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                Ok(Value::Float(f64::from_le_bytes(buf)))
            }
            FieldType::Char(_) => {
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                let s = String::from_utf8(bytes[..end].to_vec())
                    .map_err(|e| RecordError::Deserialization(format!("Invalid UTF-8: {}", e)))?;
                Ok(Value::String(s))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}
