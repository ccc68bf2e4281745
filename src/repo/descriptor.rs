// ABOUTME: The external source descriptor tracked in the config repository.
// ABOUTME: Rewrites the payload ID field while keeping every other field's raw JSON.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::types::PayloadId;

/// Default file name of the descriptor inside the module directory.
pub const DESCRIPTOR_FILENAME: &str = ".section-external-source.json";

/// Field holding the live artifact's payload ID.
pub const PAYLOAD_ID_FIELD: &str = "section_payload_id";

/// A JSON object whose fields are kept as raw text, in file order.
///
/// Only [`PAYLOAD_ID_FIELD`] is ever interpreted. Fields this tool does not
/// know about are written back exactly as they were read.
#[derive(Debug)]
pub struct ExternalSourceDescriptor {
    fields: Vec<(String, Box<RawValue>)>,
}

impl ExternalSourceDescriptor {
    /// Parse descriptor bytes.
    ///
    /// # Errors
    ///
    /// Fails if the bytes are not a JSON object.
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Current payload ID, if the field is present and a string.
    pub fn payload_id(&self) -> Option<PayloadId> {
        self.fields
            .iter()
            .find(|(k, _)| k == PAYLOAD_ID_FIELD)
            .and_then(|(_, v)| serde_json::from_str::<String>(v.get()).ok())
            .map(PayloadId::new)
    }

    /// Point the descriptor at `payload_id`, adding the field if absent.
    ///
    /// # Errors
    ///
    /// Only fails if the ID cannot be encoded as a JSON string.
    pub fn set_payload_id(&mut self, payload_id: &PayloadId) -> Result<(), serde_json::Error> {
        let value = RawValue::from_string(serde_json::to_string(payload_id.as_str())?)?;
        match self.fields.iter_mut().find(|(k, _)| k == PAYLOAD_ID_FIELD) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((PAYLOAD_ID_FIELD.to_string(), value)),
        }
        Ok(())
    }

    /// Raw JSON text of a field.
    pub fn raw_field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.get())
    }

    /// Serialize as a tab-indented object.
    ///
    /// # Errors
    ///
    /// Only fails if a key cannot be encoded as a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        if self.fields.is_empty() {
            return Ok("{}".to_string());
        }

        let mut out = String::from("{\n");
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                out.push_str(",\n");
            }
            out.push('\t');
            out.push_str(&serde_json::to_string(key)?);
            out.push_str(": ");
            out.push_str(value.get());
        }
        out.push_str("\n}");
        Ok(out)
    }
}

impl<'de> Deserialize<'de> for ExternalSourceDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = ExternalSourceDescriptor;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut fields: Vec<(String, Box<RawValue>)> = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, Box<RawValue>>()? {
                    if fields.iter().any(|(k, _)| *k == key) {
                        return Err(de::Error::custom(format!("duplicate field `{key}`")));
                    }
                    fields.push((key, value));
                }
                Ok(ExternalSourceDescriptor { fields })
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}
