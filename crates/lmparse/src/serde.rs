//! JSON schema documents.
//!
//! These types describe the *shape* of a log page in the document format the
//! latency monitor tooling has always accepted for custom schemas:
//!
//! ```json
//! { "schema_level": "byte",
//!   "instructions": [
//!     { "field": "Active Bucket Timer", "json_field": "Active Bucket Timer",
//!       "offset": 2, "size": 2, "format": "5min", "json_format": "decimal*5" } ] }
//! ```
//!
//! A [SchemaDef] is converted into a validated [Layout] with `Layout::try_from`
//! or [load_schema]. Unknown granularities and format tags are rejected while
//! loading, not at decode time.

use serde::{Deserialize, Serialize};

use crate::{
    errors::SchemaError,
    field::{FieldDescriptor, Granularity, Layout},
    format::{DisplayFormat, OutputFormat},
};

/// A layout: granularity plus its ordered instructions.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SchemaDef {
    /// `byte` or `bit`.
    pub schema_level: String,
    pub instructions: Vec<InstructionDef>,
}

/// A single field.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InstructionDef {
    /// Label shown in the report.
    pub field: String,
    /// Key in the structured result; absent for report-only fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirement_id: Option<String>,
    pub offset: usize,
    pub size: usize,
    /// Display format tag, e.g. `5min` or `timestamp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Output format tag, e.g. `decimal*5`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_format: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub verbose_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subschema: Option<SchemaDef>,
}

/// Parses and validates a JSON schema document.
pub fn load_schema(json: &str) -> Result<Layout, SchemaError> {
    let def: SchemaDef = serde_json::from_str(json).map_err(|e| SchemaError::Document {
        message: e.to_string(),
    })?;
    let layout = Layout::try_from(def)?;
    // An overflowing field end fails the check against any window.
    layout.check(layout.required_len().unwrap_or(usize::MAX))?;

    Ok(layout)
}

/// Empty tags are treated as absent.
fn tag(value: Option<String>) -> Option<String> {
    value.filter(|tag| !tag.is_empty())
}

impl TryFrom<SchemaDef> for Layout {
    type Error = SchemaError;

    fn try_from(value: SchemaDef) -> Result<Self, Self::Error> {
        let granularity: Granularity = value.schema_level.parse()?;
        let fields = value
            .instructions
            .into_iter()
            .map(FieldDescriptor::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Layout::new(granularity, fields))
    }
}

impl TryFrom<InstructionDef> for FieldDescriptor {
    type Error = SchemaError;

    fn try_from(value: InstructionDef) -> Result<Self, Self::Error> {
        Ok(FieldDescriptor {
            label: value.field,
            output_key: value.json_field,
            requirement: value.requirement_id,
            offset: value.offset,
            size: value.size,
            display_format: tag(value.format)
                .map(|t| t.parse::<DisplayFormat>())
                .transpose()?,
            output_format: tag(value.json_format)
                .map(|t| t.parse::<OutputFormat>())
                .transpose()?,
            verbose_only: value.verbose_only,
            child: value.subschema.map(Layout::try_from).transpose()?,
        })
    }
}

impl From<&Layout> for SchemaDef {
    fn from(value: &Layout) -> Self {
        SchemaDef {
            schema_level: value.granularity.tag().to_string(),
            instructions: value.fields.iter().map(InstructionDef::from).collect(),
        }
    }
}

impl From<&FieldDescriptor> for InstructionDef {
    fn from(value: &FieldDescriptor) -> Self {
        InstructionDef {
            field: value.label.clone(),
            json_field: value.output_key.clone(),
            requirement_id: value.requirement.clone(),
            offset: value.offset,
            size: value.size,
            format: value.display_format.map(|f| f.tag().to_string()),
            json_format: value.output_format.map(|f| f.tag().to_string()),
            verbose_only: value.verbose_only,
            subschema: value.child.as_ref().map(SchemaDef::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocp::{OCP2_LOG_LEN, ocp2};

    const COUNTER_SCHEMA: &str = r#"{
        "schema_level": "byte",
        "instructions": [
            {
                "field": "Active Bucket Counter 0",
                "json_field": "Active Bucket Counter: Bucket 0",
                "requirement_id": "LMDATA-12",
                "offset": 0,
                "size": 16,
                "subschema": {
                    "schema_level": "byte",
                    "instructions": [
                        {"field": "Read Command Counter", "json_field": "Read", "offset": 12, "size": 4, "format": "decimal", "json_format": "decimal"},
                        {"field": "Reserved", "offset": 0, "size": 4, "verbose_only": true}
                    ]
                }
            },
            {"field": "Flags", "offset": 16, "size": 1, "format": ""}
        ]
    }"#;

    #[test]
    fn test_load_schema() {
        let layout = load_schema(COUNTER_SCHEMA).unwrap();

        assert_eq!(layout.granularity, Granularity::Byte);
        assert_eq!(layout.fields.len(), 2);
        assert_eq!(layout.required_len(), Some(17));

        let child = layout.fields[0].child.as_ref().unwrap();
        assert_eq!(child.fields[0].display_format, Some(DisplayFormat::Decimal));
        assert_eq!(child.fields[0].output_format, Some(OutputFormat::Decimal));
        assert!(child.fields[1].verbose_only);
        assert_eq!(layout.fields[1].display_format, None);
    }

    #[test]
    fn test_load_schema_unknown_granularity() {
        let json = r#"{"schema_level": "nibble", "instructions": []}"#;
        assert!(matches!(
            load_schema(json),
            Err(SchemaError::UnknownGranularity { .. })
        ));
    }

    #[test]
    fn test_load_schema_unknown_format() {
        let json = r#"{"schema_level": "byte", "instructions": [
            {"field": "Timer", "offset": 0, "size": 2, "format": "10min"}
        ]}"#;
        assert!(matches!(
            load_schema(json),
            Err(SchemaError::UnknownDisplayFormat { .. })
        ));
    }

    #[test]
    fn test_load_schema_child_out_of_bounds() {
        let json = r#"{"schema_level": "byte", "instructions": [
            {"field": "Flags", "offset": 0, "size": 1, "subschema": {
                "schema_level": "bit",
                "instructions": [{"field": "Bit 8", "offset": 8, "size": 1}]
            }}
        ]}"#;
        assert!(matches!(
            load_schema(json),
            Err(SchemaError::FieldOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_load_schema_offset_overflow() {
        let json = r#"{"schema_level": "byte", "instructions": [
            {"field": "Huge", "offset": 18446744073709551615, "size": 2}
        ]}"#;
        assert!(matches!(
            load_schema(json),
            Err(SchemaError::FieldOutOfBounds { ref label, .. }) if label == "Huge"
        ));
    }

    #[test]
    fn test_load_schema_child_offset_overflow() {
        let json = r#"{"schema_level": "byte", "instructions": [
            {"field": "Flags", "offset": 0, "size": 1, "subschema": {
                "schema_level": "bit",
                "instructions": [{"field": "Huge", "offset": 18446744073709551615, "size": 1}]
            }}
        ]}"#;
        assert!(matches!(
            load_schema(json),
            Err(SchemaError::FieldOutOfBounds { ref label, .. }) if label == "Huge"
        ));
    }

    #[test]
    fn test_load_schema_malformed() {
        assert!(matches!(
            load_schema("{\"schema_level\": \"byte\"}"),
            Err(SchemaError::Document { .. })
        ));
    }

    #[test]
    fn test_ocp2_document_round_trip() {
        let json = serde_json::to_string(&SchemaDef::from(ocp2())).unwrap();
        let layout = load_schema(&json).unwrap();

        assert_eq!(&layout, ocp2());
        assert_eq!(layout.required_len(), Some(OCP2_LOG_LEN));
    }
}
