use clap::ValueEnum;

use bacnode_core::types::{DataValue, ObjectType};
use serde::Deserialize;

/// CLI-friendly enum for selecting BACnet object types.
///
/// Maps human-readable names to [`ObjectType`] variants for use with clap
/// argument parsing.
#[derive(Debug, Clone, ValueEnum)]
pub enum ObjectTypeArg {
    AnalogInput,
    AnalogOutput,
    AnalogValue,
    BinaryInput,
    BinaryOutput,
    BinaryValue,
    Calendar,
    Device,
    EventEnrollment,
    File,
    NotificationClass,
    Schedule,
    TrendLog,
    MultiStateInput,
    MultiStateOutput,
    MultiStateValue,
}

impl ObjectTypeArg {
    /// Convert to the core [`ObjectType`] representation.
    pub const fn into_object_type(self) -> ObjectType {
        match self {
            Self::AnalogInput => ObjectType::AnalogInput,
            Self::AnalogOutput => ObjectType::AnalogOutput,
            Self::AnalogValue => ObjectType::AnalogValue,
            Self::BinaryInput => ObjectType::BinaryInput,
            Self::BinaryOutput => ObjectType::BinaryOutput,
            Self::BinaryValue => ObjectType::BinaryValue,
            Self::Calendar => ObjectType::Calendar,
            Self::Device => ObjectType::Device,
            Self::EventEnrollment => ObjectType::EventEnrollment,
            Self::File => ObjectType::File,
            Self::NotificationClass => ObjectType::NotificationClass,
            Self::Schedule => ObjectType::Schedule,
            Self::TrendLog => ObjectType::TrendLog,
            Self::MultiStateInput => ObjectType::MultiStateInput,
            Self::MultiStateOutput => ObjectType::MultiStateOutput,
            Self::MultiStateValue => ObjectType::MultiStateValue,
        }
    }
}

/// An owned property value, as loaded from an object-table file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OwnedValue {
    Boolean(bool),
    Unsigned(u32),
    Real(f64),
    Text(String),
}

impl OwnedValue {
    /// Borrow as the wire-facing value type.
    pub fn as_data_value(&self) -> DataValue<'_> {
        match self {
            Self::Boolean(v) => DataValue::Boolean(*v),
            Self::Unsigned(v) => DataValue::Unsigned(*v),
            Self::Real(v) => DataValue::Real(*v as f32),
            Self::Text(v) => DataValue::CharacterString(v),
        }
    }
}

/// Parse a property name as written in object-table files.
pub fn parse_property_name(name: &str) -> Option<bacnode_core::types::PropertyId> {
    use bacnode_core::types::PropertyId;
    Some(match name {
        "present-value" => PropertyId::PresentValue,
        "description" => PropertyId::Description,
        "status-flags" => PropertyId::StatusFlags,
        "units" => PropertyId::Units,
        "vendor-name" => PropertyId::VendorName,
        other => PropertyId::Proprietary(other.parse().ok()?),
    })
}

/// Parse an object type name as written in object-table files
/// (e.g. `analog-input`, `device`).
pub fn parse_object_type(name: &str) -> Option<ObjectType> {
    Some(match name {
        "analog-input" => ObjectType::AnalogInput,
        "analog-output" => ObjectType::AnalogOutput,
        "analog-value" => ObjectType::AnalogValue,
        "binary-input" => ObjectType::BinaryInput,
        "binary-output" => ObjectType::BinaryOutput,
        "binary-value" => ObjectType::BinaryValue,
        "device" => ObjectType::Device,
        "multi-state-input" => ObjectType::MultiStateInput,
        "multi-state-output" => ObjectType::MultiStateOutput,
        "multi-state-value" => ObjectType::MultiStateValue,
        "trend-log" => ObjectType::TrendLog,
        _ => return None,
    })
}
