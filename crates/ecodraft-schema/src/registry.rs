// registry.rs — The closed set of draft sections and their expected shapes.
//
// Every page of the report wizard writes into one or more named sections.
// The section list is compiled in: adding a section means adding a variant
// here, which keeps every producer and consumer of draft data on the same
// set of keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DraftError;

/// Shallow shape expected for a section's payload.
///
/// Only the outer JSON type is checked (plus element types for lists).
/// Payload internals are opaque to the draft engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeTag {
    /// A free-form JSON object.
    Record,
    /// A single string.
    Text,
    /// An array whose elements are all strings.
    TextList,
    /// An array whose elements are all objects.
    RecordList,
    /// A boolean.
    Flag,
}

impl ShapeTag {
    /// Whether `value` has this shape.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ShapeTag::Record => value.is_object(),
            ShapeTag::Text => value.is_string(),
            ShapeTag::TextList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            ShapeTag::RecordList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_object)),
            ShapeTag::Flag => value.is_boolean(),
        }
    }

    /// Whether a well-shaped value carries no user data.
    ///
    /// Used for the mandatory-section check: an empty file name counts as
    /// missing. A flag is never empty.
    pub fn is_empty(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }
}

impl fmt::Display for ShapeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeTag::Record => write!(f, "record"),
            ShapeTag::Text => write!(f, "string"),
            ShapeTag::TextList => write!(f, "list of strings"),
            ShapeTag::RecordList => write!(f, "list of records"),
            ShapeTag::Flag => write!(f, "boolean"),
        }
    }
}

/// Name of the JSON type of `value`, for diagnostics.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

macro_rules! sections {
    ($( $(#[$doc:meta])* $variant:ident => $token:literal, $shape:ident; )+) => {
        /// Identifier of one independently editable section of a draft.
        ///
        /// The serialized token (camelCase) is the key used in persisted
        /// snapshots. Variant order is the registry order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum SectionId {
            $( $(#[$doc])* #[serde(rename = $token)] $variant, )+
        }

        impl SectionId {
            /// All sections, in registry order.
            pub const ALL: &'static [SectionId] = &[ $( SectionId::$variant, )+ ];

            /// The wire token for this section.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( SectionId::$variant => $token, )+
                }
            }

            /// The expected payload shape.
            pub const fn shape(&self) -> ShapeTag {
                match self {
                    $( SectionId::$variant => ShapeTag::$shape, )+
                }
            }
        }

        impl FromStr for SectionId {
            type Err = DraftError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $token => Ok(SectionId::$variant), )+
                    other => Err(DraftError::UnknownSection(other.to_string())),
                }
            }
        }
    };
}

sections! {
    /// Name the report is saved under. Mandatory.
    FileName => "fileName", Text;
    GeneralInfo => "generalInfo", Record;
    SiteDescription => "siteDescription", Record;
    /// Names of people present during the monitoring visit.
    AttendanceData => "attendanceData", TextList;
    MonitoringPeriod => "monitoringPeriod", Record;
    WeatherConditions => "weatherConditions", Record;
    WaterQualityAssessment => "waterQualityAssessment", Record;
    WaterSamplingPoints => "waterSamplingPoints", RecordList;
    AirQualityAssessment => "airQualityAssessment", Record;
    AirSamplingPoints => "airSamplingPoints", RecordList;
    NoiseMonitoring => "noiseMonitoring", Record;
    SoilAssessment => "soilAssessment", Record;
    WasteManagement => "wasteManagement", Record;
    HazardousMaterials => "hazardousMaterials", RecordList;
    EffluentDischarge => "effluentDischarge", Record;
    EmissionSources => "emissionSources", RecordList;
    FloraFauna => "floraFauna", Record;
    ComplianceChecklist => "complianceChecklist", Record;
    PermitConditions => "permitConditions", RecordList;
    NonComplianceFindings => "nonComplianceFindings", RecordList;
    CorrectiveActions => "correctiveActions", RecordList;
    IncidentReports => "incidentReports", RecordList;
    CommunityConcerns => "communityConcerns", TextList;
    /// File references for photos attached to the report.
    PhotoDocumentation => "photoDocumentation", TextList;
    LaboratoryResults => "laboratoryResults", RecordList;
    EquipmentCalibration => "equipmentCalibration", RecordList;
    Recommendations => "recommendations", TextList;
    Remarks => "remarks", Text;
    PreparedBy => "preparedBy", Record;
    ReviewedBy => "reviewedBy", Record;
    SignatoryConfirmed => "signatoryConfirmed", Flag;
}

impl SectionId {
    /// Whether a document is incomplete without this section.
    pub fn is_mandatory(&self) -> bool {
        matches!(self, SectionId::FileName)
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All registered sections in stable order.
pub fn list_sections() -> &'static [SectionId] {
    SectionId::ALL
}

/// Expected shape of a registered section.
pub fn shape_of(id: SectionId) -> ShapeTag {
    id.shape()
}

/// Resolve a wire token to a section, failing on unregistered tokens.
pub fn lookup(token: &str) -> Result<SectionId, DraftError> {
    token.parse()
}

/// Expected shape of the section named by `token`.
pub fn shape_of_name(token: &str) -> Result<ShapeTag, DraftError> {
    lookup(token).map(shape_of)
}

/// Sections that must be present and non-empty for a complete draft.
pub fn mandatory_sections() -> impl Iterator<Item = SectionId> {
    SectionId::ALL.iter().copied().filter(SectionId::is_mandatory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_unique() {
        let tokens: HashSet<&str> = list_sections().iter().map(|id| id.as_str()).collect();
        assert_eq!(tokens.len(), list_sections().len());
    }

    #[test]
    fn tokens_do_not_collide_with_metadata_fields() {
        for id in list_sections() {
            assert_ne!(id.as_str(), "createdAt");
            assert_ne!(id.as_str(), "savedAt");
        }
    }

    #[test]
    fn every_token_round_trips_through_lookup() {
        for id in list_sections() {
            assert_eq!(lookup(id.as_str()).unwrap(), *id);
        }
    }

    #[test]
    fn serde_uses_wire_tokens() {
        for id in list_sections() {
            let json = serde_json::to_string(id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.as_str()));
        }
    }

    #[test]
    fn list_order_matches_ord() {
        let mut sorted = list_sections().to_vec();
        sorted.sort();
        assert_eq!(sorted, list_sections());
    }

    #[test]
    fn unknown_token_is_rejected() {
        assert_eq!(
            lookup("waterQuality"),
            Err(DraftError::UnknownSection("waterQuality".to_string()))
        );
        assert!(matches!(
            shape_of_name("FileName"),
            Err(DraftError::UnknownSection(_))
        ));
    }

    #[test]
    fn file_name_is_the_only_mandatory_section() {
        let mandatory: Vec<SectionId> = mandatory_sections().collect();
        assert_eq!(mandatory, vec![SectionId::FileName]);
    }

    #[test]
    fn shape_matching() {
        assert!(ShapeTag::Record.matches(&json!({"a": 1})));
        assert!(!ShapeTag::Record.matches(&json!([])));
        assert!(ShapeTag::Text.matches(&json!("x")));
        assert!(ShapeTag::TextList.matches(&json!(["a", "b"])));
        assert!(ShapeTag::TextList.matches(&json!([])));
        assert!(!ShapeTag::TextList.matches(&json!(["a", 1])));
        assert!(!ShapeTag::TextList.matches(&json!("a")));
        assert!(ShapeTag::RecordList.matches(&json!([{"id": 1}])));
        assert!(!ShapeTag::RecordList.matches(&json!([{"id": 1}, "x"])));
        assert!(ShapeTag::Flag.matches(&json!(true)));
        assert!(!ShapeTag::Flag.matches(&json!("true")));
    }

    #[test]
    fn emptiness() {
        assert!(ShapeTag::Text.is_empty(&json!("   ")));
        assert!(!ShapeTag::Text.is_empty(&json!("Report A")));
        assert!(ShapeTag::Record.is_empty(&json!({})));
        assert!(!ShapeTag::Flag.is_empty(&json!(false)));
    }
}
