//! Catalog of known variables, units and events.
//!
//! The catalog is advisory: unknown names are reported as warnings with a
//! closest-match hint and then passed through, never rejected. It supplies
//! default units for variables and default data types for units.
//!
//! JSON layout:
//! ```text
//! {
//!   "VARIABLES":  { "<NAME>": { name, units_std, dimensions, settable, indexed } },
//!   "UNITS":      { "<CANONICAL UNIT>": { name_std, dimensions } },
//!   "DIMENSIONS": { "<dimension>": ["<name_std>", ...] },
//!   "EVENTS":     { "<EVENT_NAME>": { description } }
//! }
//! ```

mod names;

pub use names::{
    canonical_unit, close_matches, has_index_suffix, normalize_event_name,
    normalize_variable_name, similarity, suggestion_message,
};

use crate::error::{Result, SimError};
use crate::types::DataType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

const BUILTIN: &str = include_str!("builtin.json");

/// Dimension of units that map to small integers or strings.
const MISC_DIMENSION: &str = "Miscellaneous Units";

/// Dimension of structured units, which have no scalar encoding.
const STRUCT_DIMENSION: &str = "Structs And Other Complex Units";

/// A known variable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    /// Display name, possibly with an `:index` placeholder.
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Default units; empty when the variable has none.
    #[serde(default)]
    pub units_std: String,
    #[serde(default)]
    pub dimensions: String,
    #[serde(default)]
    pub settable: bool,
    /// Requires a `:N` suffix.
    #[serde(default)]
    pub indexed: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitInfo {
    pub name_std: String,
    #[serde(default)]
    pub dimensions: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    #[serde(default)]
    pub description: String,
}

/// Variables, units and events known to the engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "VARIABLES", default)]
    variables: BTreeMap<String, VariableInfo>,
    #[serde(rename = "UNITS", default)]
    units: BTreeMap<String, UnitInfo>,
    #[serde(rename = "DIMENSIONS", default)]
    dimensions: BTreeMap<String, Vec<String>>,
    #[serde(rename = "EVENTS", default)]
    events: BTreeMap<String, EventInfo>,
}

impl Catalog {
    /// Catalog with no entries; every lookup produces a warning.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The catalog embedded in the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SimError::Catalog(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| SimError::Catalog(format!("{}: {}", path.display(), e)))
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Look up a variable by any spelling of its name.
    pub fn variable(&self, name: &str) -> Option<&VariableInfo> {
        self.variables.get(&normalize_variable_name(name))
    }

    /// Look up a unit by any spelling of its name.
    pub fn unit(&self, units: &str) -> Option<&UnitInfo> {
        self.units.get(&canonical_unit(units))
    }

    pub fn event(&self, name: &str) -> Option<&EventInfo> {
        self.events.get(&normalize_event_name(name))
    }

    /// Check a variable name, warning when it is unknown, lacks a required
    /// index, or is read-only but meant to be set.
    pub fn validate_simvar(&self, name: &str, settable: bool) -> Option<&VariableInfo> {
        let base = normalize_variable_name(name);
        let Some(info) = self.variables.get(&base) else {
            let options: Vec<&str> = self.variables.keys().map(String::as_str).collect();
            warn!(
                "unrecognized variable '{}', {}",
                base,
                suggestion_message(&base, &options)
            );
            return None;
        };
        if info.indexed && !has_index_suffix(name) {
            warn!("expected indexed variable, e.g. {}:1", name);
        }
        if settable && !info.settable {
            warn!("variable {} is not settable", name);
        }
        Some(info)
    }

    /// Resolve the units to request `name` in.
    ///
    /// Omitted units take the variable's default; an explicit empty string
    /// is kept as is. Unknown units are passed through in canonical form
    /// with a warning suggesting units of the variable's dimension.
    pub fn validate_units(
        &self,
        name: &str,
        units: Option<&str>,
        variable: Option<&VariableInfo>,
    ) -> String {
        match units {
            None => {
                let default = variable.map(|v| v.units_std.clone()).unwrap_or_default();
                if default.is_empty() {
                    warn!("no units specified or inferred for {}", name);
                }
                default
            }
            Some("") => String::new(),
            Some(units) => {
                let canonical = canonical_unit(units);
                if let Some(info) = self.units.get(&canonical) {
                    return info.name_std.clone();
                }

                let same_dimension = variable
                    .and_then(|v| self.dimensions.get(&v.dimensions))
                    .filter(|options| !options.is_empty());
                let options: Vec<&str> = match same_dimension {
                    Some(options) => options.iter().map(String::as_str).collect(),
                    None => self.units.values().map(|u| u.name_std.as_str()).collect(),
                };
                warn!(
                    "unrecognized units '{}' for {}, {}",
                    units,
                    name,
                    suggestion_message(&canonical, &options)
                );
                canonical
            }
        }
    }

    /// Default wire type for values in `units`.
    ///
    /// Boolean, enum and bit-field units are 32-bit integers, strings are
    /// 256-byte fixed strings and other scalar units are 64-bit floats.
    /// Anything else falls back to a 64-bit float with a warning.
    pub fn type_for_unit(&self, units: &str) -> DataType {
        let Some(info) = self.unit(units) else {
            warn!("unrecognized unit '{}'; using float64 as fallback", units);
            return DataType::Float64;
        };
        match info.dimensions.as_str() {
            MISC_DIMENSION => match info.name_std.as_str() {
                "Bool" | "Boolean" | "Enum" | "Bco16" | "mask" | "flags" => DataType::Int32,
                "string" => DataType::FixedString(DataType::DEFAULT_STRING_WIDTH),
                _ => {
                    warn!(
                        "unrecognized miscellaneous unit '{}'; using float64 as fallback",
                        units
                    );
                    DataType::Float64
                }
            },
            STRUCT_DIMENSION => {
                warn!(
                    "complex types not supported for '{}'; using float64 as fallback",
                    units
                );
                DataType::Float64
            }
            _ => DataType::Float64,
        }
    }

    /// Normalize an event name, warning when the event is unknown.
    pub fn validate_event(&self, name: &str) -> String {
        let normalized = normalize_event_name(name);
        if !self.events.contains_key(&normalized) {
            let options: Vec<&str> = self.events.keys().map(String::as_str).collect();
            warn!(
                "unrecognized event {}, {}",
                name,
                suggestion_message(&normalized, &options)
            );
        }
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_parses() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.variable_count() > 10);
        assert!(catalog.event("kohlsman inc").is_some());
        assert_eq!(catalog.variable("plane_altitude").unwrap().units_std, "feet");
    }

    #[test]
    fn test_validate_simvar() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.validate_simvar("Indicated Altitude", false).is_some());
        assert!(catalog.validate_simvar("GENERAL ENG RPM:1", true).unwrap().indexed);
        assert!(catalog.validate_simvar("NOT A VARIABLE", false).is_none());
        // Read-only variables are still returned; the problem is only logged.
        assert!(catalog.validate_simvar("TITLE", true).is_some());
    }

    #[test]
    fn test_validate_units() {
        let catalog = Catalog::builtin().unwrap();
        let alt = catalog.variable("PLANE ALTITUDE");

        assert_eq!(catalog.validate_units("PLANE ALTITUDE", None, alt), "feet");
        assert_eq!(catalog.validate_units("PLANE ALTITUDE", Some("ft"), alt), "feet");
        assert_eq!(catalog.validate_units("PLANE ALTITUDE", Some("Meters"), alt), "meters");
        assert_eq!(catalog.validate_units("PLANE ALTITUDE", Some(""), alt), "");
        assert_eq!(catalog.validate_units("PLANE ALTITUDE", Some("furlongs"), alt), "FURLONGS");
        assert_eq!(catalog.validate_units("MYSTERY", None, None), "");
    }

    #[test]
    fn test_type_for_unit() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.type_for_unit("feet"), DataType::Float64);
        assert_eq!(catalog.type_for_unit("Bool"), DataType::Int32);
        assert_eq!(catalog.type_for_unit("enum"), DataType::Int32);
        assert_eq!(catalog.type_for_unit("string"), DataType::FixedString(256));
        assert_eq!(catalog.type_for_unit("number"), DataType::Float64);
        assert_eq!(catalog.type_for_unit("SIMCONNECT_DATA_LATLONALT"), DataType::Float64);
        assert_eq!(catalog.type_for_unit("furlongs"), DataType::Float64);
    }

    #[test]
    fn test_validate_event() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.validate_event("Kohlsman_Inc"), "KOHLSMAN_INC");
        assert_eq!(catalog.validate_event("no such event"), "NO_SUCH_EVENT");
    }

    #[test]
    fn test_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"VARIABLES": {{"FUEL LEVEL": {{"name": "FUEL LEVEL", "units_std": "gallons"}}}}}}"#
        )
        .unwrap();

        let catalog = Catalog::from_json_file(file.path()).unwrap();
        assert_eq!(catalog.variable_count(), 1);
        assert_eq!(catalog.event_count(), 0);
        assert!(!catalog.variable("fuel_level").unwrap().settable);
    }

    #[test]
    fn test_from_json_file_errors() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            Catalog::from_json_file(file.path()),
            Err(SimError::Catalog(_))
        ));
        assert!(matches!(
            Catalog::from_json_file("/nonexistent/catalog.json"),
            Err(SimError::Io(_))
        ));
    }
}
