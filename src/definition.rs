//! Data definitions: ordered variable lists registered with the engine.
//!
//! A definition is identified by the content hash of its normalized specs,
//! so declaring the same variables twice reuses the first definition and
//! sends nothing. Definitions are immutable once created.

use crate::catalog::Catalog;
use crate::changedict::SimData;
use crate::error::{DecodeError, Result, SimError};
use crate::protocol::{decode_items, encode_value, Directive, SimObjectData};
use crate::transport::Transport;
use crate::types::{DataType, DefinitionId, DefinitionKey, SimValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A variable as declared by the caller.
///
/// Anything left unset is filled in from the catalog when the definition is
/// created.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    /// Case-insensitive name, optionally suffixed with a 1-based `:N` index.
    pub name: String,
    /// `Some("")` requests the value without units.
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub data_type: Option<DataType>,
    #[serde(default)]
    pub epsilon: Option<f32>,
    /// Value to write; only used when setting data.
    #[serde(default)]
    pub value: Option<SimValue>,
}

impl VariableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = Some(epsilon);
        self
    }

    pub fn value(mut self, value: impl Into<SimValue>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl From<&str> for VariableSpec {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for VariableSpec {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// A fully resolved datum, as registered with the engine.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DatumSpec {
    /// Name as the caller wrote it; also the key values are stored under.
    pub name: String,
    pub units: String,
    pub data_type: DataType,
    pub epsilon: f32,
}

/// An ordered list of datums registered under one id.
#[derive(Debug)]
pub struct DataDefinition {
    id: DefinitionId,
    key: DefinitionKey,
    specs: Vec<DatumSpec>,
    types: Vec<DataType>,
}

impl DataDefinition {
    fn new(id: DefinitionId, key: DefinitionKey, specs: Vec<DatumSpec>) -> Self {
        let types = specs.iter().map(|s| s.data_type).collect();
        Self {
            id,
            key,
            specs,
            types,
        }
    }

    pub fn id(&self) -> DefinitionId {
        self.id
    }

    pub fn key(&self) -> DefinitionKey {
        self.key
    }

    pub fn specs(&self) -> &[DatumSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Wire types in datum order.
    pub fn types(&self) -> &[DataType] {
        &self.types
    }

    /// Resolved units per variable name.
    pub fn units(&self) -> Vec<(&str, &str)> {
        self.specs
            .iter()
            .map(|s| (s.name.as_str(), s.units.as_str()))
            .collect()
    }

    /// Decode the items of a data record requested with this definition.
    pub fn decode(
        &self,
        data: &SimObjectData<'_>,
    ) -> std::result::Result<Vec<(usize, SimValue)>, DecodeError> {
        decode_items(data.data, data.define_count, data.flags.is_tagged(), &self.types)
    }

    /// Decode a data record and store every item under its variable name,
    /// in arrival order. Nothing is stored if any item fails to decode.
    ///
    /// Returns the number of values written.
    pub fn decode_into(
        &self,
        data: &SimObjectData<'_>,
        target: &mut SimData,
    ) -> std::result::Result<usize, DecodeError> {
        let items = self.decode(data)?;
        let written = items.len();
        for (index, value) in items {
            target.set(self.specs[index].name.as_str(), value);
        }
        Ok(written)
    }

    /// Pack one value per datum, in definition order.
    pub fn pack_values(&self, values: &[SimValue]) -> Result<Vec<u8>> {
        if values.len() != self.specs.len() {
            return Err(SimError::InvalidArgument(format!(
                "expected {} values for definition {}, got {}",
                self.specs.len(),
                self.id,
                values.len()
            )));
        }
        let mut out = Vec::new();
        for (value, data_type) in values.iter().zip(&self.types) {
            encode_value(value, *data_type, &mut out)?;
        }
        Ok(out)
    }
}

/// Content-addressed cache of data definitions for one connection.
pub struct DefinitionRegistry {
    by_key: HashMap<DefinitionKey, Arc<DataDefinition>>,
    by_id: HashMap<DefinitionId, Arc<DataDefinition>>,
    /// Ids are never reused, even when registration fails part way.
    next_id: u32,
    default_epsilon: f32,
}

impl DefinitionRegistry {
    /// `default_epsilon` applies to float64 datums declared without one.
    pub fn new(default_epsilon: f32) -> Self {
        Self {
            by_key: HashMap::new(),
            by_id: HashMap::new(),
            next_id: 0,
            default_epsilon,
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn get(&self, id: DefinitionId) -> Option<&Arc<DataDefinition>> {
        self.by_id.get(&id)
    }

    /// Resolve units, type and epsilon for each spec.
    ///
    /// Catalog problems are logged and replaced with defaults.
    pub fn normalize(
        &self,
        catalog: &Catalog,
        specs: &[VariableSpec],
        settable: bool,
    ) -> Vec<DatumSpec> {
        specs
            .iter()
            .map(|spec| {
                let variable = catalog.validate_simvar(&spec.name, settable);
                let mut units = catalog.validate_units(&spec.name, spec.units.as_deref(), variable);
                let data_type = match spec.data_type {
                    Some(DataType::FixedString(width)) if !DataType::STRING_WIDTHS.contains(&width) => {
                        warn!(
                            "unsupported string width {} for {}, using {}",
                            width,
                            spec.name,
                            DataType::DEFAULT_STRING_WIDTH
                        );
                        DataType::FixedString(DataType::DEFAULT_STRING_WIDTH)
                    }
                    Some(data_type) => data_type,
                    None => catalog.type_for_unit(&units),
                };
                if data_type.is_string() {
                    // String datums are only delivered when requested without units.
                    units.clear();
                }
                let epsilon = spec.epsilon.unwrap_or(match data_type {
                    DataType::Float64 => self.default_epsilon,
                    _ => 0.0,
                });
                DatumSpec {
                    name: spec.name.clone(),
                    units,
                    data_type,
                    epsilon,
                }
            })
            .collect()
    }

    /// Return the definition for `specs`, registering it with the engine
    /// the first time it is seen.
    pub fn create_or_reuse<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        catalog: &Catalog,
        specs: &[VariableSpec],
        settable: bool,
    ) -> Result<Arc<DataDefinition>> {
        if specs.is_empty() {
            return Err(SimError::InvalidArgument("no variables specified".into()));
        }

        let normalized = self.normalize(catalog, specs, settable);
        let key = DefinitionKey::from_bytes(&serde_json::to_vec(&normalized)?);
        if let Some(existing) = self.by_key.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let id = DefinitionId(self.next_id);
        self.next_id += 1;
        for (datum_id, datum) in normalized.iter().enumerate() {
            let directive = Directive::AddToDataDefinition {
                define_id: id,
                datum_name: datum.name.clone(),
                units_name: datum.units.clone(),
                data_type: datum.data_type,
                epsilon: datum.epsilon,
                datum_id: datum_id as u32,
            };
            if let Err(err) = directive.encode().and_then(|raw| Ok(transport.send(&raw)?)) {
                if datum_id > 0 {
                    Self::discard(transport, id);
                }
                return Err(err);
            }
        }
        debug!(definition = %id, key = %key, datums = normalized.len(), "registered data definition");

        let definition = Arc::new(DataDefinition::new(id, key, normalized));
        self.by_key.insert(key, Arc::clone(&definition));
        self.by_id.insert(id, Arc::clone(&definition));
        Ok(definition)
    }

    /// Drop the datums the engine already holds for an abandoned definition.
    fn discard<T: Transport + ?Sized>(transport: &mut T, id: DefinitionId) {
        let cleared = Directive::ClearDataDefinition { define_id: id }
            .encode()
            .and_then(|raw| Ok(transport.send(&raw)?));
        if let Err(err) = cleared {
            warn!(definition = %id, "could not clear partial definition: {}", err);
        }
    }
}
