//! Address record returned by a lookup.
//!
//! # Design
//! `AddressRecord` is read-only: fields are private and only reachable
//! through getters, and every constructor checks that all six fields are
//! populated. The serialized form is the field-named mapping the API sends
//! (`postcode`, `number`, `street`, `city`, `municipality`, `province`), which
//! is also what the cache stores.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Raised when raw data cannot be turned into an `AddressRecord`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address field `{0}` is missing or empty")]
    MissingField(&'static str),

    #[error("address data could not be decoded: {0}")]
    Decode(String),
}

/// The wire shape before validation. Absent fields default to empty so the
/// emptiness check reports them by name.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AddressMapping {
    postcode: String,
    number: u32,
    street: String,
    city: String,
    municipality: String,
    province: String,
}

/// A validated Dutch address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "AddressMapping")]
pub struct AddressRecord {
    postcode: String,
    #[serde(rename = "number")]
    house_number: u32,
    street: String,
    city: String,
    municipality: String,
    province: String,
}

impl AddressRecord {
    pub fn new(
        postcode: impl Into<String>,
        house_number: u32,
        street: impl Into<String>,
        city: impl Into<String>,
        municipality: impl Into<String>,
        province: impl Into<String>,
    ) -> Result<Self, AddressError> {
        let record = Self {
            postcode: postcode.into(),
            house_number,
            street: street.into(),
            city: city.into(),
            municipality: municipality.into(),
            province: province.into(),
        };
        record.validate()?;
        Ok(record)
    }

    /// Builds a record from a field-named mapping such as a decoded API
    /// response.
    pub fn from_mapping(mapping: &Map<String, Value>) -> Result<Self, AddressError> {
        let raw: AddressMapping = serde_json::from_value(Value::Object(mapping.clone()))
            .map_err(|e| AddressError::Decode(e.to_string()))?;
        Self::try_from(raw)
    }

    pub fn to_mapping(&self) -> Map<String, Value> {
        let mut mapping = Map::new();
        mapping.insert("postcode".into(), self.postcode.clone().into());
        mapping.insert("number".into(), self.house_number.into());
        mapping.insert("street".into(), self.street.clone().into());
        mapping.insert("city".into(), self.city.clone().into());
        mapping.insert("municipality".into(), self.municipality.clone().into());
        mapping.insert("province".into(), self.province.clone().into());
        mapping
    }

    pub fn postcode(&self) -> &str {
        &self.postcode
    }

    pub fn house_number(&self) -> u32 {
        self.house_number
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn municipality(&self) -> &str {
        &self.municipality
    }

    pub fn province(&self) -> &str {
        &self.province
    }

    fn validate(&self) -> Result<(), AddressError> {
        let text_fields = [
            ("postcode", &self.postcode),
            ("street", &self.street),
            ("city", &self.city),
            ("municipality", &self.municipality),
            ("province", &self.province),
        ];
        if let Some((name, _)) = text_fields.iter().find(|(_, value)| value.is_empty()) {
            return Err(AddressError::MissingField(*name));
        }
        if self.house_number == 0 {
            return Err(AddressError::MissingField("number"));
        }
        Ok(())
    }
}

impl TryFrom<AddressMapping> for AddressRecord {
    type Error = AddressError;

    fn try_from(raw: AddressMapping) -> Result<Self, Self::Error> {
        Self::new(
            raw.postcode,
            raw.number,
            raw.street,
            raw.city,
            raw.municipality,
            raw.province,
        )
    }
}

/// Renders the address the way it is written on an envelope.
impl fmt::Display for AddressRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {},\n{} {} ({})",
            self.street, self.house_number, self.postcode, self.city, self.province
        )
    }
}
