//! Argument decoding shared by the tools.
//!
//! Models are loose about types: an HCP may arrive as a name, as a digit
//! string, or as an integer; an interaction id as an integer or a digit
//! string. Everything here accepts those shapes and nothing else.

use fieldrep_core::error::{StoreError, ToolError};
use fieldrep_core::record::Hcp;
use fieldrep_core::store::RecordStore;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Decode a tool's arguments, mapping any mismatch to `InvalidArguments`.
pub fn parse<T: DeserializeOwned>(tool: &str, arguments: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolError::InvalidArguments(format!("{tool}: {e}")))
}

/// How the model referred to an HCP.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HcpRef {
    Id(i64),
    Name(String),
}

impl HcpRef {
    /// Look the HCP up. A digit string is treated as an id, anything else
    /// as a title-insensitive name fragment.
    pub async fn resolve(&self, store: &dyn RecordStore) -> Result<Option<Hcp>, StoreError> {
        match self {
            Self::Id(id) => store.get_hcp(*id).await,
            Self::Name(name) => match name.trim().parse::<i64>() {
                Ok(id) => store.get_hcp(id).await,
                Err(_) => store.find_hcp_by_name(name).await,
            },
        }
    }
}

impl fmt::Display for HcpRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

/// `deserialize_with` target for record ids.
pub fn record_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match RawId::deserialize(deserializer)? {
        RawId::Int(id) => Ok(id),
        RawId::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("expected an integer id, got '{text}'"))),
    }
}
