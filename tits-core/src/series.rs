//! Resource identities and the series names derived from them

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{TitsError, TitsResult};

/// Prefix prepended to a resource id to name its series
pub const SERIES_PREFIX: &str = "r";

/// Opaque identifier of the resource a measurement belongs to.
///
/// Usually an integer, but any short token of ASCII letters, digits, `_`, `-`
/// or `.` is accepted. The id ends up inside query text, so nothing else is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a new resource id
    pub fn new<S: Into<String>>(id: S) -> TitsResult<Self> {
        let id = id.into();

        if id.is_empty() {
            return Err(TitsError::validation("Resource id cannot be empty"));
        }

        if id.len() > crate::MAX_RESOURCE_ID_LENGTH {
            return Err(TitsError::validation(format!(
                "Resource id too long: {} > {}",
                id.len(),
                crate::MAX_RESOURCE_ID_LENGTH
            )));
        }

        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
        {
            return Err(TitsError::validation(format!(
                "Resource id contains invalid characters: {:?}",
                id
            )));
        }

        Ok(Self(id))
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric form of the id, if it has one
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    /// Name of the series holding this resource's measurements
    pub fn series_name(&self) -> SeriesName {
        SeriesName(format!("{}{}", SERIES_PREFIX, self.0))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ResourceId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for ResourceId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<i32> for ResourceId {
    fn from(id: i32) -> Self {
        Self(id.to_string())
    }
}

impl From<u32> for ResourceId {
    fn from(id: u32) -> Self {
        Self(id.to_string())
    }
}

impl TryFrom<&str> for ResourceId {
    type Error = TitsError;

    fn try_from(id: &str) -> TitsResult<Self> {
        Self::new(id)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = TitsError;

    fn try_from(id: String) -> TitsResult<Self> {
        Self::new(id)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ResourceId {
    type Err = TitsError;

    fn from_str(s: &str) -> TitsResult<Self> {
        Self::new(s)
    }
}

/// Name of a series in the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesName(String);

impl SeriesName {
    /// Wrap a name as reported by the store
    pub fn from_store<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Recover the resource id by stripping the series prefix.
    ///
    /// Returns `None` for series that were not written by this layer.
    pub fn resource_id(&self) -> Option<ResourceId> {
        self.0
            .strip_prefix(SERIES_PREFIX)
            .and_then(|id| ResourceId::new(id).ok())
    }

    /// Render the name for use inside query text
    pub(crate) fn to_query_identifier(&self) -> String {
        if !self.0.is_empty()
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.0.clone()
        } else {
            format!("\"{}\"", self.0.replace('"', "\\\""))
        }
    }
}

impl fmt::Display for SeriesName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SeriesName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
