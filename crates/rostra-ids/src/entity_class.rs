use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AllocationError;

/// The kind of entity an identifier is issued for.
///
/// Each class numbers independently: the first teacher and the first
/// student of a year both receive `{year}1000`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityClass {
    Teacher,
    Student,
}

impl EntityClass {
    pub const ALL: [EntityClass; 2] = [EntityClass::Teacher, EntityClass::Student];

    /// Wire tag, also used as the `id_counters.entity_class` key.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityClass::Teacher => "teacher",
            EntityClass::Student => "student",
        }
    }
}

impl fmt::Display for EntityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityClass {
    type Err = AllocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teacher" => Ok(EntityClass::Teacher),
            "student" => Ok(EntityClass::Student),
            other => Err(AllocationError::InvalidEntityClass(other.to_string())),
        }
    }
}
