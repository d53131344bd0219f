use serde::{Deserialize, Deserializer};

/// Treats a missing, empty or whitespace-only query value as `None`.
///
/// Front ends commonly send `?role=` when no filter is selected.
pub fn deserialize_optional_trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
