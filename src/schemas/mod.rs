pub mod execution;
pub mod results;
pub mod submission;

use serde::{Deserialize, Deserializer};

/// Backends disagree on whether ids are strings or integers; accept both.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Text(value) => Ok(value),
        RawId::Number(value) => Ok(value.to_string()),
    }
}
