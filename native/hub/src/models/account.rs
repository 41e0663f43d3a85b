use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// An account registered for a hoster plugin.
///
/// Only `plugin` is interpreted; every other attribute is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub plugin: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Account {
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}
