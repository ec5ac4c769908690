use serde::Deserialize;
use std::collections::HashMap;

/// Certificate identifier to PEM text, as served by the upstream endpoint.
///
/// A map is never mutated after it has been decoded; a refresh replaces the
/// whole value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct CertMap(HashMap<String, String>);

impl CertMap {
    pub fn get(&self, cert_id: &str) -> Option<&str> {
        self.0.get(cert_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
impl From<HashMap<String, String>> for CertMap {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}
